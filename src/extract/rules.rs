//! Field rule table
//!
//! Each scalar or list field of a breed record is filled by one
//! [`FieldRule`]: a locator that finds the element holding the value, and a
//! cleanup that turns the element's text into the field's shape. Rules are
//! independent; a rule that finds nothing leaves its field empty.

/// Record field a rule writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Type,
    OtherNames,
    Origin,
    BreedGroups,
    Size,
    Temperaments,
    Colors,
    Lifespan,
    LitterSize,
    History,
}

/// How the element holding a field is found inside the content region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// First element matching a CSS selector
    Select(String),

    /// The cell following a `<td>` whose text equals the label
    /// (case-insensitive, whitespace-trimmed)
    LabeledCell(String),

    /// First `tag` element after the heading with the given text
    AfterHeading { heading: String, tag: String },
}

/// How located text becomes a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// Whitespace-collapsed single value
    Trim,
    /// Comma-separated, deduplicated names
    CommaSet,
    /// Conjunction-split phrases in document order
    PhraseList,
    /// Conjunction-split phrases without repeats
    PhraseSet,
    /// Phrases where " to " also separates items
    SpanList,
    /// `min-max` integer pair
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub field: Field,
    pub locator: Locator,
    pub cleanup: Cleanup,
}

impl FieldRule {
    pub fn new(field: Field, locator: Locator, cleanup: Cleanup) -> Self {
        Self {
            field,
            locator,
            cleanup,
        }
    }

    pub fn labeled(field: Field, label: &str, cleanup: Cleanup) -> Self {
        Self::new(field, Locator::LabeledCell(label.to_string()), cleanup)
    }
}

/// Rules for the breed catalog's page layout
pub fn default_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(Field::Name, Locator::Select("h1".to_string()), Cleanup::Trim),
        FieldRule::labeled(Field::Type, "Type", Cleanup::Trim),
        FieldRule::labeled(Field::OtherNames, "Other names", Cleanup::CommaSet),
        FieldRule::labeled(Field::Origin, "Origin", Cleanup::PhraseList),
        FieldRule::labeled(Field::BreedGroups, "Breed Group", Cleanup::PhraseList),
        FieldRule::labeled(Field::Size, "Size", Cleanup::SpanList),
        FieldRule::labeled(Field::Temperaments, "Temperament", Cleanup::PhraseList),
        FieldRule::labeled(Field::Colors, "Colors", Cleanup::PhraseSet),
        FieldRule::labeled(Field::Lifespan, "Life span", Cleanup::Range),
        FieldRule::labeled(Field::LitterSize, "Litter Size", Cleanup::Range),
        FieldRule::new(
            Field::History,
            Locator::AfterHeading {
                heading: "History".to_string(),
                tag: "p".to_string(),
            },
            Cleanup::Trim,
        ),
    ]
}

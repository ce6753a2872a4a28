//! Breed page extraction
//!
//! Turns the raw bytes of one breed page into a partially filled
//! [`BreedRecord`] and the list of outbound reference URLs:
//! - Scalar and list fields come from the ordered [`FieldRule`] table
//! - Characteristic scores, gallery images and references have dedicated
//!   readers since their markup is structured differently
//!
//! Only the page's main content region (`div.content`) is searched, falling
//! back to the whole document when the region is missing. Every field is
//! optional: a rule that finds nothing leaves its field empty.

mod cleanup;
mod index;
mod links;
mod rules;

pub use cleanup::{clean_text, comma_set, parse_range, phrase_list, phrase_set, phrases, span_list};
pub use index::scrape_index;
pub use links::{resolve_link, resolve_reference, ResolvedLink};
pub use rules::{default_rules, Cleanup, Field, FieldRule, Locator};

use crate::dataset::BreedRecord;
use crate::url::{breed_id, normalize_url};
use crate::{ConfigError, DogfetchError};
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use url::Url;

/// Path prefix of breed photos on the catalog
pub const PHOTO_PREFIX: &str = "/uploads/dog-pictures/";

static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.content").expect("valid selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));
static CHARACTERISTIC_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table-02 tr").expect("valid selector"));
static STAR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="star-"]"#).expect("valid selector"));
static GALLERY_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.slideshow img[src]").expect("valid selector"));
static RELATED_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.like a[href]").expect("valid selector"));
static SUBHEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Output of extracting one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Record with every extractable field filled; id and refs are left to
    /// the caller
    pub record: BreedRecord,

    /// Absolute reference URLs in document order, without duplicates
    pub references: Vec<Url>,
}

/// Rule-driven breed page extractor
#[derive(Debug)]
pub struct Extractor {
    rules: Vec<CompiledRule>,
    photo_prefix: String,
}

#[derive(Debug)]
struct CompiledRule {
    field: Field,
    locator: CompiledLocator,
    cleanup: Cleanup,
}

#[derive(Debug)]
enum CompiledLocator {
    Select(Selector),
    LabeledCell(String),
    AfterHeading { heading: String, tag: String },
}

/// Cleaned value before it is assigned to a field
enum FieldValue {
    Text(String),
    List(Vec<String>),
    Range([u32; 2]),
}

impl Extractor {
    /// Creates an extractor with the catalog's default rule table
    pub fn new() -> Result<Self, DogfetchError> {
        Self::with_rules(default_rules())
    }

    /// Creates an extractor with a custom rule table
    ///
    /// Rules run in order; when two rules target the same field the later
    /// one wins if it finds anything. Fails if a `Select` locator is not a
    /// valid CSS selector.
    pub fn with_rules(rules: Vec<FieldRule>) -> Result<Self, DogfetchError> {
        let rules = rules
            .into_iter()
            .map(|rule| -> Result<CompiledRule, DogfetchError> {
                let locator = match rule.locator {
                    Locator::Select(css) => CompiledLocator::Select(parse_selector(&css)?),
                    Locator::LabeledCell(label) => CompiledLocator::LabeledCell(label),
                    Locator::AfterHeading { heading, tag } => CompiledLocator::AfterHeading {
                        heading,
                        tag: tag.to_ascii_lowercase(),
                    },
                };
                Ok(CompiledRule {
                    field: rule.field,
                    locator,
                    cleanup: rule.cleanup,
                })
            })
            .collect::<Result<Vec<_>, DogfetchError>>()?;

        Ok(Self {
            rules,
            photo_prefix: PHOTO_PREFIX.to_string(),
        })
    }

    /// Replaces the path prefix gallery images must live under
    pub fn with_photo_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.photo_prefix = prefix.into();
        self
    }

    /// Extracts one breed page
    ///
    /// `page_url` is the address the bytes were fetched from; relative links
    /// are resolved against it. Malformed or partial markup never fails the
    /// extraction, it only leaves fields empty.
    pub fn extract(&self, raw: &[u8], page_url: &Url) -> Extraction {
        let html = String::from_utf8_lossy(raw);
        let document = Html::parse_document(&html);
        let region = document
            .select(&CONTENT)
            .next()
            .unwrap_or_else(|| document.root_element());

        let mut record = BreedRecord::default();

        for rule in &self.rules {
            let Some(element) = locate(region, &rule.locator) else {
                tracing::trace!("No match for {:?} on {}", rule.field, page_url);
                continue;
            };

            let value = clean(rule.cleanup, &fragments(element));
            assign(&mut record, rule.field, value);
        }

        record.other_names = dedupe(std::mem::take(&mut record.other_names));
        record.colors = dedupe(std::mem::take(&mut record.colors));
        record.breed_chars = characteristics(region);
        record.add_images(self.gallery(region, page_url));

        let mut references = Vec::new();
        let mut seen = HashSet::new();
        for link in reference_links(region, page_url) {
            let key = normalize_url(link.url.as_str())
                .map(|u| u.to_string())
                .unwrap_or_else(|_| link.url.to_string());
            if !seen.insert(key) {
                continue;
            }

            if link.relative {
                let id = breed_id(link.url.path());
                if !record.breed_recs.contains(&id) {
                    record.breed_recs.push(id);
                }
            }
            references.push(link.url);
        }

        Extraction { record, references }
    }

    fn gallery(&self, region: ElementRef<'_>, page_url: &Url) -> Vec<String> {
        region
            .select(&GALLERY_IMAGE)
            .filter_map(|img| img.value().attr("src"))
            .filter_map(|src| resolve_link(src, page_url))
            .filter(|url| url.path().starts_with(&self.photo_prefix))
            .map(|url| url.to_string())
            .collect()
    }
}

fn parse_selector(css: &str) -> Result<Selector, DogfetchError> {
    Selector::parse(css).map_err(|e| {
        DogfetchError::Config(ConfigError::InvalidPattern(format!(
            "invalid selector {:?}: {:?}",
            css, e
        )))
    })
}

fn locate<'a>(region: ElementRef<'a>, locator: &CompiledLocator) -> Option<ElementRef<'a>> {
    match locator {
        CompiledLocator::Select(selector) => region.select(selector).next(),
        CompiledLocator::LabeledCell(label) => labeled_cell(region, label),
        CompiledLocator::AfterHeading { heading, tag } => after_heading(region, heading, tag),
    }
}

/// Cell following the `<td>` whose text is `label`
fn labeled_cell<'a>(region: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    let label_cell = region
        .select(&CELL)
        .find(|td| clean_text(&text_of(*td)).eq_ignore_ascii_case(label))?;

    label_cell
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "td")
}

/// First `tag` element after the heading titled `heading`, in document order
fn after_heading<'a>(region: ElementRef<'a>, heading: &str, tag: &str) -> Option<ElementRef<'a>> {
    let mut past_heading = false;

    for element in region.descendants().filter_map(ElementRef::wrap) {
        let name = element.value().name();
        if past_heading {
            if name == tag {
                return Some(element);
            }
        } else if is_heading(name) && clean_text(&text_of(element)).eq_ignore_ascii_case(heading) {
            past_heading = true;
        }
    }

    None
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// One fragment per paragraph, or the whole text when there are none
fn fragments(element: ElementRef<'_>) -> Vec<String> {
    let paragraphs: Vec<String> = element.select(&PARAGRAPH).map(text_of).collect();
    if paragraphs.is_empty() {
        vec![text_of(element)]
    } else {
        paragraphs
    }
}

fn clean(cleanup: Cleanup, fragments: &[String]) -> FieldValue {
    match cleanup {
        Cleanup::Trim => FieldValue::Text(clean_text(&fragments.join(" "))),
        Cleanup::CommaSet => FieldValue::List(comma_set(fragments)),
        Cleanup::PhraseList => FieldValue::List(phrase_list(fragments)),
        Cleanup::PhraseSet => FieldValue::List(phrase_set(fragments)),
        Cleanup::SpanList => FieldValue::List(span_list(fragments)),
        Cleanup::Range => FieldValue::Range(parse_range(&fragments.join(" "))),
    }
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::List(items) => items.join(", "),
            Self::Range(_) => String::new(),
        }
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![text],
            Self::List(items) => items,
            Self::Range(_) => Vec::new(),
        }
    }

    fn into_range(self) -> [u32; 2] {
        match self {
            Self::Text(text) => parse_range(&text),
            Self::List(items) => parse_range(&items.join(" ")),
            Self::Range(range) => range,
        }
    }
}

fn assign(record: &mut BreedRecord, field: Field, value: FieldValue) {
    match field {
        Field::Name => record.name = value.into_text(),
        Field::Type => record.breed_type = value.into_text(),
        Field::History => record.history = value.into_text(),
        Field::OtherNames => record.other_names = value.into_list(),
        Field::Origin => record.origin = value.into_list(),
        Field::BreedGroups => record.breed_groups = value.into_list(),
        Field::Size => record.size = value.into_list(),
        Field::Temperaments => record.temperaments = value.into_list(),
        Field::Colors => record.colors = value.into_list(),
        Field::Lifespan => record.lifespan = value.into_range(),
        Field::LitterSize => record.litter_size = value.into_range(),
    }
}

/// Trait label to star count (0-5) from the characteristics table
fn characteristics(region: ElementRef<'_>) -> BTreeMap<String, u8> {
    let mut scores = BTreeMap::new();

    for row in region.select(&CHARACTERISTIC_ROW) {
        let Some(label_cell) = row.select(&CELL).next() else {
            continue;
        };
        let label = clean_text(&text_of(label_cell));
        if label.is_empty() {
            continue;
        }

        let Some(star) = row.select(&STAR).next() else {
            continue;
        };
        scores.insert(label, star_score(star));
    }

    scores
}

/// Reads the count from a `star-0N` class, then from the text ("3 stars")
fn star_score(element: ElementRef<'_>) -> u8 {
    let from_class = element
        .value()
        .classes()
        .find_map(|c| c.strip_prefix("star-"))
        .and_then(|n| n.parse::<u8>().ok());

    let from_text = || {
        let text = text_of(element);
        let digits: String = text
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u8>().ok()
    };

    from_class.or_else(from_text).unwrap_or(0).min(5)
}

/// Links in the related-breeds block and the list under "References"
fn reference_links(region: ElementRef<'_>, page_url: &Url) -> Vec<ResolvedLink> {
    let mut hrefs: Vec<&str> = region
        .select(&RELATED_LINK)
        .filter_map(|a| a.value().attr("href"))
        .collect();

    for heading in region.select(&SUBHEADING) {
        if !clean_text(&text_of(heading)).eq_ignore_ascii_case("References") {
            continue;
        }

        let list = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|e| !is_heading(e.value().name()))
            .find(|e| matches!(e.value().name(), "ul" | "ol"));

        if let Some(list) = list {
            hrefs.extend(list.select(&LINK).filter_map(|a| a.value().attr("href")));
        }
    }

    hrefs
        .into_iter()
        .filter_map(|href| resolve_reference(href, page_url))
        .collect()
}

fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

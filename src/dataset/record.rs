//! Breed record and reference metadata types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured representation of one catalog entry
///
/// Every field is always present in the serialized form; a rule that did
/// not match leaves an empty string, an empty collection, or `[0, 0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BreedRecord {
    /// MD5 of the canonical page path
    pub id: String,

    #[serde(rename = "type")]
    pub breed_type: String,

    pub name: String,

    pub size: Vec<String>,

    #[serde(rename = "origins")]
    pub origin: Vec<String>,

    /// Deduplicated
    pub colors: Vec<String>,

    pub images: Vec<String>,

    pub temperaments: Vec<String>,

    /// Deduplicated
    pub other_names: Vec<String>,

    pub breed_groups: Vec<String>,

    /// Trait label to star count (0-5)
    pub breed_chars: BTreeMap<String, u8>,

    /// `[min, max]`
    pub litter_size: [u32; 2],

    /// `[min, max]` in years
    pub lifespan: [u32; 2],

    pub history: String,

    /// Ids of related breed pages
    pub breed_recs: Vec<String>,

    /// Normalized absolute reference URL to resolved metadata
    pub refs: BTreeMap<String, ReferenceData>,
}

impl BreedRecord {
    /// Appends images that are not already present, keeping insertion order
    pub fn add_images<I>(&mut self, images: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.images.len();
        for image in images {
            if !self.images.contains(&image) {
                self.images.push(image);
            }
        }
        self.images.len() - before
    }
}

/// Metadata attached to one outbound reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceData {
    /// Title and description read from the page's meta tags
    Page { title: String, description: String },

    /// oEmbed payload from a video provider
    Embed {
        payload: serde_json::Map<String, serde_json::Value>,
    },

    /// Nothing could be derived; the bare URL is kept
    Opaque { url: String },
}

impl ReferenceData {
    pub fn opaque(url: impl Into<String>) -> Self {
        Self::Opaque { url: url.into() }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque { .. })
    }
}

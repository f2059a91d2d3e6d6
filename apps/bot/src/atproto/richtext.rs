//! Rich-text assembly for outgoing posts.
//!
//! Facets index into the UTF-8 encoding of the text, so offsets are tracked in
//! bytes while segments are appended rather than detected afterwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Default)]
pub struct RichTextBuilder {
    text: String,
    facets: Vec<Facet>,
}

impl RichTextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, segment: &str) -> Self {
        self.text.push_str(segment);
        self
    }

    /// Appends `@{handle}` annotated as a mention of `did`.
    pub fn mention(self, handle: &str, did: &str) -> Self {
        self.annotated(
            &format!("@{handle}"),
            FacetFeature::Mention {
                did: did.to_string(),
            },
        )
    }

    /// Appends `url` annotated as a link to itself.
    pub fn link(self, url: &str) -> Self {
        self.annotated(
            url,
            FacetFeature::Link {
                uri: url.to_string(),
            },
        )
    }

    fn annotated(mut self, segment: &str, feature: FacetFeature) -> Self {
        let byte_start = self.text.len();
        self.text.push_str(segment);
        self.facets.push(Facet {
            index: ByteSlice {
                byte_start,
                byte_end: self.text.len(),
            },
            features: vec![feature],
        });
        self
    }

    pub fn build(self) -> (String, Vec<Facet>) {
        (self.text, self.facets)
    }
}

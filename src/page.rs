use crate::error::Result;

/// Markup of a page's latest revision, as delivered by the wiki API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaWikiContent {
    pub content: String,
    /// Revision timestamp, kept as the API sent it
    pub timestamp: String,
}

impl MediaWikiContent {
    pub fn new(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Source of page markup, e.g. a MediaWiki API client.
///
/// Implementations report a missing page as [`crate::Error::PageNotFound`].
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<MediaWikiContent>;
}

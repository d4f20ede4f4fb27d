//! Field extraction from the NCBI Gene full report page.
//!
//! The page is scraped by plain substring search, so the marker text is the
//! only contract with the remote HTML. Swap the extractor when the page changes.

use crate::config::SummaryMarkerEntry;

pub const SUMMARY_NOT_FOUND: &str = "Not found";

pub trait SummaryExtractor {
    /// Returns the field text, or `None` when the document does not carry it.
    fn extract(&self, document: &str) -> Option<String>;
}

/// Takes the text between the first `open`/`close` pair after `marker`.
#[derive(Debug, Clone)]
pub struct MarkerExtractor {
    marker: String,
    open: String,
    close: String,
}

impl MarkerExtractor {
    pub fn new(
        marker: impl Into<String>,
        open: impl Into<String>,
        close: impl Into<String>,
    ) -> Self {
        Self {
            marker: marker.into(),
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn from_entry(entry: &SummaryMarkerEntry) -> Self {
        Self::new(&entry.marker, &entry.open, &entry.close)
    }
}

impl Default for MarkerExtractor {
    fn default() -> Self {
        Self::from_entry(&SummaryMarkerEntry::default())
    }
}

impl SummaryExtractor for MarkerExtractor {
    fn extract(&self, document: &str) -> Option<String> {
        let marker_at = document.find(&self.marker)?;
        let after_marker = &document[marker_at + self.marker.len()..];
        let open_at = after_marker.find(&self.open)?;
        let field = &after_marker[open_at + self.open.len()..];
        let close_at = field.find(&self.close)?;
        Some(field[..close_at].trim().to_string())
    }
}

/// Adapts a closure into an extractor.
pub struct FnExtractor<F>(pub F);

impl<F> SummaryExtractor for FnExtractor<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn extract(&self, document: &str) -> Option<String> {
        (self.0)(document)
    }
}

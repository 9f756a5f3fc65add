//! Catalog and directory providers
//!
//! `IHeartCatalog` implements the engine's `CatalogClient` (search, artist and
//! song radio, live stations). `RadioBrowser` is a plain station directory
//! whose hits already carry a stream locator.

pub mod iheart;
pub mod radio_browser;

pub use iheart::IHeartCatalog;
pub use radio_browser::RadioBrowser;

use stationdeck::catalog::SearchHit;

use crate::error::Result;

/// A searchable list of internet radio stations
pub trait StationDirectory: Send + Sync {
    /// Display name (e.g., "Radio Browser")
    fn name(&self) -> &'static str;

    /// Search by station name. Every hit carries a locator.
    fn search(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<SearchHit>>;
}

/// Convert an empty or blank string to None
pub(crate) fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" KISS "), Some("KISS".to_string()));
    }
}

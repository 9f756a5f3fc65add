//! Radio Browser directory
//!
//! Community database of internet radio stations
//! (<https://www.radio-browser.info/>). Hits become internet stations that
//! play their stream URL directly.

use serde::Deserialize;
use stationdeck::catalog::{SearchCategory, SearchHit};
use tracing::debug;

use crate::config::providers::RADIO_BROWSER_DEFAULT_SERVER;
use crate::error::Result;
use crate::network::HttpClient;

use super::{non_empty, StationDirectory};

#[derive(Debug, Deserialize)]
struct RbStation {
    stationuuid: String,
    name: String,
    #[serde(default)]
    url_resolved: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    bitrate: u32,
}

impl RbStation {
    /// Prefer `url_resolved`, fall back to `url`
    fn locator(&self) -> Option<String> {
        non_empty(&self.url_resolved).or_else(|| non_empty(&self.url))
    }

    /// e.g. "Germany, MP3 128kbps"
    fn description(&self) -> Option<String> {
        let audio = match (non_empty(&self.codec), self.bitrate) {
            (Some(codec), 0) => Some(codec),
            (Some(codec), kbps) => Some(format!("{} {}kbps", codec, kbps)),
            (None, 0) => None,
            (None, kbps) => Some(format!("{}kbps", kbps)),
        };
        match (non_empty(&self.country), audio) {
            (Some(c), Some(a)) => Some(format!("{}, {}", c, a)),
            (c, a) => c.or(a),
        }
    }

    fn into_hit(self) -> Option<SearchHit> {
        let locator = self.locator()?;
        let description = self.description();
        Some(SearchHit {
            id: self.stationuuid,
            name: self.name.trim().to_string(),
            category: SearchCategory::Stations,
            description,
            artist_id: None,
            locator: Some(locator),
        })
    }
}

pub struct RadioBrowser {
    client: HttpClient,
    base_url: String,
}

impl RadioBrowser {
    /// Create a directory client using the default server
    pub fn new() -> Result<Self> {
        Self::with_base_url(RADIO_BROWSER_DEFAULT_SERVER)
    }

    /// Use a custom server (mirrors)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.into(),
        })
    }
}

impl StationDirectory for RadioBrowser {
    fn name(&self) -> &'static str {
        "Radio Browser"
    }

    fn search(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<SearchHit>> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let stations: Vec<RbStation> = self.client.post_form_json(
            &format!("{}/json/stations/search", self.base_url),
            &[
                ("name", query),
                ("limit", &limit),
                ("offset", &offset),
                ("order", "clickcount"),
                ("reverse", "true"),
                ("hidebroken", "true"),
            ],
        )?;
        debug!(query, count = stations.len(), "radio browser search");
        Ok(stations.into_iter().filter_map(RbStation::into_hit).collect())
    }
}

//! Playlist parsing (PLS/M3U)
//!
//! Resolves indirect locators to stream URLs.

use std::time::Duration;

use crate::config::network::{CONNECT_TIMEOUT_SECS, MAX_PLAYLIST_DEPTH, USER_AGENT};
use crate::error::{DeckError, Result};

/// Result of checking a URL's playlist type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistCheck {
    Pls,
    M3u,
    Hls,
    NotPlaylist,
}

/// Classify a URL by its extension, ignoring any query string
pub fn check_playlist_type(url: &str) -> PlaylistCheck {
    let lower = url.to_lowercase();
    let path = lower.split('?').next().unwrap_or(&lower);
    if path.ends_with(".m3u8") {
        PlaylistCheck::Hls
    } else if path.ends_with(".pls") {
        PlaylistCheck::Pls
    } else if path.ends_with(".m3u") {
        PlaylistCheck::M3u
    } else {
        PlaylistCheck::NotPlaylist
    }
}

/// Directory part of a URL
pub fn get_base_url(url: &str) -> String {
    url.rsplit_once('/')
        .map(|(base, _)| base)
        .unwrap_or("")
        .to_string()
}

/// Make a URI absolute against `base_url` unless it already is
pub fn make_absolute_url(uri: &str, base_url: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.to_string()
    } else {
        format!("{}/{}", base_url, uri.trim_start_matches('/'))
    }
}

/// First stream URL of a PLS playlist
pub fn parse_pls(content: &str) -> Option<String> {
    content.lines().map(str::trim).find_map(|line| {
        let (key, value) = line.split_once('=')?;
        let value = value.trim();
        (key.to_lowercase().starts_with("file") && value.starts_with("http"))
            .then(|| value.to_string())
    })
}

/// First stream URL of an M3U playlist
pub fn parse_m3u(content: &str, base_url: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .find_map(|line| {
            if line.starts_with("http://") || line.starts_with("https://") {
                Some(line.to_string())
            } else if !line.contains('=') {
                Some(make_absolute_url(line, base_url))
            } else {
                None
            }
        })
}

/// Follow PLS/M3U chains to a direct or HLS URL.
///
/// HLS and plain URLs pass through unchanged.
pub fn resolve_playlist_url(url: &str) -> Result<String> {
    resolve_recursive(url, MAX_PLAYLIST_DEPTH)
}

fn resolve_recursive(url: &str, depth: usize) -> Result<String> {
    if depth == 0 {
        return Err(DeckError::StreamUnavailable(
            "Playlist nesting too deep".to_string(),
        ));
    }

    let next = match check_playlist_type(url) {
        PlaylistCheck::Hls | PlaylistCheck::NotPlaylist => return Ok(url.to_string()),
        PlaylistCheck::Pls => parse_pls(&fetch_playlist(url)?),
        PlaylistCheck::M3u => parse_m3u(&fetch_playlist(url)?, &get_base_url(url)),
    };
    let next = next.ok_or_else(|| {
        DeckError::StreamUnavailable(format!("No stream URL found in playlist {}", url))
    })?;
    resolve_recursive(&next, depth - 1)
}

fn fetch_playlist(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()?;

    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(DeckError::StreamUnavailable(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }
    Ok(response.text()?)
}

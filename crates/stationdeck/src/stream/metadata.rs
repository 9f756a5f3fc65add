//! In-band stream metadata
//!
//! ICY (Icecast/Shoutcast) `StreamTitle` parsing.

/// "Now playing" data carried inside a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl StreamMetadata {
    /// Split an ICY title on the first ` - `: "Artist - Title".
    /// Without a separator the whole string is the title.
    pub fn from_icy_title(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::default();
        }

        match raw.split_once(" - ") {
            Some((artist, title)) => Self {
                title: non_empty(title),
                artist: non_empty(artist),
            },
            None => Self {
                title: Some(raw.to_string()),
                artist: None,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Extract the `StreamTitle` value from an ICY metadata string.
///
/// Format: `StreamTitle='Artist - Song';StreamUrl='...';`
pub fn parse_icy_metadata(metadata: &str) -> Option<String> {
    const KEY: &str = "StreamTitle='";
    let start = metadata.find(KEY)? + KEY.len();
    let end = metadata[start..].find("';")?;
    non_empty(&metadata[start..start + end])
}

/// Extract the title from a raw metadata block. Blocks are null-padded to a
/// multiple of 16 bytes.
pub fn extract_icy_title(raw_block: &[u8]) -> Option<String> {
    let end = raw_block.iter().rposition(|&b| b != 0)? + 1;
    let meta_str = String::from_utf8_lossy(&raw_block[..end]);
    parse_icy_metadata(&meta_str)
}

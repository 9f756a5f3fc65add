//! Local playlist sequencer
//!
//! Keeps the canonical (stored) order next to a play order that is always a
//! permutation of it. With shuffle off the play order is a rotation of the
//! canonical order, so traversal continues from the current track.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::{DeckError, Result};
use crate::store::PlaylistRecord;
use crate::track::Track;

use super::TrackSource;

#[derive(Debug, Clone)]
pub struct PlaylistSequencer {
    name: String,
    canonical: Vec<Track>,
    play_order: VecDeque<Track>,
    shuffled: bool,
    now_playing: Option<String>,
    /// Canonical index the now-playing track held before it was removed
    removed_anchor: Option<usize>,
}

impl PlaylistSequencer {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let mut canonical: Vec<Track> = Vec::with_capacity(tracks.len());
        for track in tracks {
            if !canonical.iter().any(|t| t.id == track.id) {
                canonical.push(track);
            }
        }
        Self {
            name: name.into(),
            play_order: canonical.iter().cloned().collect(),
            canonical,
            shuffled: false,
            now_playing: None,
            removed_anchor: None,
        }
    }

    pub fn from_record(record: PlaylistRecord) -> Self {
        Self::new(record.name, record.tracks)
    }

    /// Canonical list as a storable record
    pub fn export(&self) -> PlaylistRecord {
        PlaylistRecord {
            name: self.name.clone(),
            tracks: self.canonical.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Yield the head of the play order and rotate it to the back
    pub fn next(&mut self) -> Result<Track> {
        let track = self
            .play_order
            .pop_front()
            .ok_or_else(|| DeckError::NotFound(format!("playlist {} is empty", self.name)))?;
        self.now_playing = Some(track.id.clone());
        self.removed_anchor = None;
        self.play_order.push_back(track.clone());
        Ok(track)
    }

    /// Flip shuffle. Returns the new state.
    ///
    /// Turning shuffle off continues with the stored track after the one now
    /// playing. If that track was removed, play continues with the track that
    /// took its place.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffled = !self.shuffled;
        if self.shuffled {
            let mut rng = rand::rng();
            self.play_order.make_contiguous().shuffle(&mut rng);
        } else {
            let offset = self
                .now_playing
                .as_deref()
                .and_then(|id| self.position(id))
                .map(|pos| pos + 1)
                .or(self.removed_anchor)
                .unwrap_or(0);
            self.play_order = self.rotated_canonical(offset);
        }
        debug!(playlist = self.name.as_str(), shuffled = self.shuffled, "shuffle toggled");
        self.shuffled
    }

    /// Rotate the play order so `canonical[index]` is yielded next
    pub fn jump_to(&mut self, index: usize) -> Result<&Track> {
        let len = self.canonical.len();
        let target = self
            .canonical
            .get(index)
            .ok_or(DeckError::InvalidIndex { index, len })?;
        let pos = self
            .play_order
            .iter()
            .position(|t| t.id == target.id)
            .unwrap_or(0);
        self.play_order.rotate_left(pos);
        debug!(playlist = self.name.as_str(), index, "jump queued");
        Ok(target)
    }

    /// Remove a track from both orders. Returns whether it was present.
    pub fn remove_by_id(&mut self, track_id: &str) -> bool {
        let before = self.canonical.len();
        if self.now_playing.as_deref() == Some(track_id) {
            self.removed_anchor = self.position(track_id);
        }
        self.canonical.retain(|t| t.id != track_id);
        self.play_order.retain(|t| t.id != track_id);
        let removed = self.canonical.len() != before;
        if removed {
            debug!(playlist = self.name.as_str(), track_id, "track removed");
        }
        removed
    }

    /// Append a track unless its id is already present.
    ///
    /// Unshuffled, the track lands right after the last stored track in the
    /// play order, so the order stays a rotation of the stored list.
    pub fn add_track(&mut self, track: Track) -> bool {
        if self.position(&track.id).is_some() {
            return false;
        }
        let at = if self.shuffled {
            self.play_order.len()
        } else {
            self.insertion_point()
        };
        self.play_order.insert(at, track.clone());
        self.canonical.push(track);
        true
    }

    /// Play-order slot that follows the last stored track
    fn insertion_point(&self) -> usize {
        let Some(last) = self.canonical.last() else {
            return 0;
        };
        let Some(pos) = self.play_order.iter().position(|t| t.id == last.id) else {
            return self.play_order.len();
        };
        // The back of the play order is the track that just played, so a
        // new track following it plays next
        let just_played = self.now_playing.as_deref() == Some(last.id.as_str());
        if pos + 1 == self.play_order.len() && just_played {
            0
        } else {
            pos + 1
        }
    }

    /// Tracks in canonical order
    pub fn tracks(&self) -> &[Track] {
        &self.canonical
    }

    /// Tracks in the order they will be played from now on
    pub fn upcoming(&self) -> impl Iterator<Item = &Track> {
        self.play_order.iter()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn now_playing_id(&self) -> Option<&str> {
        self.now_playing.as_deref()
    }

    fn position(&self, track_id: &str) -> Option<usize> {
        self.canonical.iter().position(|t| t.id == track_id)
    }

    fn rotated_canonical(&self, offset: usize) -> VecDeque<Track> {
        let mut order: VecDeque<Track> = self.canonical.iter().cloned().collect();
        if !order.is_empty() {
            order.rotate_left(offset % order.len());
        }
        order
    }
}

impl TrackSource for PlaylistSequencer {
    fn next_track(&mut self, _stop: &Arc<AtomicBool>) -> Result<Track> {
        self.next()
    }

    fn as_sequencer(&mut self) -> Option<&mut PlaylistSequencer> {
        Some(self)
    }

    fn as_sequencer_ref(&self) -> Option<&PlaylistSequencer> {
        Some(self)
    }
}

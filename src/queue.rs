//! Per-session track queue.
//!
//! ```text
//! previous (most recent last) | current | pending (play order)
//! ```

use std::collections::VecDeque;

use crate::model::track::Track;

#[derive(Debug, Clone)]
pub struct Queue {
    /// Tracks waiting to be played, in play order.
    pending: VecDeque<Track>,
    /// The track actively streaming, never also in `pending`.
    current: Option<Track>,
    /// Previously played tracks, most recent at the back.
    previous: VecDeque<Track>,
    history_depth: usize
}

impl Queue {
    pub fn new(history_depth: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            current: None,
            previous: VecDeque::with_capacity(history_depth),
            history_depth
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> &VecDeque<Track> {
        &self.pending
    }

    /// Previously played tracks, oldest first.
    pub fn previous(&self) -> &VecDeque<Track> {
        &self.previous
    }

    pub fn has_previous(&self) -> bool {
        !self.previous.is_empty()
    }

    /// Nothing streaming and nothing waiting.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.pending.extend(tracks);
    }

    pub fn push_front(&mut self, track: Track) {
        self.pending.push_front(track);
    }

    pub fn push_back(&mut self, track: Track) {
        self.pending.push_back(track);
    }

    /// Records a played track, evicting the oldest entry once full.
    pub fn remember(&mut self, track: Track) {
        if self.history_depth == 0 {
            return;
        }
        if self.previous.len() >= self.history_depth {
            self.previous.pop_front();
        }
        self.previous.push_back(track);
    }

    /// Moves the head of the pending tracks into `current`, returning what
    /// was current before.
    pub fn advance(&mut self) -> Option<Track> {
        let next = self.pending.pop_front();
        std::mem::replace(&mut self.current, next)
    }

    /// Replaces the current track, returning the old one.
    pub fn replace_current(&mut self, track: Option<Track>) -> Option<Track> {
        std::mem::replace(&mut self.current, track)
    }

    pub fn take_previous(&mut self) -> Option<Track> {
        self.previous.pop_back()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
    }
}

//! View-agnostic projections of a session.
//!
//! Everything here reads a [`PlaybackSession`] and never changes it. The
//! presentation layer turns the results into embeds and buttons.

use std::time::Duration;

use crate::model::id::{ChannelId, GuildId};
use crate::model::track::Track;
use crate::panel::PanelAction;
use crate::session::{LoopMode, PlaybackSession};

/// Which face of the panel is shown. Carried explicitly by the caller
/// rather than guessed from what was rendered last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelView {
    #[default]
    NowPlaying,
    Queue
}

/// Full state of a session at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub guild: GuildId,
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
    pub current: Option<Track>,
    pub position: Duration,
    pub duration: Duration,
    pub paused: bool,
    pub requester: String,
    pub volume: u8,
    pub loop_mode: LoopMode,
    pub queue: Vec<Track>,
    pub queue_length: usize,
    pub has_previous: bool,
    pub filters: Vec<String>
}

impl SessionSnapshot {
    pub fn of(session: &PlaybackSession) -> Self {
        let current = session.current().cloned();
        let queue: Vec<Track> = session.queue().pending().iter().cloned().collect();

        Self {
            guild: session.guild(),
            voice_channel: session.voice_channel(),
            text_channel: session.text_channel(),
            position: session.position(),
            duration: current.as_ref().map(Track::duration).unwrap_or_default(),
            requester: requester_label(current.as_ref()),
            current,
            paused: session.is_paused(),
            volume: session.volume(),
            loop_mode: session.loop_mode(),
            queue_length: queue.len(),
            queue,
            has_previous: session.queue().has_previous(),
            filters: session.filters().enabled_labels()
        }
    }

    /// Fraction of the current track already played, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }

        (self.position.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn queue_view(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.current.clone(),
            upcoming: self.queue.clone(),
            total: self.queue_length
        }
    }
}

fn requester_label(track: Option<&Track>) -> String {
    match track.and_then(|t| t.requester.as_deref()) {
        Some(name) if name.starts_with('@') => name.to_string(),
        Some(name) => format!("@{name}"),
        None => "Unknown".to_string()
    }
}

/// Now playing plus what comes after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub total: usize
}

impl QueueSnapshot {
    /// The first `limit` upcoming tracks, numbered from 1.
    pub fn page(&self, limit: usize) -> impl Iterator<Item = (usize, &Track)> {
        self.upcoming.iter().take(limit).enumerate().map(|(i, t)| (i + 1, t))
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.upcoming.is_empty()
    }
}

/// Label, action and enablement of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub action: PanelAction,
    pub enabled: bool,
    /// Highlighted, like an active loop mode.
    pub active: bool
}

impl Button {
    fn new(label: &'static str, action: PanelAction, enabled: bool) -> Self {
        Self {
            label,
            action,
            enabled,
            active: false
        }
    }
}

/// Button state of the panel, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelButtons {
    pub volume_down: Button,
    pub previous: Button,
    pub pause: Button,
    pub skip: Button,
    pub volume_up: Button,
    pub loop_mode: Button,
    pub stop: Button,
    pub view_toggle: Button,
    pub filter_reset: Button,
    pub refresh: Button
}

impl PanelButtons {
    /// Projects the buttons for `snapshot`; `None` means no session, which
    /// disables everything.
    pub fn project(snapshot: Option<&SessionSnapshot>, view: PanelView) -> Self {
        let live = snapshot.is_some();
        let paused = snapshot.map(|s| s.paused).unwrap_or(false);
        let loop_mode = snapshot.map(|s| s.loop_mode).unwrap_or_default();

        let loop_label = match loop_mode {
            LoopMode::Off => "Loop",
            LoopMode::Track => "Track",
            LoopMode::Queue => "Queue"
        };

        Self {
            volume_down: Button::new("Down", PanelAction::VolumeDown, live),
            previous: Button::new("Back", PanelAction::Previous, snapshot.map(|s| s.has_previous).unwrap_or(false)),
            pause: Button::new(if paused { "Resume" } else { "Pause" }, PanelAction::TogglePause, live),
            skip: Button::new("Skip", PanelAction::Skip, live),
            volume_up: Button::new("Up", PanelAction::VolumeUp, live),
            loop_mode: Button {
                active: loop_mode != LoopMode::Off,
                ..Button::new(loop_label, PanelAction::CycleLoop, live)
            },
            stop: Button::new("Stop", PanelAction::Stop, live),
            // The queue face leads back to the current track.
            view_toggle: match view {
                PanelView::Queue => Button::new("Back", PanelAction::Refresh, live),
                PanelView::NowPlaying => Button::new("Queue", PanelAction::ShowQueue, live)
            },
            filter_reset: Button::new("Reset filter", PanelAction::FilterReset, live),
            refresh: Button::new("Refresh", PanelAction::Refresh, live)
        }
    }
}

/// Everything needed to render the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub view: PanelView,
    pub snapshot: Option<SessionSnapshot>,
    pub buttons: PanelButtons
}

impl Panel {
    pub fn project(snapshot: Option<SessionSnapshot>, view: PanelView) -> Self {
        Self {
            view,
            buttons: PanelButtons::project(snapshot.as_ref(), view),
            snapshot
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::track;

    fn session() -> PlaybackSession {
        let mut s = PlaybackSession::new(GuildId(1), ChannelId(2), ChannelId(3), 80, LoopMode::Queue, 5);
        s.queue.extend([track("a").with_requester("alice"), track("b")]);
        s.queue.advance();
        s
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reflects_session() {
        let s = session();
        let snap = SessionSnapshot::of(&s);

        assert_eq!(snap.current.as_ref().unwrap().title(), "a");
        assert_eq!(snap.requester, "@alice");
        assert_eq!(snap.volume, 80);
        assert_eq!(snap.loop_mode, LoopMode::Queue);
        assert_eq!(snap.queue_length, 1);
        assert_eq!(snap.duration, Duration::from_secs(180));
        assert!(!snap.has_previous);
        assert_eq!(snap.progress(), 0.0);

        let page: Vec<_> = snap.queue_view().page(10).map(|(n, t)| (n, t.title().to_string())).collect();
        assert_eq!(page, [(1, "b".to_string())]);
    }

    #[test]
    fn buttons_without_session_are_disabled() {
        let buttons = PanelButtons::project(None, PanelView::NowPlaying);

        for b in [buttons.volume_down, buttons.pause, buttons.skip, buttons.stop, buttons.refresh] {
            assert!(!b.enabled);
        }
        assert_eq!(buttons.loop_mode.label, "Loop");
    }

    #[tokio::test(start_paused = true)]
    async fn buttons_follow_state() {
        let mut s = session();
        s.paused = true;
        s.queue.remember(track("z"));
        let snap = SessionSnapshot::of(&s);

        let buttons = PanelButtons::project(Some(&snap), PanelView::Queue);
        assert_eq!(buttons.pause.label, "Resume");
        assert!(buttons.previous.enabled);
        assert!(buttons.loop_mode.active);
        assert_eq!(buttons.loop_mode.label, "Queue");
        assert_eq!(buttons.view_toggle.label, "Back");
        assert_eq!(buttons.view_toggle.action, PanelAction::Refresh);
    }
}

use std::fmt;

use crate::model::filter::FilterPreset;
use crate::model::id::GuildId;
use crate::snapshot::{Panel, PanelView, QueueSnapshot};
use crate::{MusicManager, Result};

const PREFIX: &str = "music:";

/// A button press on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    VolumeDown,
    Previous,
    TogglePause,
    Skip,
    VolumeUp,
    CycleLoop,
    Stop,
    ShowQueue,
    FilterReset,
    Refresh
}

impl PanelAction {
    pub const ALL: [Self; 10] = [
        Self::VolumeDown,
        Self::Previous,
        Self::TogglePause,
        Self::Skip,
        Self::VolumeUp,
        Self::CycleLoop,
        Self::Stop,
        Self::ShowQueue,
        Self::FilterReset,
        Self::Refresh
    ];

    fn name(self) -> &'static str {
        match self {
            Self::VolumeDown => "volDown",
            Self::Previous => "previous",
            Self::TogglePause => "pause",
            Self::Skip => "skip",
            Self::VolumeUp => "volUp",
            Self::CycleLoop => "loop",
            Self::Stop => "stop",
            Self::ShowQueue => "queue",
            Self::FilterReset => "filterReset",
            Self::Refresh => "refresh"
        }
    }

    /// Component id carried by the button, like `music:skip`.
    pub fn custom_id(self) -> String {
        format!("{PREFIX}{}", self.name())
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        let name = id.strip_prefix(PREFIX)?;
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Whether the presser has to share the bot's voice channel. Looking
    /// is allowed to anyone.
    pub fn requires_voice(self) -> bool {
        !matches!(self, Self::ShowQueue | Self::Refresh)
    }
}

impl fmt::Display for PanelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to render after an action.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelUpdate {
    pub panel: Panel,
    /// Queue to show to the presser alone, filled by [`PanelAction::ShowQueue`].
    pub queue: Option<QueueSnapshot>
}

impl MusicManager {
    /// Runs a panel action against the guild's session and projects the
    /// panel to show next. `view` is the face currently displayed; it is
    /// kept unless the action moves the panel back to the current track.
    pub async fn handle_panel(&self, guild: GuildId, action: PanelAction, view: PanelView) -> Result<PanelUpdate> {
        let step = i64::from(self.config().volume_step);

        let view = match action {
            PanelAction::VolumeDown => {
                self.step_volume(guild, -step).await?;
                view
            },
            PanelAction::VolumeUp => {
                self.step_volume(guild, step).await?;
                view
            },
            PanelAction::Previous => {
                self.previous(guild).await?;
                PanelView::NowPlaying
            },
            PanelAction::TogglePause => {
                let paused = self.snapshot(guild).await.map(|s| s.paused);
                match paused {
                    Some(true) => self.resume(guild).await?,
                    _ => self.pause(guild).await?
                };
                view
            },
            PanelAction::Skip => {
                self.skip(guild).await?;
                PanelView::NowPlaying
            },
            PanelAction::CycleLoop => {
                let mode = self.loop_mode(guild).await?;
                self.set_loop(guild, mode.next()).await?;
                view
            },
            PanelAction::Stop => {
                self.stop(guild).await?;
                PanelView::NowPlaying
            },
            PanelAction::ShowQueue => PanelView::NowPlaying,
            PanelAction::FilterReset => {
                self.apply_preset(guild, FilterPreset::Off).await?;
                view
            },
            PanelAction::Refresh => PanelView::NowPlaying
        };

        let panel = self.panel(guild, view).await;
        let queue = match action {
            PanelAction::ShowQueue => Some(panel.snapshot.as_ref().map(|s| s.queue_view()).unwrap_or_default()),
            _ => None
        };

        Ok(PanelUpdate { panel, queue })
    }
}

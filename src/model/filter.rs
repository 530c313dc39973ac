use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single equalizer band. The node exposes 15 bands (0..=14) with gains
/// in `-0.25..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    pub band: u8,
    pub gain: f32
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timescale {
    pub speed: f32,
    pub pitch: f32,
    pub rate: f32
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Karaoke {
    pub level: f32,
    pub mono_level: f32,
    pub filter_band: f32,
    pub filter_width: f32
}

/// Shared shape of the tremolo and vibrato filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    pub frequency: f32,
    pub depth: f32
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    pub rotation_hz: f32
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPass {
    pub smoothing: f32
}

/// The complete filter set of a player. Sending it replaces whatever the
/// node had before, so an empty value clears everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<EqBand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Oscillation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Oscillation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>
}

pub const NIGHTCORE: Timescale = Timescale {
    speed: 1.3,
    pitch: 1.3,
    rate: 1.0
};

pub const VAPORWAVE: Timescale = Timescale {
    speed: 0.85,
    pitch: 0.8,
    rate: 1.0
};

const BASSBOOST: [f32; 15] = [
    0.6, 0.67, 0.67, 0.4, -0.5, 0.15, -0.45, 0.23, 0.35, 0.45, 0.55, -0.6, 0.55, -0.5, -0.75
];
const BETTER_MUSIC: [f32; 15] = [
    0.25, 0.025, 0.0125, 0.0, 0.0, -0.0125, -0.025, -0.0175, 0.0, 0.0, 0.0125, 0.025, 0.25, 0.125,
    0.125
];
const ROCK: [f32; 15] = [
    0.3, 0.25, 0.2, 0.1, 0.05, -0.05, -0.15, -0.2, -0.1, -0.05, 0.05, 0.1, 0.2, 0.25, 0.3
];
const CLASSIC: [f32; 15] = [
    0.375, 0.35, 0.125, 0.0, 0.0, 0.125, 0.55, 0.05, 0.125, 0.25, 0.2, 0.25, 0.3, 0.25, 0.3
];
const POP: [f32; 14] = [
    0.2635, 0.22141, -0.21141, -0.1851, -0.155, 0.21141, 0.22456, 0.237, 0.237, 0.237, -0.05,
    -0.116, 0.192, 0.0
];
const ELECTRONIC: [f32; 15] = [
    0.375, 0.35, 0.125, 0.0, 0.0, -0.125, -0.125, 0.0, 0.25, 0.125, 0.15, 0.2, 0.25, 0.35, 0.4
];
const FULL_SOUND: [f32; 15] = [
    0.625, 0.275, 0.2625, 0.25, 0.25, 0.2375, 0.225, 0.2325, 0.25, 0.25, 0.2625, 0.275, 0.625,
    0.375, 0.375
];
const GAMING: [f32; 15] = [
    0.35, 0.3, 0.25, 0.2, 0.15, 0.1, 0.05, 0.0, -0.05, -0.1, -0.15, -0.2, -0.25, -0.3, -0.35
];

/// Named equalizer presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqPreset {
    BassboostLow,
    BassboostMedium,
    BassboostHigh,
    BassboostEarrape,
    BetterMusic,
    Rock,
    Classic,
    Pop,
    Electronic,
    FullSound,
    Gaming
}

impl EqPreset {
    pub const ALL: [EqPreset; 11] = [
        Self::BassboostLow,
        Self::BassboostMedium,
        Self::BassboostHigh,
        Self::BassboostEarrape,
        Self::BetterMusic,
        Self::Rock,
        Self::Classic,
        Self::Pop,
        Self::Electronic,
        Self::FullSound,
        Self::Gaming
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BassboostLow => "BassboostLow",
            Self::BassboostMedium => "BassboostMedium",
            Self::BassboostHigh => "BassboostHigh",
            Self::BassboostEarrape => "BassboostEarrape",
            Self::BetterMusic => "BetterMusic",
            Self::Rock => "Rock",
            Self::Classic => "Classic",
            Self::Pop => "Pop",
            Self::Electronic => "Electronic",
            Self::FullSound => "FullSound",
            Self::Gaming => "Gaming"
        }
    }

    pub fn bands(self) -> Vec<EqBand> {
        let scaled = |factor: f32| BASSBOOST.iter().map(|g| g * factor).collect::<Vec<_>>();
        let gains = match self {
            Self::BassboostLow => scaled(0.125),
            Self::BassboostMedium => scaled(0.1875),
            Self::BassboostHigh => scaled(0.25),
            Self::BassboostEarrape => scaled(0.375),
            Self::BetterMusic => BETTER_MUSIC.to_vec(),
            Self::Rock => ROCK.to_vec(),
            Self::Classic => CLASSIC.to_vec(),
            Self::Pop => POP.to_vec(),
            Self::Electronic => ELECTRONIC.to_vec(),
            Self::FullSound => FULL_SOUND.to_vec(),
            Self::Gaming => GAMING.to_vec()
        };

        gains.into_iter()
            .enumerate()
            .map(|(band, gain)| EqBand { band: band as u8, gain })
            .collect()
    }

    /// Finds the preset whose bands are exactly `bands`.
    pub fn matching(bands: &[EqBand]) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.bands() == bands)
    }
}

/// A filter request as issued by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPreset {
    /// Clears every filter, the equalizer included.
    Off,
    Nightcore,
    Vaporwave,
    Equalizer(EqPreset)
}

impl FromStr for FilterPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "Off" => Ok(Self::Off),
            "Nightcore" | "nightcore" => Ok(Self::Nightcore),
            "Vaporwave" | "vaporwave" => Ok(Self::Vaporwave),
            other => EqPreset::ALL
                .into_iter()
                .find(|p| p.name().eq_ignore_ascii_case(other))
                .map(Self::Equalizer)
                .ok_or_else(|| other.to_string())
        }
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Nightcore => f.write_str("Nightcore"),
            Self::Vaporwave => f.write_str("Vaporwave"),
            Self::Equalizer(p) => f.write_str(p.name())
        }
    }
}

impl Filters {
    /// Applies a preset on top of the current set. The timescale presets
    /// toggle and replace each other; equalizer presets replace the bands.
    pub fn apply(&mut self, preset: FilterPreset) {
        match preset {
            FilterPreset::Off => *self = Filters::default(),
            FilterPreset::Nightcore => self.toggle_timescale(NIGHTCORE),
            FilterPreset::Vaporwave => self.toggle_timescale(VAPORWAVE),
            FilterPreset::Equalizer(p) => self.equalizer = Some(p.bands())
        }
    }

    fn toggle_timescale(&mut self, timescale: Timescale) {
        self.timescale = match self.timescale {
            Some(current) if current == timescale => None,
            _ => Some(timescale)
        };
    }

    pub fn is_empty(&self) -> bool {
        self == &Filters::default()
    }

    /// Human readable labels of every active filter.
    pub fn enabled_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();

        match self.timescale {
            Some(t) if t == NIGHTCORE => labels.push("Nightcore".to_string()),
            Some(t) if t == VAPORWAVE => labels.push("Vaporwave".to_string()),
            Some(_) => labels.push("Custom (speed/pitch/rate)".to_string()),
            None => {}
        }

        if let Some(bands) = self.equalizer.as_deref().filter(|b| !b.is_empty()) {
            labels.push(match EqPreset::matching(bands) {
                Some(preset) => format!("Equalizer: {}", preset.name()),
                None => "Equalizer".to_string()
            });
        }

        let flags = [
            (self.volume.is_some(), "Volume filter"),
            (self.rotation.is_some(), "Rotation"),
            (self.karaoke.is_some(), "Karaoke"),
            (self.tremolo.is_some(), "Tremolo"),
            (self.vibrato.is_some(), "Vibrato"),
            (self.low_pass.is_some(), "Low pass")
        ];
        labels.extend(flags.into_iter().filter(|(on, _)| *on).map(|(_, l)| l.to_string()));

        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rock_is_recognised_after_apply() {
        let mut filters = Filters::default();
        filters.apply("Rock".parse().unwrap());

        assert_eq!(filters.enabled_labels(), ["Equalizer: Rock"]);
    }

    #[test]
    fn bassboost_levels_are_distinct() {
        let mut filters = Filters::default();
        filters.apply(FilterPreset::Equalizer(EqPreset::BassboostHigh));

        assert_eq!(filters.enabled_labels(), ["Equalizer: BassboostHigh"]);
    }

    #[test]
    fn unmatched_bands_report_generic_equalizer() {
        let filters = Filters {
            equalizer: Some(vec![EqBand { band: 0, gain: 0.42 }]),
            ..Default::default()
        };

        assert_eq!(filters.enabled_labels(), ["Equalizer"]);
    }

    #[test]
    fn timescale_presets_toggle_and_replace() {
        let mut filters = Filters::default();

        filters.apply(FilterPreset::Nightcore);
        assert_eq!(filters.enabled_labels(), ["Nightcore"]);

        filters.apply(FilterPreset::Vaporwave);
        assert_eq!(filters.enabled_labels(), ["Vaporwave"]);

        filters.apply(FilterPreset::Vaporwave);
        assert!(filters.is_empty());
    }

    #[test]
    fn off_clears_equalizer_too() {
        let mut filters = Filters::default();
        filters.apply(FilterPreset::Equalizer(EqPreset::Pop));
        filters.apply(FilterPreset::Nightcore);
        filters.apply(FilterPreset::Off);

        assert!(filters.is_empty());
        assert_eq!(serde_json::to_string(&filters).unwrap(), "{}");
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert_eq!("Polka".parse::<FilterPreset>(), Err("Polka".to_string()));
        assert_eq!("off".parse::<FilterPreset>(), Ok(FilterPreset::Off));
    }

    #[test]
    fn custom_composite_labels() {
        let filters = Filters {
            timescale: Some(Timescale { speed: 1.1, pitch: 1.0, rate: 1.0 }),
            rotation: Some(Rotation { rotation_hz: 0.2 }),
            low_pass: Some(LowPass { smoothing: 20.0 }),
            ..Default::default()
        };

        assert_eq!(
            filters.enabled_labels(),
            ["Custom (speed/pitch/rate)", "Rotation", "Low pass"]
        );
    }
}

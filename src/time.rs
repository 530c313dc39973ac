//! Position parsing and formatting shared by commands and panels.

use std::time::Duration;

/// Parses a position typed by a user: `90` (seconds), `1:30` or `1:00:00`.
/// A bare number of at least an hour's worth of milliseconds is taken as
/// milliseconds.
pub fn parse_position(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit() || c == ':') {
        return None;
    }

    let parts = input
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    let secs = match parts.as_slice() {
        [n] if *n >= 3_600_000 => return Some(Duration::from_millis(*n)),
        [s] => *s,
        [m, s] => m * 60 + s,
        [h, m, s] => h * 3600 + m * 60 + s,
        _ => return None
    };

    Some(Duration::from_secs(secs))
}

/// `m:ss`, or `h:mm:ss` from an hour up.
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);

    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// `Xm Ys`, minutes are not rolled into hours.
pub fn format_short(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}m {}s", total / 60, total % 60)
}

/// A text progress bar of `width` segments with a knob at `progress`.
pub fn progress_bar(progress: f64, width: usize) -> String {
    let filled = (progress.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}🔘{}", "▬".repeat(filled), "▬".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_form() {
        assert_eq!(parse_position("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_position(" 1:30 "), Some(Duration::from_secs(90)));
        assert_eq!(parse_position("1:00:00"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_position("3600000"), Some(Duration::from_millis(3_600_000)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_position(""), None);
        assert_eq!(parse_position("1m30"), None);
        assert_eq!(parse_position("-5"), None);
        assert_eq!(parse_position("1:2:3:4"), None);
        assert_eq!(parse_position("1::2"), None);
    }

    #[test]
    fn formats() {
        assert_eq!(format_clock(Duration::from_secs(65)), "1:05");
        assert_eq!(format_clock(Duration::from_secs(3725)), "1:02:05");
        assert_eq!(format_short(Duration::from_secs(3725)), "62m 5s");
        assert_eq!(progress_bar(0.5, 4), "▬▬🔘▬▬");
        assert_eq!(progress_bar(7.0, 2), "▬▬🔘");
    }
}

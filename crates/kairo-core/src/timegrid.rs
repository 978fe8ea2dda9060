//! Vertical layout of time blocks inside a day column.
//!
//! A day column spans a [`DayWindow`] (06:00-22:00 unless configured
//! otherwise). Every block is mapped to a `top`/`height` pair expressed as a
//! percentage of that window, which renderers turn into offsets.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context, anyhow};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;

static CLOCK_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(?P<hour>\d{1,2}):(?P<minute>\d{2})$"));

/// Wall-clock time of day with minute precision.
///
/// `24:00` is accepted so a window can run to the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };
    pub const END_OF_DAY: TimeOfDay = TimeOfDay {
        minutes: MINUTES_PER_DAY,
    };

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= MINUTES_PER_HOUR {
            return None;
        }
        let minutes = hour.checked_mul(MINUTES_PER_HOUR)?.checked_add(minute)?;
        if minutes > MINUTES_PER_DAY {
            return None;
        }
        Some(Self { minutes })
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let clock_re = CLOCK_RE
            .as_ref()
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        let captures = clock_re
            .captures(raw.trim())
            .ok_or_else(|| anyhow!("expected HH:MM, got: {raw}"))?;

        let hour: u32 = captures["hour"]
            .parse()
            .with_context(|| format!("invalid hour in {raw}"))?;
        let minute: u32 = captures["minute"]
            .parse()
            .with_context(|| format!("invalid minute in {raw}"))?;

        Self::from_hm(hour, minute).ok_or_else(|| anyhow!("time out of range: {raw}"))
    }

    pub fn minutes(self) -> u32 {
        self.minutes
    }

    pub fn hour(self) -> u32 {
        self.minutes / MINUTES_PER_HOUR
    }

    pub fn minute(self) -> u32 {
        self.minutes % MINUTES_PER_HOUR
    }

    /// `08:30` -> `8:30 AM`, `00:00` and `24:00` -> `12:00 AM`.
    pub fn format_12h(self) -> String {
        let hour = self.hour() % 24;
        let suffix = if hour >= 12 { "PM" } else { "AM" };
        let display_hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{display_hour}:{:02} {suffix}", self.minute())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Visible bounds of a day column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start: TimeOfDay { minutes: 6 * 60 },
            end: TimeOfDay { minutes: 22 * 60 },
        }
    }
}

impl DayWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// 06:00 through midnight, the span of the week grid.
    pub fn week_grid() -> Self {
        Self {
            start: TimeOfDay { minutes: 6 * 60 },
            end: TimeOfDay::END_OF_DAY,
        }
    }

    pub fn parse(start: &str, end: &str) -> anyhow::Result<Self> {
        let window = Self {
            start: TimeOfDay::parse(start).context("invalid window start")?,
            end: TimeOfDay::parse(end).context("invalid window end")?,
        };
        if !window.is_valid() {
            return Err(anyhow!("window start {start} must be before end {end}"));
        }
        Ok(window)
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn total_minutes(&self) -> u32 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }

    /// Whole hours labelled down the side of the grid, both bounds included.
    pub fn hour_marks(&self) -> Vec<u32> {
        let first = self.start.minutes().div_ceil(MINUTES_PER_HOUR);
        let last = self.end.minutes() / MINUTES_PER_HOUR;
        (first..=last).collect()
    }
}

/// Offset and height of a block, in percent of the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub top: f64,
    pub height: f64,
}

impl Position {
    pub const ZERO: Position = Position {
        top: 0.0,
        height: 0.0,
    };

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Maps a block's time range into `window`.
///
/// `top` is clamped at zero without growing or shrinking the height, and the
/// height is cut to the space left below the clamped `top`. Blocks that
/// start before the window therefore keep their full duration. A window that
/// is empty or inverted yields [`Position::ZERO`].
pub fn position(start: TimeOfDay, end: TimeOfDay, window: DayWindow) -> Position {
    if !window.is_valid() {
        warn!(
            window_start = %window.start,
            window_end = %window.end,
            "empty or inverted day window; block not positioned"
        );
        return Position::ZERO;
    }

    let total = f64::from(window.total_minutes());
    let window_start = f64::from(window.start.minutes());
    let block_start = f64::from(start.minutes());
    let block_end = f64::from(end.minutes());

    let raw_top = (block_start - window_start) / total * 100.0;
    let raw_height = (block_end - block_start) / total * 100.0;

    let top = raw_top.max(0.0);
    let height = raw_height.min(100.0 - top);
    Position { top, height }
}

pub fn position_default(start: TimeOfDay, end: TimeOfDay) -> Position {
    position(start, end, DayWindow::default())
}

/// Parses the four clock strings and positions the block.
pub fn position_str(
    start: &str,
    end: &str,
    window_start: &str,
    window_end: &str,
) -> anyhow::Result<Position> {
    let window = DayWindow::new(
        TimeOfDay::parse(window_start)?,
        TimeOfDay::parse(window_end)?,
    );
    Ok(position(
        TimeOfDay::parse(start)?,
        TimeOfDay::parse(end)?,
        window,
    ))
}

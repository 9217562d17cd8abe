//! Simulation window adjustment.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use glm_core::{GlmError, GlmResult, GlmTree, LeafKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// GridLAB-D wants clock times in this shape, wrapped in single quotes.
pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File name placeholder that recorders get before they know their parent.
pub const METER_RECORDER_PLACEHOLDER: &str = "meterRecorder_XXX.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimUnits {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl SimUnits {
    pub fn seconds_per_unit(self) -> i64 {
        match self {
            SimUnits::Seconds => 1,
            SimUnits::Minutes => 60,
            SimUnits::Hours => 3_600,
            SimUnits::Days => 86_400,
        }
    }

    /// Recorder interval in seconds. Day-long runs still record hourly.
    pub fn interval(self) -> i64 {
        match self {
            SimUnits::Seconds => 1,
            SimUnits::Minutes => 60,
            SimUnits::Hours | SimUnits::Days => 3_600,
        }
    }
}

impl FromStr for SimUnits {
    type Err = GlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "seconds" => Ok(SimUnits::Seconds),
            "minutes" => Ok(SimUnits::Minutes),
            "hours" => Ok(SimUnits::Hours),
            "days" => Ok(SimUnits::Days),
            other => Err(GlmError::InvalidArgument(format!(
                "unknown simulation units '{other}' (expected seconds, minutes, hours or days)"
            ))),
        }
    }
}

impl fmt::Display for SimUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimUnits::Seconds => "seconds",
            SimUnits::Minutes => "minutes",
            SimUnits::Hours => "hours",
            SimUnits::Days => "days",
        };
        f.write_str(name)
    }
}

/// What [`adjust_time`] applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockWindow {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub interval: i64,
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
pub fn parse_start(text: &str) -> GlmResult<NaiveDateTime> {
    let text = text.trim();
    if let Ok(start) = NaiveDateTime::parse_from_str(text, CLOCK_FORMAT) {
        return Ok(start);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            GlmError::InvalidArgument(format!(
                "start date '{text}' is neither YYYY-MM-DD HH:MM:SS nor YYYY-MM-DD"
            ))
        })
}

fn quoted(time: NaiveDateTime) -> String {
    format!("'{}'", time.format(CLOCK_FORMAT))
}

/// Point the clock, every recorder/collector and the `minimum_timestep`
/// setting at a run of `length` `units` starting at `start`. Only top-level
/// leaves are touched.
pub fn adjust_time(
    tree: &mut GlmTree,
    length: i64,
    units: SimUnits,
    start: &str,
) -> GlmResult<ClockWindow> {
    if length < 0 {
        return Err(GlmError::InvalidArgument(format!(
            "simulation length must not be negative, got {length}"
        )));
    }
    let start = parse_start(start)?;
    let seconds = length
        .checked_mul(units.seconds_per_unit())
        .ok_or_else(|| GlmError::InvalidArgument(format!("{length} {units} is too long")))?;
    let stop = Duration::try_seconds(seconds)
        .and_then(|span| start.checked_add_signed(span))
        .ok_or_else(|| GlmError::InvalidArgument(format!("{length} {units} is too long")))?;
    let interval = units.interval();

    for leaf in tree.leaves_mut() {
        match leaf.kind().clone() {
            LeafKind::Clock => {
                leaf.set_attr("starttime", quoted(start));
                leaf.set_attr("timestamp", quoted(start));
                leaf.set_attr("stoptime", quoted(stop));
                debug!(id = %leaf.id(), "clock adjusted");
            }
            LeafKind::Object { class } if class == "recorder" || class == "collector" => {
                leaf.set_attr("interval", interval.to_string());
                if leaf.attr("file") == Some(METER_RECORDER_PLACEHOLDER) {
                    if let Some(name) = leaf.name().map(str::to_string) {
                        leaf.set_attr("file", format!("meterRecorder_{name}.csv"));
                    }
                }
            }
            LeafKind::Directive { keyword, argument } if argument.starts_with("minimum_timestep") => {
                leaf.set_kind(LeafKind::Directive {
                    keyword,
                    argument: format!("minimum_timestep={interval}"),
                });
            }
            _ => {}
        }
    }

    info!(%start, %stop, interval, "adjusted simulation time");
    Ok(ClockWindow {
        start,
        stop,
        interval,
    })
}

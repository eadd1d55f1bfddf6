//! Applying model replies to the home.
//!
//! The model is asked to answer with lines of the form `<name> is <state>`.
//! Each line is handled on its own: lines that don't have exactly one
//! `" is "` separator, name no known device, or carry a state an on/off device
//! can't take are skipped and reported, and the remaining lines still apply.

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::engine::DeviceState;
use crate::engine::Event;
use crate::engine::Home;

/// Separator between the device name and its state. Matched literally and
/// case-sensitively.
pub const SEPARATOR: &str = " is ";

/// A state change that was applied to a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub device_id: Uuid,
    pub state: DeviceState,
    pub event: Event,
}

/// Why a reply line was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Skip {
    /// The line did not split into exactly a name and a state.
    Malformed { line: String },
    /// No device has this name.
    UnknownDevice { name: String },
    /// An on/off device was given something other than on or off.
    UnrecognizedState { name: String, state: String },
}

/// Outcome of applying one reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterpretReport {
    pub updates: Vec<Update>,
    pub skipped: Vec<Skip>,
}

/// Apply every well-formed line of `reply` to `home`, stamping new events
/// with `now`.
pub fn interpret(home: &mut Home, reply: &str, now: DateTime<Utc>) -> InterpretReport {
    let mut report = InterpretReport::default();

    for line in reply.split('\n').filter(|l| !l.is_empty()) {
        match apply_line(home, line, now) {
            Ok(update) => report.updates.push(update),
            Err(skip) => {
                warn!("Skipping reply line {:?}: {:?}", line, skip);
                report.skipped.push(skip);
            }
        }
    }

    debug!(
        "Applied {} device update(s), skipped {} line(s)",
        report.updates.len(),
        report.skipped.len()
    );
    report
}

fn apply_line(home: &mut Home, line: &str, now: DateTime<Utc>) -> Result<Update, Skip> {
    let (name, state) = split_line(line).ok_or_else(|| Skip::Malformed {
        line: line.to_string(),
    })?;

    let device = home
        .find_device_mut(name)
        .ok_or_else(|| Skip::UnknownDevice {
            name: name.to_string(),
        })?;

    let (new_state, description) = match device.state {
        DeviceState::OnOff { .. } => {
            let on = parse_on_off(state).ok_or_else(|| Skip::UnrecognizedState {
                name: name.to_string(),
                state: state.to_string(),
            })?;
            let word = if on { "On" } else { "Off" };
            (DeviceState::OnOff { on }, format!("{name} is now {word}"))
        }
        DeviceState::Sensor { .. } => (
            DeviceState::Sensor {
                value: Some(state.to_string()),
            },
            format!("{name} value is {state}"),
        ),
    };

    device.state = new_state.clone();
    let device_id = device.id;
    let event = home.push_event(description, now);

    Ok(Update {
        device_id,
        state: new_state,
        event,
    })
}

/// Split `line` into `(name, state)`; `None` unless there is exactly one
/// separator.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split(SEPARATOR);
    let name = parts.next()?;
    let state = parts.next()?;
    match parts.next() {
        Some(_) => None,
        None => Some((name, state)),
    }
}

fn parse_on_off(token: &str) -> Option<bool> {
    match token.to_lowercase().as_str() {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

//! Prompt construction.
//!
//! Turns a snapshot of the home into the natural-language text sent to the
//! chat model. Free text (names, bios, rules, address) is inserted verbatim.

use std::fmt::Write;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::engine::Home;

const PREAMBLE: &str = "Given the following devices, people, and rules in a smart home, \
with the current time of day and location, provide updates on device states and any new events:";

const DEVICE_STATES_INSTRUCTION: &str = "Provide the current state of all smart home devices \
based on the rules. Do not provide extra information, reply with one line per device in the \
form \"<device name> is <state>\". For on/off devices the state is On or Off, like \"Oven is Off\". \
For sensors the state is the predicted sensor value, like \"Thermostat is 21C\".";

/// Which question the prompt asks the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromptKind {
    /// Describe the home and ask for new events.
    Narrate,
    /// Also ask for every device's state in `"<name> is <state>"` lines.
    DeviceStates,
}

/// Build the prompt for `home` at local time `time`.
pub fn build_prompt(home: &Home, time: NaiveTime, kind: PromptKind) -> String {
    let mut prompt = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(prompt, "{PREAMBLE}\n");

    prompt.push_str("Devices:\n");
    for device in &home.devices {
        let _ = writeln!(
            prompt,
            "- {} ({}) is {}",
            device.name,
            device.kind().label(),
            device.state.describe()
        );
    }

    prompt.push_str("\nPeople:\n");
    for person in &home.people {
        let _ = writeln!(prompt, "- {}: {}", person.name, person.bio);
    }

    prompt.push_str("\nRules:\n");
    for rule in &home.rules {
        let _ = writeln!(prompt, "- {}", rule.description);
    }

    let _ = writeln!(prompt, "\nTime of Day: {}", format_time(time));
    let _ = writeln!(prompt, "Location: {}", home.address);

    if kind == PromptKind::DeviceStates {
        prompt.push_str(DEVICE_STATES_INSTRUCTION);
        prompt.push('\n');
    }

    prompt
}

/// Short 12-hour clock time, e.g. `3:04 PM`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

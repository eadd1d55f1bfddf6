//! Commands accepted by the engine's command loop.
//!
//! Every change to the home goes through one of these. Commands that have a
//! result carry a `oneshot` sender for it; the loop ignores receivers that
//! were dropped.

use tokio::sync::oneshot;
use uuid::Uuid;

use super::event::Event;
use super::state::Device;
use super::state::DeviceState;
use super::state::Person;
use super::state::Rule;
use crate::interpret::InterpretReport;

#[derive(Debug)]
pub enum Command {
    AddDevice {
        name: String,
        state: DeviceState,
        reply: oneshot::Sender<Device>,
    },
    RemoveDevice {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    AddPerson {
        name: String,
        bio: String,
        reply: oneshot::Sender<Person>,
    },
    RemovePerson {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    AddRule {
        description: String,
        reply: oneshot::Sender<Rule>,
    },
    RemoveRule {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    SetAddress {
        address: String,
        reply: oneshot::Sender<()>,
    },
    RemoveEvent {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },

    /// Log a narration reply as a new event
    RecordEvent {
        description: String,
        reply: oneshot::Sender<Event>,
    },

    /// Apply a device-state reply through the interpreter
    ApplyReply {
        text: String,
        reply: oneshot::Sender<InterpretReport>,
    },
}

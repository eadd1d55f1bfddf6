#[allow(clippy::module_inception)]
mod engine;
mod event;
mod message;
pub mod state;

pub use engine::Engine;
pub use engine::EngineError;
pub use event::Event;
pub use message::Command;
pub use state::Device;
pub use state::DeviceKind;
pub use state::DeviceState;
pub use state::Home;
pub use state::Person;
pub use state::Rule;

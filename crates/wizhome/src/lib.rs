pub mod api;
pub mod chat;
pub mod config;
pub mod engine;
pub mod interpret;
pub mod prompt;

pub use chat::ChatClient;
pub use chat::ChatError;
pub use chat::OpenAiClient;
pub use config::Config;
pub use config::LogLevel;
pub use engine::Device;
pub use engine::DeviceKind;
pub use engine::DeviceState;
pub use engine::Engine;
pub use engine::Event;
pub use engine::Home;
pub use interpret::interpret;
pub use interpret::InterpretReport;
pub use prompt::build_prompt;
pub use prompt::PromptKind;

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Local;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::debug;
use tracing::info;

use super::event::Event;
use super::message::Command;
use super::state::Device;
use super::state::DeviceState;
use super::state::Home;
use super::state::Person;
use super::state::Rule;
use crate::chat::reply_text;
use crate::chat::ChatClient;
use crate::interpret::interpret;
use crate::interpret::InterpretReport;
use crate::prompt::build_prompt;
use crate::prompt::PromptKind;

pub type CommandSender = mpsc::Sender<Command>;
pub type CommandReceiver = mpsc::Receiver<Command>;

/// Capacity for the command channel
/// Provides backpressure when callers send faster than the loop applies
const COMMAND_CHANNEL_SIZE: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine command loop is not running")]
    Closed,

    #[error("chat request task failed: {0}")]
    Task(#[from] JoinError),
}

/// wizhome engine
///
/// Sole owner of the home context. Every mutation is a [`Command`] applied by
/// [`Engine::run`], one at a time; everything else reads snapshots.
pub struct Engine {
    /// Centralized home snapshot (readers load the Arc, the command loop stores a new one)
    state: ArcSwap<Home>,

    /// Commands waiting to be applied
    command_rx: Mutex<CommandReceiver>,

    /// Kept so handles and request tasks can enqueue commands
    command_tx: CommandSender,

    /// Model used for narration and state prediction
    chat: Arc<dyn ChatClient>,
}

impl Engine {
    /// Create a new Engine owning `home`
    pub fn new(home: Home, chat: Arc<dyn ChatClient>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        Self {
            state: ArcSwap::new(Arc::new(home)),
            command_rx: Mutex::new(command_rx),
            command_tx,
            chat,
        }
    }

    /// Run the engine's command loop
    ///
    /// This is the only place the home is modified.
    pub async fn run(&self) {
        info!("Engine starting");

        let mut rx = self.command_rx.lock().await;
        while let Some(cmd) = rx.recv().await {
            debug!("Applying command: {:?}", cmd);
            self.handle_command(cmd);
        }

        info!("Engine shutting down");
    }

    /// Get a snapshot of the current home.
    ///
    /// Clones the `Arc` (atomic refcount bump), essentially free.
    pub fn state_snapshot(&self) -> Arc<Home> {
        self.state.load_full()
    }

    /// Build a prompt from the current snapshot at the local wall-clock time.
    pub fn prompt(&self, kind: PromptKind) -> String {
        build_prompt(&self.state_snapshot(), Local::now().time(), kind)
    }

    pub async fn add_device(
        &self,
        name: String,
        state: DeviceState,
    ) -> Result<Device, EngineError> {
        request(&self.command_tx, |reply| Command::AddDevice { name, state, reply }).await
    }

    pub async fn remove_device(&self, id: uuid::Uuid) -> Result<bool, EngineError> {
        request(&self.command_tx, |reply| Command::RemoveDevice { id, reply }).await
    }

    pub async fn add_person(&self, name: String, bio: String) -> Result<Person, EngineError> {
        request(&self.command_tx, |reply| Command::AddPerson { name, bio, reply }).await
    }

    pub async fn remove_person(&self, id: uuid::Uuid) -> Result<bool, EngineError> {
        request(&self.command_tx, |reply| Command::RemovePerson { id, reply }).await
    }

    pub async fn add_rule(&self, description: String) -> Result<Rule, EngineError> {
        request(&self.command_tx, |reply| Command::AddRule { description, reply }).await
    }

    pub async fn remove_rule(&self, id: uuid::Uuid) -> Result<bool, EngineError> {
        request(&self.command_tx, |reply| Command::RemoveRule { id, reply }).await
    }

    pub async fn set_address(&self, address: String) -> Result<(), EngineError> {
        request(&self.command_tx, |reply| Command::SetAddress { address, reply }).await
    }

    pub async fn remove_event(&self, id: uuid::Uuid) -> Result<bool, EngineError> {
        request(&self.command_tx, |reply| Command::RemoveEvent { id, reply }).await
    }

    /// Ask the model to narrate the home and log its reply as an event.
    ///
    /// The chat call runs in its own task, so it still completes and logs
    /// its event if the caller stops waiting.
    pub async fn narrate(&self) -> Result<Event, EngineError> {
        let prompt = self.prompt(PromptKind::Narrate);
        let chat = self.chat.clone();
        let tx = self.command_tx.clone();

        let task = tokio::spawn(async move {
            let description = reply_text(chat.complete(&prompt).await);
            request(&tx, |reply| Command::RecordEvent { description, reply }).await
        });

        task.await?
    }

    /// Ask the model for every device's state and apply its reply.
    ///
    /// Overlapping calls are not coordinated: each reply is applied when it
    /// arrives, so the last one applied wins.
    pub async fn predict_states(&self) -> Result<InterpretReport, EngineError> {
        let prompt = self.prompt(PromptKind::DeviceStates);
        let chat = self.chat.clone();
        let tx = self.command_tx.clone();

        let task = tokio::spawn(async move {
            let text = reply_text(chat.complete(&prompt).await);
            request(&tx, |reply| Command::ApplyReply { text, reply }).await
        });

        task.await?
    }

    /// Apply a command to a copy of the home and publish the result
    fn handle_command(&self, cmd: Command) {
        let mut home = Home::clone(&self.state.load());

        match cmd {
            Command::AddDevice { name, state, reply } => {
                let device = Device::new(name, state);
                info!("Device added: {} ({})", device.name, device.kind());
                home.devices.push(device.clone());
                let _ = reply.send(device);
            }
            Command::RemoveDevice { id, reply } => {
                let removed = home.remove_device(id);
                info!("Device removed: {} (found: {})", id, removed);
                let _ = reply.send(removed);
            }
            Command::AddPerson { name, bio, reply } => {
                let person = Person::new(name, bio);
                info!("Person added: {}", person.name);
                home.people.push(person.clone());
                let _ = reply.send(person);
            }
            Command::RemovePerson { id, reply } => {
                let removed = home.remove_person(id);
                info!("Person removed: {} (found: {})", id, removed);
                let _ = reply.send(removed);
            }
            Command::AddRule { description, reply } => {
                let rule = Rule::new(description);
                info!("Rule added: {}", rule.description);
                home.rules.push(rule.clone());
                let _ = reply.send(rule);
            }
            Command::RemoveRule { id, reply } => {
                let removed = home.remove_rule(id);
                info!("Rule removed: {} (found: {})", id, removed);
                let _ = reply.send(removed);
            }
            Command::SetAddress { address, reply } => {
                info!("Address set: {}", address);
                home.address = address;
                let _ = reply.send(());
            }
            Command::RemoveEvent { id, reply } => {
                let removed = home.remove_event(id);
                info!("Event removed: {} (found: {})", id, removed);
                let _ = reply.send(removed);
            }
            Command::RecordEvent { description, reply } => {
                let event = home.push_event(description, Utc::now());
                info!("Event recorded: {}", event.description);
                let _ = reply.send(event);
            }
            Command::ApplyReply { text, reply } => {
                let report = interpret(&mut home, &text, Utc::now());
                info!(
                    "Device states applied: {} updated, {} skipped",
                    report.updates.len(),
                    report.skipped.len()
                );
                let _ = reply.send(report);
            }
        }

        self.state.store(Arc::new(home));
    }
}

/// Send a command built around a fresh reply channel and wait for its result.
async fn request<T>(
    tx: &CommandSender,
    make: impl FnOnce(oneshot::Sender<T>) -> Command,
) -> Result<T, EngineError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(make(reply_tx))
        .await
        .map_err(|_| EngineError::Closed)?;
    reply_rx.await.map_err(|_| EngineError::Closed)
}

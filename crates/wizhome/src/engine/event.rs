use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// One entry in the home's event log.
///
/// Events are appended by narration and by applied state predictions, and
/// are only ever removed by an explicit user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(description: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            timestamp,
        }
    }
}

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::event::Event;

/// What kind of device this is, which decides how its state is described
/// and how model replies are applied to it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    OnOff,
    Sensor,
}

impl DeviceKind {
    /// Human-readable label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            DeviceKind::OnOff => "On/Off Device",
            DeviceKind::Sensor => "Sensor",
        }
    }
}

/// Current state of a device.
///
/// Tagged by kind so an on/off device always has `on` and never a `value`,
/// and a sensor the other way round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceState {
    OnOff { on: bool },
    Sensor { value: Option<String> },
}

impl DeviceState {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceState::OnOff { .. } => DeviceKind::OnOff,
            DeviceState::Sensor { .. } => DeviceKind::Sensor,
        }
    }

    /// State as it reads in a prompt: "on"/"off", or the sensor value.
    pub fn describe(&self) -> &str {
        match self {
            DeviceState::OnOff { on: true } => "on",
            DeviceState::OnOff { on: false } => "off",
            DeviceState::Sensor { value: Some(v) } => v,
            DeviceState::Sensor { value: None } => "unknown value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub state: DeviceState,
}

impl Device {
    pub fn new(name: impl Into<String>, state: DeviceState) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.state.kind()
    }

    /// Names are the natural key model replies refer to devices by.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
}

impl Person {
    pub fn new(name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bio: bio.into(),
        }
    }
}

/// A house rule. Never enforced; only handed to the model as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub description: String,
}

impl Rule {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
        }
    }
}

/// The whole home context owned by the engine.
///
/// Readers get an `Arc<Home>` snapshot; only the engine's command loop
/// produces new versions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Home {
    pub devices: Vec<Device>,
    pub people: Vec<Person>,
    pub rules: Vec<Rule>,
    pub address: String,
    pub events: Vec<Event>,
}

impl Home {
    /// First device whose name equals `name`, ignoring case.
    pub fn find_device_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.matches_name(name))
    }

    /// Append an event to the log and return a copy of it.
    pub fn push_event(&mut self, description: impl Into<String>, at: DateTime<Utc>) -> Event {
        let event = Event::new(description, at);
        self.events.push(event.clone());
        event
    }

    pub fn remove_device(&mut self, id: Uuid) -> bool {
        remove_by(&mut self.devices, |d| d.id == id)
    }

    pub fn remove_person(&mut self, id: Uuid) -> bool {
        remove_by(&mut self.people, |p| p.id == id)
    }

    pub fn remove_rule(&mut self, id: Uuid) -> bool {
        remove_by(&mut self.rules, |r| r.id == id)
    }

    pub fn remove_event(&mut self, id: Uuid) -> bool {
        remove_by(&mut self.events, |e| e.id == id)
    }
}

fn remove_by<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !pred(item));
    items.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_serializes_flat() {
        let device = Device::new("Oven", DeviceState::OnOff { on: true });
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["name"], "Oven");
        assert_eq!(json["kind"], "on_off");
        assert_eq!(json["on"], true);
        assert!(json.get("value").is_none());

        let sensor = Device::new("Thermostat", DeviceState::Sensor { value: None });
        let json = serde_json::to_value(&sensor).unwrap();
        assert_eq!(json["kind"], "sensor");
        assert!(json["value"].is_null());
    }

    #[test]
    fn test_describe_state() {
        assert_eq!(DeviceState::OnOff { on: true }.describe(), "on");
        assert_eq!(DeviceState::OnOff { on: false }.describe(), "off");
        assert_eq!(
            DeviceState::Sensor {
                value: Some("21C".to_string())
            }
            .describe(),
            "21C"
        );
        assert_eq!(DeviceState::Sensor { value: None }.describe(), "unknown value");
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(DeviceKind::OnOff.to_string(), "on_off");
        assert_eq!("sensor".parse::<DeviceKind>().unwrap(), DeviceKind::Sensor);
        assert!("dimmer".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_find_device_ignores_case() {
        let mut home = Home {
            devices: vec![
                Device::new("Oven", DeviceState::OnOff { on: false }),
                Device::new("oven", DeviceState::OnOff { on: true }),
            ],
            ..Default::default()
        };
        let first_id = home.devices[0].id;
        assert_eq!(home.find_device_mut("OVEN").unwrap().id, first_id);
        assert!(home.find_device_mut("Ove").is_none());
    }

    #[test]
    fn test_remove_by_id() {
        let mut home = Home::default();
        let rule = Rule::new("Lights off at night");
        let id = rule.id;
        home.rules.push(rule);

        assert!(!home.remove_rule(Uuid::new_v4()));
        assert!(home.remove_rule(id));
        assert!(home.rules.is_empty());
    }
}

//! Events exchanged with the host page.
//!
//! Outbound events announce wallet connection and completed operations;
//! inbound commands open, close or toggle the widget.

use anchor_lang::prelude::Pubkey;
use log::debug;
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::broadcast;

fn pubkey_as_str<S: Serializer>(key: &Pubkey, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WidgetEvent {
    Connected {
        #[serde(serialize_with = "pubkey_as_str")]
        address: Pubkey,
    },
    Lock {
        #[serde(serialize_with = "pubkey_as_str")]
        address: Pubkey,
        amount: u64,
    },
    Unlock {
        #[serde(serialize_with = "pubkey_as_str")]
        address: Pubkey,
        amount: u64,
    },
    Claim {
        #[serde(serialize_with = "pubkey_as_str")]
        address: Pubkey,
        amount: u64,
    },
}

impl WidgetEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WidgetEvent::Connected { .. } => "connected",
            WidgetEvent::Lock { .. } => "lock",
            WidgetEvent::Unlock { .. } => "unlock",
            WidgetEvent::Claim { .. } => "claim",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: WidgetEvent);
}

/// Fan-out of widget events to any number of host listeners.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WidgetEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: WidgetEvent) {
        let name = event.name();
        // no listener is not an error
        if self.sender.send(event).is_err() {
            debug!("{} event dropped, no listeners", name);
        }
    }
}

/// Commands the host page sends to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostCommand {
    Open,
    Close,
    Toggle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidgetVisibility {
    open: bool,
}

impl WidgetVisibility {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Apply a host command; returns whether visibility changed.
    pub fn apply(&mut self, command: HostCommand) -> bool {
        let next = match command {
            HostCommand::Open => true,
            HostCommand::Close => false,
            HostCommand::Toggle => !self.open,
        };
        let changed = next != self.open;
        self.open = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_lowercase_type() {
        let address = Pubkey::new_unique();
        let json = serde_json::to_value(WidgetEvent::Lock { address, amount: 25 }).unwrap();
        assert_eq!(json["type"], "lock");
        assert_eq!(json["address"], address.to_string());
        assert_eq!(json["amount"], 25);

        let json = serde_json::to_value(WidgetEvent::Connected { address }).unwrap();
        assert_eq!(json["type"], "connected");
    }

    #[tokio::test]
    async fn bus_delivers_to_every_listener() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        let event = WidgetEvent::Claim {
            address: Pubkey::new_unique(),
            amount: 3,
        };
        bus.emit(event.clone());
        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[test]
    fn emitting_without_listeners_is_fine() {
        EventBus::new(1).emit(WidgetEvent::Connected {
            address: Pubkey::new_unique(),
        });
    }

    #[test]
    fn host_commands_drive_visibility() {
        let mut visibility = WidgetVisibility::default();
        let toggle: HostCommand = serde_json::from_str("\"toggle\"").unwrap();
        assert!(visibility.apply(toggle));
        assert!(visibility.is_open());
        assert!(!visibility.apply(HostCommand::Open));
        assert!(visibility.apply(HostCommand::Close));
        assert!(!visibility.is_open());
    }
}

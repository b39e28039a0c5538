use tokio::sync::broadcast;

use crate::domain::{record::StoredRecord, snapshot::StatusSnapshot};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum Event {
    StatusUpdate(StatusSnapshot),
    NewData(StoredRecord),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::StatusUpdate(_) => "status_update",
            Event::NewData(_) => "new_data",
        }
    }

    /// The event as one Server-Sent-Events frame.
    pub fn to_sse_frame(&self) -> Option<String> {
        let payload = match self {
            Event::StatusUpdate(snapshot) => serde_json::to_string(snapshot),
            Event::NewData(record) => serde_json::to_string(record),
        };

        match payload {
            Ok(data) => Some(format!("event: {}\ndata: {}\n\n", self.name(), data)),
            Err(e) => {
                log::error!("Error serializing {} event: {:?}", self.name(), e);
                None
            }
        }
    }
}

/// Where progress and result events go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

pub struct Broadcaster {
    sender: broadcast::Sender<Event>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Broadcaster { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn observers(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Broadcaster {
    fn emit(&self, event: Event) {
        // Errors only when nobody is listening
        _ = self.sender.send(event);
    }
}

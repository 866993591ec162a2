//! Event channel between external sources and the engine.
//!
//! All notifications (item field changes, timeline property changes, settings
//! edits, scene-switch pushes) are marshaled through one channel and drained
//! by the engine on its own thread. Producers may live on any thread; the
//! engine is the single consumer and the single owner of mutable state.

use crossbeam_channel::{Receiver, Sender, unbounded};
use uuid::Uuid;

use crate::host::{ItemField, TimelineProp};
use crate::settings::SettingsField;

/// Events delivered to the engine's update loop.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A field on one timeline item changed
    ItemChanged { item_id: Uuid, field: ItemField },

    /// A timeline-level property changed (item set, playhead, scene metadata)
    TimelineChanged {
        timeline_id: Uuid,
        prop: TimelineProp,
    },

    /// Push notification that the active scene may have been replaced.
    /// The engine re-runs its identity check; polling covers missed pushes.
    SceneReplaced,

    /// Persisted settings changed (engine-initiated or out-of-band)
    SettingsChanged { fields: Vec<SettingsField> },
}

/// Event sender handed to items, timelines and the settings port.
///
/// Sources hold this sender to notify the engine when their state changes.
#[derive(Clone, Debug)]
pub struct HostEventSender {
    sender: Option<Sender<HostEvent>>,
}

impl HostEventSender {
    /// Create event sender (connected to channel)
    pub fn new(sender: Sender<HostEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Create dummy sender (for tests or when events not needed)
    pub fn dummy() -> Self {
        Self { sender: None }
    }

    /// Emit event (silent if no receiver)
    pub fn emit(&self, event: HostEvent) {
        if let Some(ref tx) = self.sender {
            let _ = tx.send(event); // Ignore send errors (receiver might be dropped)
        }
    }
}

impl Default for HostEventSender {
    fn default() -> Self {
        Self::dummy()
    }
}

/// Create a connected sender/receiver pair for the engine.
pub fn channel() -> (HostEventSender, Receiver<HostEvent>) {
    let (tx, rx) = unbounded();
    (HostEventSender::new(tx), rx)
}

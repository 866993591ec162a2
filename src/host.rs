//! Host-side object model: timeline items, the timeline, and the access
//! trait the engine works against.
//!
//! Items and the timeline are shared handles over locked state, with a
//! per-object subscriber registry. Setters notify every subscribed sender,
//! so the engine observes changes the same way whether they come from the
//! simulator, tests, or a real host binding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::core::{HostEvent, HostEventSender};
use crate::filter::ItemSnapshot;
use crate::version::AppVersion;

/// Which item field changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Label,
    Frame,
    Length,
    Layer,
    Group,
    IsLocked,
    IsHidden,
    Category,
    Color,
}

/// Which timeline-level property changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineProp {
    /// Item set changed (add, remove, reorder)
    Items,
    /// Playhead moved
    CurrentFrame,
    Length,
    Name,
    MaxLayer,
}

/// Handle for removing a subscription later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

fn next_subscription_id() -> SubscriptionId {
    SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug)]
struct ItemState {
    label: String,
    frame: i64,
    length: i64,
    layer: i32,
    group: i32,
    is_locked: bool,
    is_hidden: bool,
    raw_category: String,
    /// Display color as "#RRGGBB"
    color: String,
    subscribers: HashMap<SubscriptionId, HostEventSender>,
}

/// One timeline item. Cheap to clone; all clones share state.
#[derive(Debug, Clone)]
pub struct SourceItem {
    id: Uuid,
    state: Arc<Mutex<ItemState>>,
}

impl SourceItem {
    pub fn new(label: &str, frame: i64, length: i64, layer: i32, raw_category: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(Mutex::new(ItemState {
                label: label.to_string(),
                frame,
                length,
                layer,
                group: 0,
                is_locked: false,
                is_hidden: false,
                raw_category: raw_category.to_string(),
                color: "#808080".to_string(),
                subscribers: HashMap::new(),
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ItemState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn label(&self) -> String {
        self.lock().label.clone()
    }

    pub fn frame(&self) -> i64 {
        self.lock().frame
    }

    pub fn length(&self) -> i64 {
        self.lock().length
    }

    pub fn layer(&self) -> i32 {
        self.lock().layer
    }

    pub fn group(&self) -> i32 {
        self.lock().group
    }

    pub fn is_locked(&self) -> bool {
        self.lock().is_locked
    }

    pub fn is_hidden(&self) -> bool {
        self.lock().is_hidden
    }

    pub fn raw_category(&self) -> String {
        self.lock().raw_category.clone()
    }

    pub fn color(&self) -> String {
        self.lock().color.clone()
    }

    /// Plain-data view for the filter pipeline.
    pub fn snapshot(&self) -> ItemSnapshot {
        let state = self.lock();
        ItemSnapshot {
            label: state.label.clone(),
            frame: state.frame,
            length: state.length,
            raw_category: state.raw_category.clone(),
        }
    }

    pub fn subscribe(&self, sender: HostEventSender) -> SubscriptionId {
        let id = next_subscription_id();
        self.lock().subscribers.insert(id, sender);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn notify(&self, field: ItemField) {
        let subscribers: Vec<HostEventSender> = self.lock().subscribers.values().cloned().collect();
        for sender in subscribers {
            sender.emit(HostEvent::ItemChanged {
                item_id: self.id,
                field,
            });
        }
    }

    pub fn set_label(&self, label: &str) {
        {
            let mut state = self.lock();
            if state.label == label {
                return;
            }
            state.label = label.to_string();
        }
        self.notify(ItemField::Label);
    }

    pub fn set_frame(&self, frame: i64) {
        {
            let mut state = self.lock();
            if state.frame == frame {
                return;
            }
            state.frame = frame;
        }
        self.notify(ItemField::Frame);
    }

    pub fn set_length(&self, length: i64) {
        {
            let mut state = self.lock();
            if state.length == length {
                return;
            }
            state.length = length;
        }
        self.notify(ItemField::Length);
    }

    pub fn set_layer(&self, layer: i32) {
        {
            let mut state = self.lock();
            if state.layer == layer {
                return;
            }
            state.layer = layer;
        }
        self.notify(ItemField::Layer);
    }

    pub fn set_group(&self, group: i32) {
        {
            let mut state = self.lock();
            if state.group == group {
                return;
            }
            state.group = group;
        }
        self.notify(ItemField::Group);
    }

    pub fn set_locked(&self, locked: bool) {
        {
            let mut state = self.lock();
            if state.is_locked == locked {
                return;
            }
            state.is_locked = locked;
        }
        self.notify(ItemField::IsLocked);
    }

    pub fn set_hidden(&self, hidden: bool) {
        {
            let mut state = self.lock();
            if state.is_hidden == hidden {
                return;
            }
            state.is_hidden = hidden;
        }
        self.notify(ItemField::IsHidden);
    }

    pub fn set_color(&self, color: &str) {
        {
            let mut state = self.lock();
            if state.color == color {
                return;
            }
            state.color = color.to_string();
        }
        self.notify(ItemField::Color);
    }
}

#[derive(Debug)]
struct TimelineState {
    name: String,
    fps: f64,
    /// Audio sampling rate
    hz: u32,
    width: u32,
    height: u32,
    length: i64,
    current_frame: i64,
    max_layer: i32,
    items: Vec<SourceItem>,
    subscribers: HashMap<SubscriptionId, HostEventSender>,
}

/// The active scene's timeline. Cheap to clone; identity is the `id`.
#[derive(Debug, Clone)]
pub struct Timeline {
    id: Uuid,
    state: Arc<Mutex<TimelineState>>,
}

impl Timeline {
    pub fn new(name: &str, fps: f64, hz: u32, width: u32, height: u32, length: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(Mutex::new(TimelineState {
                name: name.to_string(),
                fps,
                hz,
                width,
                height,
                length,
                current_frame: 0,
                max_layer: 0,
                items: Vec::new(),
                subscribers: HashMap::new(),
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimelineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn fps(&self) -> f64 {
        self.lock().fps
    }

    pub fn hz(&self) -> u32 {
        self.lock().hz
    }

    pub fn width(&self) -> u32 {
        self.lock().width
    }

    pub fn height(&self) -> u32 {
        self.lock().height
    }

    pub fn length(&self) -> i64 {
        self.lock().length
    }

    pub fn current_frame(&self) -> i64 {
        self.lock().current_frame
    }

    pub fn max_layer(&self) -> i32 {
        self.lock().max_layer
    }

    /// Snapshot of the current item handles.
    pub fn items(&self) -> Vec<SourceItem> {
        self.lock().items.clone()
    }

    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn subscribe(&self, sender: HostEventSender) -> SubscriptionId {
        let id = next_subscription_id();
        self.lock().subscribers.insert(id, sender);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.remove(&id);
    }

    fn notify(&self, prop: TimelineProp) {
        let subscribers: Vec<HostEventSender> = self.lock().subscribers.values().cloned().collect();
        for sender in subscribers {
            sender.emit(HostEvent::TimelineChanged {
                timeline_id: self.id,
                prop,
            });
        }
    }

    pub fn set_name(&self, name: &str) {
        {
            let mut state = self.lock();
            if state.name == name {
                return;
            }
            state.name = name.to_string();
        }
        self.notify(TimelineProp::Name);
    }

    pub fn set_current_frame(&self, frame: i64) {
        {
            let mut state = self.lock();
            if state.current_frame == frame {
                return;
            }
            state.current_frame = frame;
        }
        self.notify(TimelineProp::CurrentFrame);
    }

    pub fn set_length(&self, length: i64) {
        {
            let mut state = self.lock();
            if state.length == length {
                return;
            }
            state.length = length;
        }
        self.notify(TimelineProp::Length);
    }

    pub fn set_max_layer(&self, max_layer: i32) {
        {
            let mut state = self.lock();
            if state.max_layer == max_layer {
                return;
            }
            state.max_layer = max_layer;
        }
        self.notify(TimelineProp::MaxLayer);
    }

    pub fn add_item(&self, item: SourceItem) {
        self.lock().items.push(item);
        self.notify(TimelineProp::Items);
    }

    pub fn remove_item(&self, id: Uuid) -> bool {
        let removed = {
            let mut state = self.lock();
            let before = state.items.len();
            state.items.retain(|it| it.id() != id);
            state.items.len() != before
        };
        if removed {
            self.notify(TimelineProp::Items);
        }
        removed
    }
}

/// The engine's window into the hosting application.
///
/// The active timeline can disappear or be silently replaced at any time
/// (project closed, scene switched), so access goes through `try_get` and
/// the engine compares identities on every poll.
pub trait TimelineHost {
    /// The currently active timeline, if any.
    fn try_get_timeline(&self) -> Option<Timeline>;

    /// Whether the host UI has finished starting up. The engine delays
    /// activation until this reports true.
    fn is_ui_ready(&self) -> bool;

    /// Host application version, for the compatibility gate.
    fn app_version(&self) -> AppVersion;
}

//! Cross-cutting engine utilities: event channel, debouncer, identity watch.

pub mod debounce;
pub mod events;
pub mod watch;

pub use debounce::FilterDebouncer;
pub use events::{HostEvent, HostEventSender};
pub use watch::{IdentityWatch, WatchEvent};

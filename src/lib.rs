//! OBJECTLIST - Filtered, grouped view over a video timeline's object list
//!
//! Re-exports all modules for use by binary targets.

// Cross-cutting utilities (event channel, debouncer, identity watch)
pub mod core;

// Engine modules
pub mod category;
pub mod cli;
pub mod engine;
pub mod filter;
pub mod grouping;
pub mod host;
pub mod modesync;
pub mod paths;
pub mod projection;
pub mod settings;
pub mod sim;
pub mod version;

// Re-export commonly used types
pub use category::{CategoryFilterSet, ItemCategory};
pub use engine::{Engine, EngineState, SceneInfo};
pub use filter::{FilterCriteria, FilterMode, FrameRange, RangeSubMode};
pub use grouping::{GroupKey, GroupingMode};
pub use host::{SourceItem, Timeline, TimelineHost};
pub use projection::{LengthViewMode, ObjectRow};
pub use settings::{AppSettings, FileSettings, SettingsPort};
pub use version::{AppVersion, VersionGate};

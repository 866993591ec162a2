//! Simulated host: an in-process stand-in for the real editing application.
//!
//! Drives the engine exactly like a live host would: it owns the active
//! timeline, can swap scenes underneath the engine, and reports a version
//! and UI readiness. The demo binary runs the engine against this.

use std::sync::{Arc, Mutex};

use crate::host::{SourceItem, Timeline, TimelineHost};
use crate::version::AppVersion;

#[derive(Debug)]
struct SimState {
    timeline: Option<Timeline>,
    ui_ready: bool,
}

/// Clonable handle to the simulated host.
#[derive(Debug, Clone)]
pub struct SimHost {
    state: Arc<Mutex<SimState>>,
    version: AppVersion,
}

impl SimHost {
    pub fn new(version: AppVersion) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                timeline: None,
                ui_ready: true,
            })),
            version,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_ui_ready(&self, ready: bool) {
        self.lock().ui_ready = ready;
    }

    /// Install a new active timeline, as a scene switch would.
    pub fn switch_scene(&self, timeline: Timeline) {
        self.lock().timeline = Some(timeline);
    }

    /// Close the project: no active timeline.
    pub fn close_project(&self) {
        self.lock().timeline = None;
    }
}

impl TimelineHost for SimHost {
    fn try_get_timeline(&self) -> Option<Timeline> {
        self.lock().timeline.clone()
    }

    fn is_ui_ready(&self) -> bool {
        self.lock().ui_ready
    }

    fn app_version(&self) -> AppVersion {
        self.version
    }
}

/// A representative scene with a spread of categories, layers and timings.
pub fn demo_scene() -> Timeline {
    let tl = Timeline::new("Main scene", 30.0, 44100, 1920, 1080, 900);
    let items = [
        SourceItem::new("Opening title", 0, 90, 0, "TextItem"),
        SourceItem::new("Background video", 0, 900, 1, "VideoItem"),
        SourceItem::new("Background music", 0, 900, 2, "AudioItem"),
        SourceItem::new("Narration 1", 30, 120, 3, "VoiceItem"),
        SourceItem::new("Narration 2", 180, 150, 3, "VoiceItem"),
        SourceItem::new("Character", 30, 840, 4, "TachieItem"),
        SourceItem::new("Character face", 30, 840, 5, "TachieFaceItem"),
        SourceItem::new("Lower third", 60, 120, 6, "ShapeItem"),
        SourceItem::new("Logo", 750, 150, 7, "ImageItem"),
        SourceItem::new("Blur pass", 400, 100, 8, "EffectItem"),
        SourceItem::new("Crossfade", 440, 30, 9, "TransitionItem"),
        SourceItem::new("Insert scene", 500, 200, 10, "SceneItem"),
    ];
    items[3].set_color("#4caf50");
    items[4].set_color("#4caf50");
    items[11].set_color("#2196f3");
    let max_layer = items.iter().map(SourceItem::layer).max().unwrap_or(0);
    for item in items {
        tl.add_item(item);
    }
    tl.set_max_layer(max_layer);
    tl
}

/// A second, smaller scene for exercising scene switches.
pub fn alternate_scene() -> Timeline {
    let tl = Timeline::new("Outro scene", 30.0, 44100, 1920, 1080, 300);
    for item in [
        SourceItem::new("Credits", 0, 300, 0, "TextItem"),
        SourceItem::new("Outro music", 0, 300, 1, "AudioItem"),
        SourceItem::new("End card", 200, 100, 2, "ImageItem"),
    ] {
        tl.add_item(item);
    }
    tl.set_max_layer(2);
    tl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_host_scene_lifecycle() {
        let host = SimHost::new(AppVersion::new(4, 42, 0));
        assert!(host.try_get_timeline().is_none());

        let scene = demo_scene();
        host.switch_scene(scene.clone());
        assert_eq!(host.try_get_timeline().unwrap().id(), scene.id());

        host.close_project();
        assert!(host.try_get_timeline().is_none());
    }

    #[test]
    fn test_demo_scene_shape() {
        let tl = demo_scene();
        assert_eq!(tl.item_count(), 12);
        assert_eq!(tl.max_layer(), 10);
        assert!(tl.fps() > 0.0);
    }
}

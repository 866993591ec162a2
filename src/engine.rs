//! The synchronization engine: one single-threaded owner of all list state.
//!
//! All inputs arrive either as direct method calls (user commands) or as
//! [`HostEvent`]s drained from one channel inside [`Engine::update`]. The
//! engine never blocks: timeline monitoring is a periodic poll, filter
//! recomputation is debounced, and activation waits for the host UI without
//! spinning.
//!
//! Lifecycle: `new()` loads settings and evaluates the version gate;
//! `update()` is then called from the owner's loop. The engine activates
//! itself on the first tick where the host UI reports ready (and the gate
//! allows it), attaches to the current timeline, and from then on keeps the
//! visible row set in sync with filters, grouping and timeline churn.

use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::category::{CategoryFilterSet, ItemCategory};
use crate::core::{self, FilterDebouncer, HostEvent, HostEventSender, IdentityWatch, WatchEvent};
use crate::filter::{FilterCriteria, FilterMode, FrameRange, ItemSnapshot, RangeSubMode};
use crate::grouping::{self, GroupKey, GroupingMode};
use crate::host::{ItemField, SubscriptionId, Timeline, TimelineHost, TimelineProp};
use crate::modesync::{OffToggle, RadioSync, SyncOutcome};
use crate::projection::{LengthViewMode, ObjectRow, ProjectionArena};
use crate::settings::{AppSettings, SettingsField, SettingsPort, diff_settings};
use crate::version::{GateDecision, VersionGate};

/// How often the engine re-checks the active timeline's identity.
const MONITOR_INTERVAL: Duration = Duration::from_millis(500);

/// How many monitor intervals to wait for the host UI before giving up.
const UI_READY_ATTEMPTS: u32 = 60;

/// Scene metadata mirrored for the footer display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneInfo {
    pub name: String,
    pub fps: f64,
    /// Audio sampling rate in Hz.
    pub hz: u32,
    pub width: u32,
    pub height: u32,
    /// Scene length in frames, floored so an empty scene still renders a
    /// usable ruler.
    pub length: i64,
    pub max_layer: i32,
}

impl SceneInfo {
    const MIN_LENGTH: i64 = 100;

    fn from_timeline(tl: &Timeline) -> Self {
        Self {
            name: tl.name(),
            fps: tl.fps(),
            hz: tl.hz(),
            width: tl.width(),
            height: tl.height(),
            length: tl.length().max(Self::MIN_LENGTH),
            max_layer: tl.max_layer(),
        }
    }
}

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the host UI to come up.
    WaitingForUi,
    /// Version gate refused and no confirmation yet.
    Blocked,
    /// Running normally.
    Active,
    /// Gave up waiting for the host UI.
    Failed,
}

pub struct Engine<H: TimelineHost> {
    host: H,
    settings_port: Box<dyn SettingsPort>,
    settings: AppSettings,

    events_tx: HostEventSender,
    events_rx: Receiver<HostEvent>,

    state: EngineState,
    ui_wait_attempts: u32,
    gate: VersionGate,

    filter_sync: RadioSync<FilterMode>,
    range_sync: RadioSync<RangeSubMode>,
    grouping_sync: RadioSync<GroupingMode>,

    search_text: String,
    current_frame: i64,
    range: FrameRange,
    categories: CategoryFilterSet,
    length_view: LengthViewMode,
    show_footer: bool,

    timeline: Option<Timeline>,
    timeline_sub: Option<SubscriptionId>,
    watch: IdentityWatch<Uuid>,
    last_poll: Option<Instant>,

    arena: ProjectionArena,
    debouncer: FilterDebouncer,
    scene: SceneInfo,

    visible: Vec<usize>,
    grouped: Option<IndexMap<GroupKey, Vec<usize>>>,

    refilter_count: u64,
    rebuild_count: u64,
}

impl<H: TimelineHost> Engine<H> {
    pub fn new(host: H, mut settings_port: Box<dyn SettingsPort>) -> Result<Self> {
        let settings = settings_port.load()?;
        let gate = VersionGate::default();
        let decision = gate.evaluate(host.app_version(), settings.skipped_version);
        let state = match decision {
            GateDecision::Enabled => EngineState::WaitingForUi,
            GateDecision::NeedsConfirmation => EngineState::Blocked,
        };

        let (events_tx, events_rx) = core::events::channel();

        Ok(Self {
            filter_sync: RadioSync::new(settings.filter_mode, OffToggle::SnapBack),
            range_sync: RadioSync::new(
                settings.range_sub_mode,
                OffToggle::Complement(RangeSubMode::complement),
            ),
            grouping_sync: RadioSync::new(settings.grouping_mode, OffToggle::SnapBack),
            search_text: String::new(),
            current_frame: 0,
            range: settings.range,
            categories: settings.categories.clone(),
            length_view: settings.length_view,
            show_footer: settings.show_footer.0,
            timeline: None,
            timeline_sub: None,
            watch: IdentityWatch::new(),
            last_poll: None,
            arena: ProjectionArena::new(),
            debouncer: FilterDebouncer::default(),
            scene: SceneInfo::default(),
            visible: Vec::new(),
            grouped: None,
            refilter_count: 0,
            rebuild_count: 0,
            host,
            settings_port,
            settings,
            events_tx,
            events_rx,
            state,
            ui_wait_attempts: 0,
            gate,
        })
    }

    // ---- accessors ------------------------------------------------------

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Verified host version range, for the confirmation prompt.
    pub fn version_gate(&self) -> &VersionGate {
        &self.gate
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_sync.mode()
    }

    pub fn range_sub_mode(&self) -> RangeSubMode {
        self.range_sync.mode()
    }

    pub fn grouping_mode(&self) -> GroupingMode {
        self.grouping_sync.mode()
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn range(&self) -> FrameRange {
        self.range
    }

    /// The range inputs currently describe an empty or inverted range.
    /// Advisory for the view; filtering keeps running either way.
    pub fn range_invalid(&self) -> bool {
        self.range.is_invalid()
    }

    pub fn categories(&self) -> &CategoryFilterSet {
        &self.categories
    }

    pub fn length_view(&self) -> LengthViewMode {
        self.length_view
    }

    pub fn show_footer(&self) -> bool {
        self.show_footer
    }

    pub fn scene_info(&self) -> &SceneInfo {
        &self.scene
    }

    pub fn row_count(&self) -> usize {
        self.arena.len()
    }

    /// Visible rows after filtering, in timeline order.
    pub fn visible_rows(&self) -> Vec<&ObjectRow> {
        self.visible.iter().map(|&i| &self.arena.rows()[i]).collect()
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Grouped view of the visible rows, or `None` in flat mode.
    pub fn grouped_rows(&self) -> Option<&IndexMap<GroupKey, Vec<usize>>> {
        self.grouped.as_ref()
    }

    pub fn rows(&self) -> &[ObjectRow] {
        self.arena.rows()
    }

    /// Per-mode flag states for the view's filter toggles.
    pub fn filter_flags(&self) -> [(FilterMode, bool); 3] {
        FilterMode::ALL_MODES.map(|m| (m, m == self.filter_sync.mode()))
    }

    pub fn grouping_flags(&self) -> [(GroupingMode, bool); 6] {
        GroupingMode::ALL_MODES.map(|m| (m, m == self.grouping_sync.mode()))
    }

    pub fn refilter_count(&self) -> u64 {
        self.refilter_count
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Sender for pushing host events into the engine from outside.
    pub fn event_sender(&self) -> HostEventSender {
        self.events_tx.clone()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    // ---- lifecycle ------------------------------------------------------

    /// One tick of the engine loop: activation check, event drain, timeline
    /// poll, debounced recompute.
    pub fn update(&mut self) -> Result<()> {
        match self.state {
            EngineState::Blocked | EngineState::Failed => return Ok(()),
            EngineState::WaitingForUi => {
                if !self.try_activate()? {
                    return Ok(());
                }
            }
            EngineState::Active => {}
        }

        self.drain_events()?;
        self.poll_timeline_if_due();
        if self.debouncer.tick() {
            self.apply_filter();
        }
        Ok(())
    }

    /// User confirmed running under an unverified host version. Persists a
    /// skip for the current (major, minor) and unblocks the engine.
    pub fn confirm_version(&mut self) -> Result<()> {
        if self.state != EngineState::Blocked {
            return Ok(());
        }
        let version = self.host.app_version();
        self.settings.skipped_version = Some(VersionGate::skip_for(version));
        self.save_settings()?;
        log::info!("user confirmed unverified host version {}", version);
        self.state = EngineState::WaitingForUi;
        Ok(())
    }

    fn try_activate(&mut self) -> Result<bool> {
        // Rate-limit readiness checks to the monitor cadence
        if let Some(last) = self.last_poll {
            if last.elapsed() < MONITOR_INTERVAL {
                return Ok(false);
            }
        }
        self.last_poll = Some(Instant::now());

        if !self.host.is_ui_ready() {
            self.ui_wait_attempts += 1;
            if self.ui_wait_attempts >= UI_READY_ATTEMPTS {
                log::error!(
                    "host UI not ready after {} attempts, giving up",
                    self.ui_wait_attempts
                );
                self.state = EngineState::Failed;
            }
            return Ok(false);
        }

        self.filter_sync.initialize(self.settings.filter_mode);
        self.range_sync.initialize(self.settings.range_sub_mode);
        self.grouping_sync.initialize(self.settings.grouping_mode);
        self.state = EngineState::Active;
        log::info!("engine active (host {})", self.host.app_version());

        self.poll_timeline();
        Ok(true)
    }

    // ---- event handling -------------------------------------------------

    fn drain_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::ItemChanged { item_id, field } => {
                self.on_item_changed(item_id, field);
            }
            HostEvent::TimelineChanged { timeline_id, prop } => {
                self.on_timeline_changed(timeline_id, prop);
            }
            HostEvent::SceneReplaced => {
                log::debug!("scene-replaced push received");
                self.poll_timeline();
            }
            HostEvent::SettingsChanged { fields } => {
                self.on_settings_changed(&fields)?;
            }
        }
        Ok(())
    }

    fn on_item_changed(&mut self, item_id: Uuid, field: ItemField) {
        if self.arena.row_by_id(item_id).is_none() {
            // Stale event from a disposed generation
            return;
        }
        match field {
            ItemField::Label | ItemField::Frame | ItemField::Length | ItemField::Category => {
                self.debouncer.mark_dirty();
            }
            ItemField::Layer | ItemField::Group | ItemField::IsLocked | ItemField::IsHidden => {
                // Only regroup when the active grouping keys off this field
                if self.grouping_sync.mode().affected_by(field) {
                    self.regroup();
                }
            }
            // Display-only; rows read it straight from the item
            ItemField::Color => {}
        }
    }

    fn on_timeline_changed(&mut self, timeline_id: Uuid, prop: TimelineProp) {
        let Some(tl) = self.timeline.clone() else {
            return;
        };
        if tl.id() != timeline_id {
            return;
        }
        match prop {
            TimelineProp::Items => self.rebuild_items(),
            TimelineProp::CurrentFrame => {
                self.current_frame = tl.current_frame();
                if self.filter_sync.mode() == FilterMode::UnderSeekBar {
                    self.debouncer.mark_dirty();
                }
            }
            TimelineProp::Length | TimelineProp::Name | TimelineProp::MaxLayer => {
                self.scene = SceneInfo::from_timeline(&tl);
            }
        }
    }

    /// Out-of-band settings edit: reload the file and apply each changed
    /// field through the same paths as direct commands. Applying is
    /// idempotent, so echoes of our own saves land as no-ops.
    fn on_settings_changed(&mut self, fields: &[SettingsField]) -> Result<()> {
        let fresh = self.settings_port.load()?;
        let changed = diff_settings(&self.settings, &fresh);
        if changed.is_empty() {
            return Ok(());
        }
        log::debug!("settings changed out-of-band: {:?} (hint {:?})", changed, fields);
        self.settings = fresh.clone();
        for field in changed {
            match field {
                SettingsField::FilterMode => {
                    let outcome = self.filter_sync.set_mode(fresh.filter_mode);
                    self.after_filter_mode(outcome);
                }
                SettingsField::RangeSubMode => {
                    let outcome = self.range_sync.set_mode(fresh.range_sub_mode);
                    self.after_range_sub_mode(outcome);
                }
                SettingsField::GroupingMode => {
                    let outcome = self.grouping_sync.set_mode(fresh.grouping_mode);
                    self.after_grouping_mode(outcome);
                }
                SettingsField::Range => {
                    self.range = fresh.range;
                    self.apply_filter_now();
                }
                SettingsField::Categories => {
                    self.categories = fresh.categories.clone();
                    self.apply_filter_now();
                }
                SettingsField::LengthView => self.length_view = fresh.length_view,
                SettingsField::ShowFooter => self.show_footer = fresh.show_footer.0,
                SettingsField::VersionSkip => {}
            }
        }
        Ok(())
    }

    // ---- timeline monitoring --------------------------------------------

    fn poll_timeline_if_due(&mut self) {
        let due = match self.last_poll {
            None => true,
            Some(last) => last.elapsed() >= MONITOR_INTERVAL,
        };
        if due {
            self.poll_timeline();
        }
    }

    /// Compare the host's current timeline identity against the one we are
    /// attached to, and re-attach on any change. This is the safety net for
    /// scene switches the host never announces.
    fn poll_timeline(&mut self) {
        self.last_poll = Some(Instant::now());
        let seen = self.host.try_get_timeline();
        match self.watch.observe(seen.as_ref().map(Timeline::id)) {
            WatchEvent::Unchanged => {}
            WatchEvent::Acquired(id) => {
                log::info!("timeline acquired: {}", id);
                if let Some(tl) = seen {
                    self.attach(tl);
                }
            }
            WatchEvent::Replaced { old, new } => {
                log::info!("timeline replaced: {} -> {}", old, new);
                self.detach();
                if let Some(tl) = seen {
                    self.attach(tl);
                }
            }
            WatchEvent::Lost(id) => {
                log::info!("timeline lost: {}", id);
                self.detach();
            }
        }
    }

    fn attach(&mut self, tl: Timeline) {
        let sub = tl.subscribe(self.events_tx.clone());
        self.timeline_sub = Some(sub);
        self.current_frame = tl.current_frame();
        self.scene = SceneInfo::from_timeline(&tl);
        self.timeline = Some(tl);
        self.rebuild_items();
    }

    fn detach(&mut self) {
        if let (Some(tl), Some(sub)) = (self.timeline.take(), self.timeline_sub.take()) {
            tl.unsubscribe(sub);
        }
        self.arena.clear();
        self.visible.clear();
        self.grouped = None;
        self.scene = SceneInfo::default();
        self.debouncer.cancel();
    }

    /// Rebuild the row projection from the attached timeline's items and
    /// refilter immediately.
    fn rebuild_items(&mut self) {
        let Some(tl) = self.timeline.clone() else {
            return;
        };
        let items = tl.items();
        self.arena.rebuild(&items, &self.events_tx);
        self.scene = SceneInfo::from_timeline(&tl);
        self.rebuild_count += 1;
        self.apply_filter_now();
    }

    /// Drop everything and re-attach from scratch.
    pub fn reload(&mut self) {
        log::info!("manual reload requested");
        self.detach();
        self.watch.reset();
        self.poll_timeline();
    }

    // ---- filtering and grouping -----------------------------------------

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            search_text: self.search_text.clone(),
            mode: self.filter_sync.mode(),
            range_sub_mode: self.range_sync.mode(),
            current_frame: self.current_frame,
            range: self.range,
            categories: self.categories.clone(),
        }
    }

    fn apply_filter(&mut self) {
        let criteria = self.criteria();
        let snapshots: Vec<ItemSnapshot> =
            self.arena.rows().iter().map(|r| r.item().snapshot()).collect();
        self.visible = snapshots
            .iter()
            .enumerate()
            .filter(|(_, snap)| criteria.matches(snap))
            .map(|(i, _)| i)
            .collect();
        self.refilter_count += 1;
        log::trace!(
            "refilter: {}/{} rows visible",
            self.visible.len(),
            self.arena.len()
        );
        self.regroup();
    }

    /// Immediate recompute, marking any pending debounced request satisfied.
    fn apply_filter_now(&mut self) {
        self.apply_filter();
        self.debouncer.run_now();
    }

    fn regroup(&mut self) {
        self.grouped = grouping::group_rows(self.grouping_sync.mode(), self.arena.rows(), &self.visible);
    }

    // ---- commands -------------------------------------------------------

    pub fn set_search_text(&mut self, text: &str) {
        if self.search_text == text {
            return;
        }
        self.search_text = text.to_string();
        self.debouncer.mark_dirty();
    }

    /// Authoritative filter mode write.
    pub fn set_filter_mode(&mut self, mode: FilterMode) -> Result<()> {
        let outcome = self.filter_sync.set_mode(mode);
        self.commit_filter_mode(outcome)
    }

    /// A filter mode toggle changed in the view.
    pub fn filter_flag_changed(&mut self, mode: FilterMode, on: bool) -> Result<()> {
        let outcome = if on {
            self.filter_sync.flag_on(mode)
        } else {
            self.filter_sync.flag_off(mode)
        };
        self.commit_filter_mode(outcome)
    }

    fn commit_filter_mode(&mut self, outcome: SyncOutcome<FilterMode>) -> Result<()> {
        if let SyncOutcome::Applied { new, .. } = outcome {
            self.filter_sync.begin_apply();
            self.settings.filter_mode = new;
            let saved = self.save_settings();
            self.filter_sync.finish_apply();
            saved?;
        }
        self.after_filter_mode(outcome);
        Ok(())
    }

    fn after_filter_mode(&mut self, outcome: SyncOutcome<FilterMode>) {
        let SyncOutcome::Applied { new, .. } = outcome else {
            return;
        };
        if new == FilterMode::UnderSeekBar {
            // Pull the playhead before the first recompute so activation
            // does not flash a stale frame's result
            if let Some(tl) = &self.timeline {
                self.current_frame = tl.current_frame();
            }
        }
        self.apply_filter_now();
    }

    pub fn set_range_sub_mode(&mut self, mode: RangeSubMode) -> Result<()> {
        let outcome = self.range_sync.set_mode(mode);
        self.commit_range_sub_mode(outcome)
    }

    /// A range sub-mode toggle changed. Switching the active one off flips
    /// to the other, so exactly one is always on.
    pub fn range_flag_changed(&mut self, mode: RangeSubMode, on: bool) -> Result<()> {
        let outcome = if on {
            self.range_sync.flag_on(mode)
        } else {
            self.range_sync.flag_off(mode)
        };
        self.commit_range_sub_mode(outcome)
    }

    fn commit_range_sub_mode(&mut self, outcome: SyncOutcome<RangeSubMode>) -> Result<()> {
        if let SyncOutcome::Applied { new, .. } = outcome {
            self.range_sync.begin_apply();
            self.settings.range_sub_mode = new;
            let saved = self.save_settings();
            self.range_sync.finish_apply();
            saved?;
        }
        self.after_range_sub_mode(outcome);
        Ok(())
    }

    fn after_range_sub_mode(&mut self, outcome: SyncOutcome<RangeSubMode>) {
        if matches!(outcome, SyncOutcome::Applied { .. })
            && self.filter_sync.mode() == FilterMode::Range
        {
            self.apply_filter_now();
        }
    }

    pub fn set_grouping(&mut self, mode: GroupingMode) -> Result<()> {
        let outcome = self.grouping_sync.set_mode(mode);
        self.commit_grouping_mode(outcome)
    }

    /// A grouping toggle changed in the view.
    pub fn grouping_flag_changed(&mut self, mode: GroupingMode, on: bool) -> Result<()> {
        let outcome = if on {
            self.grouping_sync.flag_on(mode)
        } else {
            self.grouping_sync.flag_off(mode)
        };
        self.commit_grouping_mode(outcome)
    }

    fn commit_grouping_mode(&mut self, outcome: SyncOutcome<GroupingMode>) -> Result<()> {
        if let SyncOutcome::Applied { new, .. } = outcome {
            self.grouping_sync.begin_apply();
            self.settings.grouping_mode = new;
            let saved = self.save_settings();
            self.grouping_sync.finish_apply();
            saved?;
        }
        self.after_grouping_mode(outcome);
        Ok(())
    }

    fn after_grouping_mode(&mut self, outcome: SyncOutcome<GroupingMode>) {
        if matches!(outcome, SyncOutcome::Applied { .. }) {
            self.regroup();
        }
    }

    pub fn set_range_start(&mut self, start: i64) -> Result<()> {
        if self.range.start == start {
            return Ok(());
        }
        self.range.start = start;
        self.settings.range = self.range;
        self.save_settings()?;
        if self.filter_sync.mode() == FilterMode::Range {
            self.apply_filter_now();
        }
        Ok(())
    }

    pub fn set_range_end(&mut self, end: i64) -> Result<()> {
        if self.range.end == end {
            return Ok(());
        }
        self.range.end = end;
        self.settings.range = self.range;
        self.save_settings()?;
        if self.filter_sync.mode() == FilterMode::Range {
            self.apply_filter_now();
        }
        Ok(())
    }

    /// Set the range start to the current playhead position.
    pub fn set_range_start_from_playhead(&mut self) -> Result<()> {
        self.set_range_start(self.current_frame)
    }

    /// Set the range end to the current playhead position.
    pub fn set_range_end_from_playhead(&mut self) -> Result<()> {
        self.set_range_end(self.current_frame)
    }

    /// Select a grouping by name. Unknown names fall back to the flat view.
    pub fn set_grouping_by_name(&mut self, name: &str) -> Result<()> {
        let mode = GroupingMode::from_str(name).unwrap_or_else(|| {
            log::warn!("unknown grouping name '{}', using flat view", name);
            GroupingMode::None
        });
        self.set_grouping(mode)
    }

    pub fn set_category_enabled(&mut self, category: ItemCategory, enabled: bool) -> Result<()> {
        if self.categories.is_enabled(category) == enabled {
            return Ok(());
        }
        self.categories.set_enabled(category, enabled);
        self.settings.categories = self.categories.clone();
        self.save_settings()?;
        self.apply_filter_now();
        Ok(())
    }

    pub fn set_length_view(&mut self, mode: LengthViewMode) -> Result<()> {
        if self.length_view == mode {
            return Ok(());
        }
        self.length_view = mode;
        self.settings.length_view = mode;
        self.save_settings()
    }

    pub fn set_show_footer(&mut self, show: bool) -> Result<()> {
        if self.show_footer == show {
            return Ok(());
        }
        self.show_footer = show;
        self.settings.show_footer = crate::settings::ShowFooter(show);
        self.save_settings()
    }

    fn save_settings(&mut self) -> Result<()> {
        self.settings_port.save(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SourceItem;
    use crate::settings::MemorySettings;
    use crate::version::AppVersion;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scriptable host for engine tests.
    #[derive(Clone)]
    struct TestHost {
        timeline: Rc<RefCell<Option<Timeline>>>,
        ui_ready: Rc<RefCell<bool>>,
        version: AppVersion,
    }

    impl TestHost {
        fn new() -> Self {
            Self {
                timeline: Rc::new(RefCell::new(None)),
                ui_ready: Rc::new(RefCell::new(true)),
                version: AppVersion::new(4, 42, 0),
            }
        }

        fn with_version(version: AppVersion) -> Self {
            let mut host = Self::new();
            host.version = version;
            host
        }

        fn set_timeline(&self, tl: Option<Timeline>) {
            *self.timeline.borrow_mut() = tl;
        }
    }

    impl TimelineHost for TestHost {
        fn try_get_timeline(&self) -> Option<Timeline> {
            self.timeline.borrow().clone()
        }

        fn is_ui_ready(&self) -> bool {
            *self.ui_ready.borrow()
        }

        fn app_version(&self) -> AppVersion {
            self.version
        }
    }

    fn timeline_with_items(items: &[SourceItem]) -> Timeline {
        let tl = Timeline::new("scene", 30.0, 44100, 1920, 1080, 300);
        for item in items {
            tl.add_item(item.clone());
        }
        tl
    }

    fn active_engine(host: TestHost) -> Engine<TestHost> {
        let mut engine =
            Engine::new(host, Box::new(MemorySettings::default())).expect("engine builds");
        engine.update().expect("first tick activates");
        assert_eq!(engine.state(), EngineState::Active);
        engine
    }

    #[test]
    fn test_activation_attaches_to_timeline() {
        let host = TestHost::new();
        let tl = timeline_with_items(&[
            SourceItem::new("a", 0, 10, 1, "VideoItem"),
            SourceItem::new("b", 20, 10, 2, "AudioItem"),
        ]);
        host.set_timeline(Some(tl));

        let engine = active_engine(host);
        assert_eq!(engine.row_count(), 2);
        assert_eq!(engine.visible_count(), 2);
        assert_eq!(engine.scene_info().name, "scene");
    }

    #[test]
    fn test_scene_length_floor() {
        let host = TestHost::new();
        let tl = Timeline::new("tiny", 30.0, 44100, 640, 480, 7);
        host.set_timeline(Some(tl));
        let engine = active_engine(host);
        assert_eq!(engine.scene_info().length, 100);
    }

    #[test]
    fn test_version_gate_blocks_until_confirmed() {
        let host = TestHost::with_version(AppVersion::new(4, 50, 0));
        host.set_timeline(Some(timeline_with_items(&[])));
        let mut engine =
            Engine::new(host, Box::new(MemorySettings::default())).expect("engine builds");

        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Blocked);

        engine.confirm_version().unwrap();
        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Active);
    }

    #[test]
    fn test_skip_from_settings_bypasses_gate() {
        let host = TestHost::with_version(AppVersion::new(4, 50, 1));
        let mut settings = AppSettings::default();
        settings.skipped_version = Some(VersionGate::skip_for(AppVersion::new(4, 50, 0)));
        let mut engine =
            Engine::new(host, Box::new(MemorySettings::new(settings))).expect("engine builds");
        engine.update().unwrap();
        assert_eq!(engine.state(), EngineState::Active);
    }

    #[test]
    fn test_search_is_debounced_then_applied() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[
            SourceItem::new("intro", 0, 10, 1, "VideoItem"),
            SourceItem::new("outro", 0, 10, 1, "VideoItem"),
        ])));
        let mut engine = active_engine(host);
        let before = engine.refilter_count();

        engine.set_search_text("INTRO");
        assert_eq!(engine.refilter_count(), before, "text edits are coalesced");

        std::thread::sleep(Duration::from_millis(120));
        engine.update().unwrap();
        assert_eq!(engine.refilter_count(), before + 1);
        assert_eq!(engine.visible_count(), 1);
        assert_eq!(engine.visible_rows()[0].label(), "intro");
    }

    #[test]
    fn test_filter_flag_round_trip_is_loop_safe() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[])));
        let mut engine = active_engine(host);

        engine.filter_flag_changed(FilterMode::Range, true).unwrap();
        assert_eq!(engine.filter_mode(), FilterMode::Range);
        let refilters = engine.refilter_count();

        // Echo of our own change: nothing happens
        engine.filter_flag_changed(FilterMode::Range, true).unwrap();
        // Stale off-echo for the mode we left
        engine.filter_flag_changed(FilterMode::All, false).unwrap();
        assert_eq!(engine.filter_mode(), FilterMode::Range);
        assert_eq!(engine.refilter_count(), refilters);
    }

    #[test]
    fn test_flag_mirrors_track_the_enum() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[])));
        let mut engine = active_engine(host);

        for mode in FilterMode::ALL_MODES {
            engine.set_filter_mode(mode).unwrap();
            let on: Vec<FilterMode> = engine
                .filter_flags()
                .iter()
                .filter(|(_, flag)| *flag)
                .map(|(m, _)| *m)
                .collect();
            assert_eq!(on, vec![mode], "exactly one flag on, matching the enum");
        }

        engine.set_grouping(GroupingMode::Layer).unwrap();
        let on = engine
            .grouping_flags()
            .iter()
            .filter(|(_, flag)| *flag)
            .count();
        assert_eq!(on, 1);
    }

    #[test]
    fn test_active_filter_flag_off_snaps_back() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[])));
        let mut engine = active_engine(host);
        engine.set_filter_mode(FilterMode::UnderSeekBar).unwrap();

        engine
            .filter_flag_changed(FilterMode::UnderSeekBar, false)
            .unwrap();
        assert_eq!(engine.filter_mode(), FilterMode::UnderSeekBar);
    }

    #[test]
    fn test_range_sub_mode_off_flips_to_complement() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[])));
        let mut engine = active_engine(host);

        assert_eq!(engine.range_sub_mode(), RangeSubMode::Strict);
        engine
            .range_flag_changed(RangeSubMode::Strict, false)
            .unwrap();
        assert_eq!(engine.range_sub_mode(), RangeSubMode::Overlap);
    }

    #[test]
    fn test_seek_bar_mode_tracks_playhead() {
        let host = TestHost::new();
        let tl = timeline_with_items(&[
            SourceItem::new("early", 0, 10, 1, "VideoItem"),
            SourceItem::new("late", 100, 10, 1, "VideoItem"),
        ]);
        tl.set_current_frame(5);
        host.set_timeline(Some(tl.clone()));
        let mut engine = active_engine(host);

        engine.set_filter_mode(FilterMode::UnderSeekBar).unwrap();
        assert_eq!(engine.visible_count(), 1);
        assert_eq!(engine.visible_rows()[0].label(), "early");

        // Playhead jumps; change arrives as an event and is debounced
        tl.set_current_frame(105);
        engine.update().unwrap();
        std::thread::sleep(Duration::from_millis(120));
        engine.update().unwrap();
        assert_eq!(engine.visible_rows()[0].label(), "late");
    }

    #[test]
    fn test_range_filter_with_invalid_range_shows_nothing() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[SourceItem::new(
            "a", 10, 10, 1, "VideoItem",
        )])));
        let mut engine = active_engine(host);

        engine.set_filter_mode(FilterMode::Range).unwrap();
        engine.set_range_start(50).unwrap();
        engine.set_range_end(10).unwrap();
        assert!(engine.range_invalid());
        assert_eq!(engine.visible_count(), 0);

        engine.set_range_start(0).unwrap();
        engine.set_range_end(100).unwrap();
        assert!(!engine.range_invalid());
        assert_eq!(engine.visible_count(), 1);
    }

    #[test]
    fn test_category_toggle_refilters_immediately() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[
            SourceItem::new("v", 0, 10, 1, "VideoItem"),
            SourceItem::new("a", 0, 10, 1, "AudioItem"),
        ])));
        let mut engine = active_engine(host);

        engine
            .set_category_enabled(ItemCategory::Video, false)
            .unwrap();
        assert_eq!(engine.visible_count(), 1);
        assert_eq!(engine.visible_rows()[0].label(), "a");
    }

    #[test]
    fn test_grouping_toggle_and_item_edit_regroup() {
        let host = TestHost::new();
        let items = [
            SourceItem::new("a", 0, 10, 1, "VideoItem"),
            SourceItem::new("b", 0, 10, 1, "VideoItem"),
        ];
        host.set_timeline(Some(timeline_with_items(&items)));
        let mut engine = active_engine(host);

        engine.set_grouping(GroupingMode::IsLocked).unwrap();
        let groups = engine.grouped_rows().expect("grouped view active");
        assert_eq!(groups.len(), 1);

        // Locking one item moves it to a new group via its change event
        items[1].set_locked(true);
        engine.update().unwrap();
        let groups = engine.grouped_rows().unwrap();
        assert_eq!(groups.len(), 2);

        engine.set_grouping(GroupingMode::None).unwrap();
        assert!(engine.grouped_rows().is_none());
    }

    #[test]
    fn test_item_add_and_remove_rebuild_rows() {
        let host = TestHost::new();
        let tl = timeline_with_items(&[SourceItem::new("a", 0, 10, 1, "VideoItem")]);
        host.set_timeline(Some(tl.clone()));
        let mut engine = active_engine(host);
        assert_eq!(engine.row_count(), 1);

        let extra = SourceItem::new("b", 5, 10, 2, "AudioItem");
        let extra_id = extra.id();
        tl.add_item(extra);
        engine.update().unwrap();
        assert_eq!(engine.row_count(), 2);

        tl.remove_item(extra_id);
        engine.update().unwrap();
        assert_eq!(engine.row_count(), 1);
    }

    #[test]
    fn test_scene_switch_detected_by_poll() {
        let host = TestHost::new();
        let first = timeline_with_items(&[SourceItem::new("one", 0, 10, 1, "VideoItem")]);
        host.set_timeline(Some(first.clone()));
        let mut engine = active_engine(host.clone());
        assert_eq!(engine.visible_rows()[0].label(), "one");

        let second = timeline_with_items(&[
            SourceItem::new("two", 0, 10, 1, "VideoItem"),
            SourceItem::new("three", 0, 10, 1, "VideoItem"),
        ]);
        host.set_timeline(Some(second));
        // Push path: no need to wait out the poll interval
        engine.event_sender().emit(HostEvent::SceneReplaced);
        engine.update().unwrap();

        assert_eq!(engine.row_count(), 2);
        assert_eq!(
            first.items()[0].subscriber_count(),
            0,
            "old scene's subscriptions must be released"
        );
    }

    #[test]
    fn test_timeline_lost_clears_view() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[SourceItem::new(
            "a", 0, 10, 1, "VideoItem",
        )])));
        let mut engine = active_engine(host.clone());
        assert_eq!(engine.row_count(), 1);

        host.set_timeline(None);
        engine.event_sender().emit(HostEvent::SceneReplaced);
        engine.update().unwrap();
        assert_eq!(engine.row_count(), 0);
        assert_eq!(engine.visible_count(), 0);
    }

    #[test]
    fn test_reload_reattaches() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[SourceItem::new(
            "a", 0, 10, 1, "VideoItem",
        )])));
        let mut engine = active_engine(host);
        let builds = engine.rebuild_count();
        engine.reload();
        assert_eq!(engine.rebuild_count(), builds + 1);
        assert_eq!(engine.row_count(), 1);
    }

    #[test]
    fn test_mode_changes_are_persisted() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[])));
        let mut engine = active_engine(host);

        engine.set_filter_mode(FilterMode::Range).unwrap();
        engine.set_grouping(GroupingMode::Layer).unwrap();
        engine.set_range_start(3).unwrap();

        let saved = engine.settings_port.load().unwrap();
        assert_eq!(saved.filter_mode, FilterMode::Range);
        assert_eq!(saved.grouping_mode, GroupingMode::Layer);
        assert_eq!(saved.range.start, 3);
    }

    #[test]
    fn test_out_of_band_settings_change_applies() {
        let host = TestHost::new();
        host.set_timeline(Some(timeline_with_items(&[
            SourceItem::new("v", 0, 10, 1, "VideoItem"),
            SourceItem::new("a", 0, 10, 1, "AudioItem"),
        ])));
        let mut engine = active_engine(host);

        // Someone else edits the stored settings and pings us
        let mut edited = engine.settings_port.load().unwrap();
        edited.grouping_mode = GroupingMode::Category;
        edited.categories.set_enabled(ItemCategory::Audio, false);
        engine.settings_port.save(&edited).unwrap();
        engine.event_sender().emit(HostEvent::SettingsChanged {
            fields: vec![SettingsField::GroupingMode, SettingsField::Categories],
        });
        engine.update().unwrap();

        assert_eq!(engine.grouping_mode(), GroupingMode::Category);
        assert_eq!(engine.visible_count(), 1);
        assert!(engine.grouped_rows().is_some());
    }

    #[test]
    fn test_stale_item_events_ignored_after_detach() {
        let host = TestHost::new();
        let tl = timeline_with_items(&[SourceItem::new("a", 0, 10, 1, "VideoItem")]);
        host.set_timeline(Some(tl.clone()));
        let mut engine = active_engine(host.clone());

        host.set_timeline(None);
        engine.event_sender().emit(HostEvent::SceneReplaced);
        engine.update().unwrap();

        // Event for an item no longer projected
        engine.event_sender().emit(HostEvent::ItemChanged {
            item_id: tl.items()[0].id(),
            field: ItemField::Frame,
        });
        engine.update().unwrap();
        assert!(!engine.debouncer.is_pending(), "stale event must not arm a recompute");
    }
}

//! Row projections: the view-facing mirror of timeline items.
//!
//! Every rebuild produces a fresh generation of rows. The previous
//! generation is disposed (all item subscriptions removed) before the new
//! one is installed, so a burst of rebuilds can never leak subscriptions or
//! deliver events from rows that are no longer displayed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::ItemCategory;
use crate::core::HostEventSender;
use crate::host::{SourceItem, SubscriptionId};

/// How an item's length is rendered in its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthViewMode {
    /// Raw frame count
    Frame,
    /// Seconds, two decimals
    Seconds,
    /// Seconds for items at least one second long, frames otherwise
    #[default]
    Smart,
}

impl LengthViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthViewMode::Frame => "frame",
            LengthViewMode::Seconds => "seconds",
            LengthViewMode::Smart => "smart",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "frame" => Some(LengthViewMode::Frame),
            "seconds" => Some(LengthViewMode::Seconds),
            "smart" => Some(LengthViewMode::Smart),
            _ => None,
        }
    }
}

impl Serialize for LengthViewMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LengthViewMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(LengthViewMode::from_str(&raw).unwrap_or_else(|| {
            log::warn!("unknown length view mode '{}', using default", raw);
            LengthViewMode::default()
        }))
    }
}

/// One displayed row, forwarding to its backing item.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    item: SourceItem,
    subscription: SubscriptionId,
}

impl ObjectRow {
    fn new(item: SourceItem, events: &HostEventSender) -> Self {
        let subscription = item.subscribe(events.clone());
        Self { item, subscription }
    }

    pub fn id(&self) -> Uuid {
        self.item.id()
    }

    pub fn item(&self) -> &SourceItem {
        &self.item
    }

    pub fn label(&self) -> String {
        self.item.label()
    }

    pub fn frame(&self) -> i64 {
        self.item.frame()
    }

    pub fn length(&self) -> i64 {
        self.item.length()
    }

    pub fn layer(&self) -> i32 {
        self.item.layer()
    }

    pub fn group(&self) -> i32 {
        self.item.group()
    }

    pub fn is_locked(&self) -> bool {
        self.item.is_locked()
    }

    pub fn is_hidden(&self) -> bool {
        self.item.is_hidden()
    }

    pub fn category(&self) -> Option<ItemCategory> {
        ItemCategory::from_raw(&self.item.raw_category())
    }

    /// Item color as "#RRGGBB", for the row accent.
    pub fn color(&self) -> String {
        self.item.color()
    }

    pub fn locked_label(&self) -> &'static str {
        if self.is_locked() { "🔒 Lock" } else { "🔓 Unlock" }
    }

    pub fn hidden_label(&self) -> &'static str {
        if self.is_hidden() { "🙈" } else { "👁" }
    }

    pub fn icon_key(&self) -> &'static str {
        match self.category() {
            Some(cat) => cat.icon_key(),
            None => "icon_other",
        }
    }

    /// Length rendered per the configured view mode.
    pub fn length_display(&self, mode: LengthViewMode, fps: f64) -> String {
        let length = self.length();
        let seconds = |l: i64| format!("{:.2}s", l as f64 / fps);
        match mode {
            LengthViewMode::Frame => format!("{}", length),
            LengthViewMode::Seconds if fps > 0.0 => seconds(length),
            LengthViewMode::Smart if fps > 0.0 && length as f64 >= fps => seconds(length),
            _ => format!("{}", length),
        }
    }

    fn dispose(&self) {
        self.item.unsubscribe(self.subscription);
    }
}

/// The current generation of rows, one per source item.
#[derive(Debug, Default)]
pub struct ProjectionArena {
    generation: u64,
    rows: Vec<ObjectRow>,
}

impl ProjectionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[ObjectRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_by_id(&self, id: Uuid) -> Option<&ObjectRow> {
        self.rows.iter().find(|row| row.id() == id)
    }

    /// Replace the arena contents with a new generation of rows. The old
    /// generation is fully disposed first.
    pub fn rebuild(&mut self, items: &[SourceItem], events: &HostEventSender) {
        self.clear();
        self.generation += 1;
        self.rows = items
            .iter()
            .map(|item| ObjectRow::new(item.clone(), events))
            .collect();
        log::debug!(
            "projection rebuilt: generation {}, {} rows",
            self.generation,
            self.rows.len()
        );
    }

    /// Dispose every row without installing a replacement.
    pub fn clear(&mut self) {
        for row in &self.rows {
            row.dispose();
        }
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events;

    fn items(n: usize) -> Vec<SourceItem> {
        (0..n)
            .map(|i| SourceItem::new(&format!("item {}", i), i as i64 * 10, 10, 1, "VideoItem"))
            .collect()
    }

    #[test]
    fn test_rebuild_subscribes_each_item_once() {
        let (tx, _rx) = events::channel();
        let src = items(3);
        let mut arena = ProjectionArena::new();
        arena.rebuild(&src, &tx);

        assert_eq!(arena.len(), 3);
        for item in &src {
            assert_eq!(item.subscriber_count(), 1);
        }
    }

    #[test]
    fn test_rebuild_disposes_previous_generation() {
        let (tx, _rx) = events::channel();
        let src = items(2);
        let mut arena = ProjectionArena::new();

        arena.rebuild(&src, &tx);
        let gen1 = arena.generation();
        arena.rebuild(&src, &tx);

        assert_eq!(arena.generation(), gen1 + 1);
        for item in &src {
            assert_eq!(
                item.subscriber_count(),
                1,
                "old generation subscriptions must be released"
            );
        }
    }

    #[test]
    fn test_clear_releases_everything() {
        let (tx, _rx) = events::channel();
        let src = items(2);
        let mut arena = ProjectionArena::new();
        arena.rebuild(&src, &tx);
        arena.clear();

        assert!(arena.is_empty());
        for item in &src {
            assert_eq!(item.subscriber_count(), 0);
        }
    }

    #[test]
    fn test_row_state_labels() {
        let (tx, _rx) = events::channel();
        let src = items(1);
        let mut arena = ProjectionArena::new();
        arena.rebuild(&src, &tx);

        let row = &arena.rows()[0];
        assert_eq!(row.locked_label(), "🔓 Unlock");
        assert_eq!(row.hidden_label(), "👁");
        src[0].set_locked(true);
        src[0].set_hidden(true);
        assert_eq!(row.locked_label(), "🔒 Lock");
        assert_eq!(row.hidden_label(), "🙈");
        assert_eq!(row.icon_key(), "Video");
        src[0].set_color("#ff0000");
        assert_eq!(row.color(), "#ff0000");
    }

    #[test]
    fn test_length_display_modes() {
        let (tx, _rx) = events::channel();
        let item = SourceItem::new("clip", 0, 60, 1, "VideoItem");
        let mut arena = ProjectionArena::new();
        arena.rebuild(&[item.clone()], &tx);
        let row = &arena.rows()[0];

        assert_eq!(row.length_display(LengthViewMode::Frame, 30.0), "60");
        assert_eq!(row.length_display(LengthViewMode::Seconds, 30.0), "2.00s");
        assert_eq!(row.length_display(LengthViewMode::Smart, 30.0), "2.00s");
        item.set_length(15); // below one second
        assert_eq!(row.length_display(LengthViewMode::Smart, 30.0), "15");
        // Degenerate fps falls back to frames
        assert_eq!(row.length_display(LengthViewMode::Seconds, 0.0), "15");
    }

    #[test]
    fn test_unknown_category_uses_fallback_icon() {
        let (tx, _rx) = events::channel();
        let item = SourceItem::new("odd", 0, 10, 1, "MysteryItem");
        let mut arena = ProjectionArena::new();
        arena.rebuild(&[item], &tx);
        assert_eq!(arena.rows()[0].icon_key(), "icon_other");
        assert_eq!(arena.rows()[0].category(), None);
    }
}

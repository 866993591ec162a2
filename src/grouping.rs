//! Grouping the visible rows by a shared property.
//!
//! Groups preserve first-seen order: the group of the first visible row
//! comes first, matching the order the items appear on the timeline list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::category::ItemCategory;
use crate::host::ItemField;
use crate::projection::ObjectRow;

/// Property the visible list is grouped by. At most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingMode {
    #[default]
    None,
    Category,
    Layer,
    Group,
    IsLocked,
    IsHidden,
}

impl GroupingMode {
    pub const ALL_MODES: [GroupingMode; 6] = [
        GroupingMode::None,
        GroupingMode::Category,
        GroupingMode::Layer,
        GroupingMode::Group,
        GroupingMode::IsLocked,
        GroupingMode::IsHidden,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMode::None => "none",
            GroupingMode::Category => "category",
            GroupingMode::Layer => "layer",
            GroupingMode::Group => "group",
            GroupingMode::IsLocked => "is_locked",
            GroupingMode::IsHidden => "is_hidden",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(GroupingMode::None),
            "category" => Some(GroupingMode::Category),
            "layer" => Some(GroupingMode::Layer),
            "group" => Some(GroupingMode::Group),
            "is_locked" => Some(GroupingMode::IsLocked),
            "is_hidden" => Some(GroupingMode::IsHidden),
            _ => None,
        }
    }

    /// Does a change to this item field move items between groups under the
    /// current mode? Used to decide whether an item edit needs a regroup.
    pub fn affected_by(&self, field: ItemField) -> bool {
        matches!(
            (self, field),
            (GroupingMode::Category, ItemField::Category)
                | (GroupingMode::Layer, ItemField::Layer)
                | (GroupingMode::Group, ItemField::Group)
                | (GroupingMode::IsLocked, ItemField::IsLocked)
                | (GroupingMode::IsHidden, ItemField::IsHidden)
        )
    }
}

impl Serialize for GroupingMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GroupingMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(GroupingMode::from_str(&raw).unwrap_or_else(|| {
            log::warn!("unknown grouping mode '{}', using default", raw);
            GroupingMode::default()
        }))
    }
}

/// Identity of one group under the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Category(Option<ItemCategory>),
    Layer(i32),
    Group(i32),
    Flag(&'static str),
}

impl GroupKey {
    pub fn display_name(&self) -> String {
        match self {
            GroupKey::Category(Some(cat)) => cat.display_name().to_string(),
            GroupKey::Category(None) => "Other".to_string(),
            GroupKey::Layer(n) => format!("Layer {}", n),
            GroupKey::Group(0) => "No group".to_string(),
            GroupKey::Group(n) => format!("Group {}", n),
            GroupKey::Flag(label) => (*label).to_string(),
        }
    }
}

fn key_for(mode: GroupingMode, row: &ObjectRow) -> Option<GroupKey> {
    match mode {
        GroupingMode::None => None,
        GroupingMode::Category => Some(GroupKey::Category(row.category())),
        GroupingMode::Layer => Some(GroupKey::Layer(row.layer())),
        GroupingMode::Group => Some(GroupKey::Group(row.group())),
        GroupingMode::IsLocked => Some(GroupKey::Flag(row.locked_label())),
        GroupingMode::IsHidden => Some(GroupKey::Flag(row.hidden_label())),
    }
}

/// Partition the visible row indices into groups, preserving first-seen
/// group order and in-group row order. `None` means the flat (ungrouped)
/// view is in effect.
pub fn group_rows(
    mode: GroupingMode,
    rows: &[ObjectRow],
    visible: &[usize],
) -> Option<IndexMap<GroupKey, Vec<usize>>> {
    if mode == GroupingMode::None {
        return None;
    }
    let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
    for &idx in visible {
        let Some(key) = key_for(mode, &rows[idx]) else {
            continue;
        };
        groups.entry(key).or_default().push(idx);
    }
    Some(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events;
    use crate::host::SourceItem;
    use crate::projection::ProjectionArena;

    fn arena_with(items: &[SourceItem]) -> ProjectionArena {
        let (tx, _rx) = events::channel();
        let mut arena = ProjectionArena::new();
        arena.rebuild(items, &tx);
        arena
    }

    #[test]
    fn test_none_mode_is_flat() {
        let items = [SourceItem::new("a", 0, 10, 1, "VideoItem")];
        let arena = arena_with(&items);
        assert!(group_rows(GroupingMode::None, arena.rows(), &[0]).is_none());
    }

    #[test]
    fn test_layer_grouping_first_seen_order() {
        let items = [
            SourceItem::new("a", 0, 10, 3, "VideoItem"),
            SourceItem::new("b", 0, 10, 1, "VideoItem"),
            SourceItem::new("c", 0, 10, 3, "VideoItem"),
        ];
        let arena = arena_with(&items);
        let groups = group_rows(GroupingMode::Layer, arena.rows(), &[0, 1, 2]).unwrap();

        let keys: Vec<GroupKey> = groups.keys().copied().collect();
        assert_eq!(keys, vec![GroupKey::Layer(3), GroupKey::Layer(1)]);
        assert_eq!(groups[&GroupKey::Layer(3)], vec![0, 2]);
        assert_eq!(groups[&GroupKey::Layer(1)], vec![1]);
    }

    #[test]
    fn test_category_grouping_bins_unknown_as_other() {
        let items = [
            SourceItem::new("a", 0, 10, 1, "VoiceItem"),
            SourceItem::new("b", 0, 10, 1, "MysteryItem"),
        ];
        let arena = arena_with(&items);
        let groups = group_rows(GroupingMode::Category, arena.rows(), &[0, 1]).unwrap();

        assert!(groups.contains_key(&GroupKey::Category(Some(ItemCategory::Voice))));
        let other = &groups[&GroupKey::Category(None)];
        assert_eq!(other, &vec![1]);
        assert_eq!(GroupKey::Category(None).display_name(), "Other");
    }

    #[test]
    fn test_locked_grouping_uses_state_labels() {
        let items = [
            SourceItem::new("a", 0, 10, 1, "VideoItem"),
            SourceItem::new("b", 0, 10, 1, "VideoItem"),
        ];
        items[1].set_locked(true);
        let arena = arena_with(&items);
        let groups = group_rows(GroupingMode::IsLocked, arena.rows(), &[0, 1]).unwrap();

        assert_eq!(groups[&GroupKey::Flag("🔓 Unlock")], vec![0]);
        assert_eq!(groups[&GroupKey::Flag("🔒 Lock")], vec![1]);
    }

    #[test]
    fn test_grouping_respects_visible_subset() {
        let items = [
            SourceItem::new("a", 0, 10, 1, "VideoItem"),
            SourceItem::new("b", 0, 10, 2, "VideoItem"),
            SourceItem::new("c", 0, 10, 1, "VideoItem"),
        ];
        let arena = arena_with(&items);
        // Row 1 filtered out
        let groups = group_rows(GroupingMode::Layer, arena.rows(), &[0, 2]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&GroupKey::Layer(1)], vec![0, 2]);
    }

    #[test]
    fn test_affected_by_matches_active_mode_only() {
        assert!(GroupingMode::IsLocked.affected_by(ItemField::IsLocked));
        assert!(!GroupingMode::IsLocked.affected_by(ItemField::IsHidden));
        assert!(!GroupingMode::None.affected_by(ItemField::IsLocked));
        assert!(GroupingMode::Group.affected_by(ItemField::Group));
    }

    #[test]
    fn test_group_display_names() {
        assert_eq!(GroupKey::Layer(2).display_name(), "Layer 2");
        assert_eq!(GroupKey::Group(0).display_name(), "No group");
        assert_eq!(GroupKey::Group(4).display_name(), "Group 4");
    }
}

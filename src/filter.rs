//! Filter predicates over timeline items.
//!
//! The visible list is the AND of four independent predicates: search text,
//! seek-bar position, frame range and category. Each predicate is pure over
//! an [`ItemSnapshot`], so the whole pipeline is testable without any host
//! plumbing behind it.

use serde::{Deserialize, Serialize};

use crate::category::{CategoryFilterSet, ItemCategory};

/// Top-level filter mode. At most one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// No positional filtering
    #[default]
    All,
    /// Only items under the seek bar (playhead)
    UnderSeekBar,
    /// Only items intersecting a user-specified frame range
    Range,
}

impl FilterMode {
    pub const ALL_MODES: [FilterMode; 3] =
        [FilterMode::All, FilterMode::UnderSeekBar, FilterMode::Range];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::UnderSeekBar => "under_seek_bar",
            FilterMode::Range => "range",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(FilterMode::All),
            "under_seek_bar" => Some(FilterMode::UnderSeekBar),
            "range" => Some(FilterMode::Range),
            _ => None,
        }
    }
}

impl Serialize for FilterMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FilterMode {
    /// Lenient: an unrecognized stored value falls back to the default
    /// instead of failing the whole settings load.
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FilterMode::from_str(&raw).unwrap_or_else(|| {
            log::warn!("unknown filter mode '{}', using default", raw);
            FilterMode::default()
        }))
    }
}

/// How the range filter decides whether an item is "in" the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeSubMode {
    /// Item must lie entirely within the range
    #[default]
    Strict,
    /// Any overlap with the range counts
    Overlap,
}

impl RangeSubMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeSubMode::Strict => "strict",
            RangeSubMode::Overlap => "overlap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(RangeSubMode::Strict),
            "overlap" => Some(RangeSubMode::Overlap),
            _ => None,
        }
    }

    pub fn complement(self) -> Self {
        match self {
            RangeSubMode::Strict => RangeSubMode::Overlap,
            RangeSubMode::Overlap => RangeSubMode::Strict,
        }
    }
}

impl Serialize for RangeSubMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RangeSubMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RangeSubMode::from_str(&raw).unwrap_or_else(|| {
            log::warn!("unknown range sub-mode '{}', using default", raw);
            RangeSubMode::default()
        }))
    }
}

/// User-entered frame range for the range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self { start: 0, end: 0 }
    }
}

impl FrameRange {
    /// Advisory validity indicator for the input fields. An empty or
    /// inverted range is flagged but filtering still runs the raw
    /// comparisons against it.
    pub fn is_invalid(&self) -> bool {
        self.start >= self.end
    }
}

/// Plain-data view of one timeline item, enough to evaluate every predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub label: String,
    /// First frame occupied by the item
    pub frame: i64,
    /// Number of frames occupied; item covers [frame, frame + length]
    pub length: i64,
    /// Raw category tag from the host, possibly empty or unknown
    pub raw_category: String,
}

impl ItemSnapshot {
    fn end_frame(&self) -> i64 {
        self.frame + self.length
    }
}

/// The full filter state, evaluated as a conjunction.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub search_text: String,
    pub mode: FilterMode,
    pub range_sub_mode: RangeSubMode,
    /// Playhead position, used by [`FilterMode::UnderSeekBar`]
    pub current_frame: i64,
    pub range: FrameRange,
    pub categories: CategoryFilterSet,
}

impl FilterCriteria {
    /// Does the item pass every active predicate?
    pub fn matches(&self, item: &ItemSnapshot) -> bool {
        self.matches_search(item)
            && self.matches_position(item)
            && self.matches_category(item)
    }

    /// Case-insensitive substring match against the item label.
    /// Empty search text matches everything.
    fn matches_search(&self, item: &ItemSnapshot) -> bool {
        if self.search_text.is_empty() {
            return true;
        }
        item.label
            .to_lowercase()
            .contains(&self.search_text.to_lowercase())
    }

    fn matches_position(&self, item: &ItemSnapshot) -> bool {
        match self.mode {
            FilterMode::All => true,
            // Inclusive on both ends so an item ending exactly at the
            // playhead still shows while scrubbing past its tail.
            FilterMode::UnderSeekBar => {
                item.frame <= self.current_frame && self.current_frame <= item.end_frame()
            }
            FilterMode::Range => {
                match self.range_sub_mode {
                    RangeSubMode::Strict => {
                        self.range.start <= item.frame && item.end_frame() <= self.range.end
                    }
                    // Half-open intersection test: zero-width touching at a
                    // boundary does not count as overlap.
                    RangeSubMode::Overlap => {
                        self.range.start < item.end_frame() && item.frame < self.range.end
                    }
                }
            }
        }
    }

    /// Closed-set category check. An item with an empty or unknown tag never
    /// matches when the category filter is consulted.
    fn matches_category(&self, item: &ItemSnapshot) -> bool {
        match ItemCategory::from_raw(&item.raw_category) {
            Some(cat) => self.categories.is_enabled(cat),
            None => {
                if item.raw_category.is_empty() {
                    log::trace!("item '{}' has no category tag", item.label);
                } else {
                    log::debug!(
                        "item '{}' has unknown category tag '{}'",
                        item.label,
                        item.raw_category
                    );
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str, frame: i64, length: i64) -> ItemSnapshot {
        ItemSnapshot {
            label: label.to_string(),
            frame,
            length,
            raw_category: "VideoItem".to_string(),
        }
    }

    #[test]
    fn test_empty_search_matches_all() {
        let crit = FilterCriteria::default();
        assert!(crit.matches(&item("anything", 0, 10)));
    }

    #[test]
    fn test_search_case_insensitive_substring() {
        let mut crit = FilterCriteria::default();
        crit.search_text = "INTRO".to_string();
        assert!(crit.matches(&item("my intro clip", 0, 10)));
        assert!(!crit.matches(&item("outro", 0, 10)));
    }

    #[test]
    fn test_seek_bar_inclusive_both_ends() {
        let mut crit = FilterCriteria::default();
        crit.mode = FilterMode::UnderSeekBar;
        let it = item("clip", 10, 5); // covers [10, 15]

        crit.current_frame = 10;
        assert!(crit.matches(&it), "start frame is inclusive");
        crit.current_frame = 15;
        assert!(crit.matches(&it), "end frame is inclusive");
        crit.current_frame = 9;
        assert!(!crit.matches(&it));
        crit.current_frame = 16;
        assert!(!crit.matches(&it));
    }

    #[test]
    fn test_range_strict_requires_full_containment() {
        let mut crit = FilterCriteria::default();
        crit.mode = FilterMode::Range;
        crit.range_sub_mode = RangeSubMode::Strict;
        crit.range = FrameRange { start: 10, end: 20 };

        assert!(crit.matches(&item("inside", 12, 5))); // [12, 17]
        assert!(crit.matches(&item("exact", 10, 10))); // [10, 20]
        assert!(!crit.matches(&item("head out", 8, 5))); // [8, 13]
        assert!(!crit.matches(&item("tail out", 15, 10))); // [15, 25]
    }

    #[test]
    fn test_range_overlap_half_open() {
        let mut crit = FilterCriteria::default();
        crit.mode = FilterMode::Range;
        crit.range_sub_mode = RangeSubMode::Overlap;
        crit.range = FrameRange { start: 10, end: 20 };

        assert!(crit.matches(&item("partial", 8, 5))); // [8, 13]
        assert!(crit.matches(&item("spanning", 0, 100)));
        // Touching boundaries only: item ends exactly at range start
        assert!(!crit.matches(&item("ends at start", 5, 5))); // [5, 10]
        assert!(!crit.matches(&item("starts at end", 20, 5))); // [20, 25]
    }

    #[test]
    fn test_inverted_range_is_advisory_not_gating() {
        let mut crit = FilterCriteria::default();
        crit.mode = FilterMode::Range;
        crit.range = FrameRange { start: 20, end: 10 };
        assert!(crit.range.is_invalid());

        // Strict containment in an inverted range is unsatisfiable
        crit.range_sub_mode = RangeSubMode::Strict;
        assert!(!crit.matches(&item("any", 12, 2)));

        // Overlap still runs the raw comparisons: a spanning item satisfies
        // both inequalities even though the input is flagged invalid
        crit.range_sub_mode = RangeSubMode::Overlap;
        assert!(crit.matches(&item("spanning", 0, 100)));
        assert!(!crit.matches(&item("outside", 30, 5)));
    }

    #[test]
    fn test_empty_range_flagged_invalid() {
        let range = FrameRange { start: 5, end: 5 };
        assert!(range.is_invalid());
        let range = FrameRange { start: 5, end: 6 };
        assert!(!range.is_invalid());
    }

    #[test]
    fn test_category_disabled_hides_item() {
        let mut crit = FilterCriteria::default();
        crit.categories.set_enabled(ItemCategory::Video, false);
        assert!(!crit.matches(&item("video clip", 0, 10)));
    }

    #[test]
    fn test_unknown_category_never_matches() {
        let crit = FilterCriteria::default();
        let mut it = item("odd", 0, 10);
        it.raw_category = "WeirdItem".to_string();
        assert!(!crit.matches(&it));
        it.raw_category = String::new();
        assert!(!crit.matches(&it));
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let mut crit = FilterCriteria::default();
        crit.search_text = "clip".to_string();
        crit.mode = FilterMode::UnderSeekBar;
        crit.current_frame = 5;

        // Passes search, fails position
        assert!(!crit.matches(&item("clip far away", 100, 10)));
        // Passes position, fails search
        assert!(!crit.matches(&item("other", 0, 10)));
        // Passes both
        assert!(crit.matches(&item("my clip", 0, 10)));
    }

    #[test]
    fn test_mode_str_round_trip() {
        for mode in FilterMode::ALL_MODES {
            assert_eq!(FilterMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(FilterMode::from_str("bogus"), None);
    }

    #[test]
    fn test_lenient_mode_deserialize() {
        let mode: FilterMode = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(mode, FilterMode::All);
        let mode: FilterMode = serde_json::from_str("\"range\"").unwrap();
        assert_eq!(mode, FilterMode::Range);
    }
}

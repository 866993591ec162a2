//! Item categories: the closed set of timeline object kinds.
//!
//! The host tags every item with a raw type name string. Rather than compare
//! free-form strings all over the engine, the tag is parsed once into this
//! closed enum; the unknown-tag path is a single checked `None` arm.

use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Closed set of timeline item categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemCategory {
    Voice,
    Text,
    Audio,
    Video,
    Image,
    Shape,
    Tachie,
    TachieFace,
    Effect,
    Scene,
    Transition,
    FrameBuffer,
    Group,
}

impl ItemCategory {
    /// Every category, in display order.
    pub const ALL: [ItemCategory; 13] = [
        ItemCategory::Voice,
        ItemCategory::Text,
        ItemCategory::Audio,
        ItemCategory::Video,
        ItemCategory::Image,
        ItemCategory::Shape,
        ItemCategory::Tachie,
        ItemCategory::TachieFace,
        ItemCategory::Effect,
        ItemCategory::Transition,
        ItemCategory::Scene,
        ItemCategory::FrameBuffer,
        ItemCategory::Group,
    ];

    /// Parse the host's raw type-name tag. Empty or unknown tags are `None`;
    /// unclassified items never match the category filter.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "VoiceItem" => Some(ItemCategory::Voice),
            "TextItem" => Some(ItemCategory::Text),
            "AudioItem" => Some(ItemCategory::Audio),
            "VideoItem" => Some(ItemCategory::Video),
            "ImageItem" => Some(ItemCategory::Image),
            "ShapeItem" => Some(ItemCategory::Shape),
            "TachieItem" => Some(ItemCategory::Tachie),
            "TachieFaceItem" => Some(ItemCategory::TachieFace),
            "EffectItem" => Some(ItemCategory::Effect),
            "SceneItem" => Some(ItemCategory::Scene),
            "TransitionItem" => Some(ItemCategory::Transition),
            "FrameBufferItem" => Some(ItemCategory::FrameBuffer),
            "GroupItem" => Some(ItemCategory::Group),
            _ => None,
        }
    }

    /// The host's raw type-name tag for this category.
    pub fn raw_tag(self) -> &'static str {
        match self {
            ItemCategory::Voice => "VoiceItem",
            ItemCategory::Text => "TextItem",
            ItemCategory::Audio => "AudioItem",
            ItemCategory::Video => "VideoItem",
            ItemCategory::Image => "ImageItem",
            ItemCategory::Shape => "ShapeItem",
            ItemCategory::Tachie => "TachieItem",
            ItemCategory::TachieFace => "TachieFaceItem",
            ItemCategory::Effect => "EffectItem",
            ItemCategory::Scene => "SceneItem",
            ItemCategory::Transition => "TransitionItem",
            ItemCategory::FrameBuffer => "FrameBufferItem",
            ItemCategory::Group => "GroupItem",
        }
    }

    /// Human-readable group/column label.
    pub fn display_name(self) -> &'static str {
        match self {
            ItemCategory::Voice => "Voice",
            ItemCategory::Text => "Text",
            ItemCategory::Audio => "Audio",
            ItemCategory::Video => "Video",
            ItemCategory::Image => "Image",
            ItemCategory::Shape => "Shape",
            ItemCategory::Tachie => "Tachie",
            ItemCategory::TachieFace => "Tachie face",
            ItemCategory::Effect => "Effect",
            ItemCategory::Scene => "Scene",
            ItemCategory::Transition => "Transition",
            ItemCategory::FrameBuffer => "Frame buffer",
            ItemCategory::Group => "Group",
        }
    }

    /// Icon key for the view layer.
    pub fn icon_key(self) -> &'static str {
        match self {
            ItemCategory::Voice => "MessageTextOutline",
            ItemCategory::Text => "FormatText",
            ItemCategory::Audio => "Music",
            ItemCategory::Video => "Video",
            ItemCategory::Image => "Image",
            ItemCategory::Shape => "ShapePlus",
            ItemCategory::Tachie => "Account",
            ItemCategory::TachieFace => "EmoticonOutline",
            ItemCategory::Effect => "ImageAutoAdjust",
            ItemCategory::Scene => "ChartTimeline",
            ItemCategory::Transition => "GradientHorizontal",
            ItemCategory::FrameBuffer => "ImageMultiple",
            ItemCategory::Group => "SelectGroup",
        }
    }

    /// Key under which this category's filter flag is persisted.
    pub fn settings_key(self) -> &'static str {
        match self {
            ItemCategory::Voice => "voice",
            ItemCategory::Text => "text",
            ItemCategory::Audio => "audio",
            ItemCategory::Video => "video",
            ItemCategory::Image => "image",
            ItemCategory::Shape => "shape",
            ItemCategory::Tachie => "tachie",
            ItemCategory::TachieFace => "tachie_face",
            ItemCategory::Effect => "effect",
            ItemCategory::Scene => "scene",
            ItemCategory::Transition => "transition",
            ItemCategory::FrameBuffer => "frame_buffer",
            ItemCategory::Group => "group",
        }
    }

    fn from_settings_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|cat| cat.settings_key() == key)
    }
}

/// Per-category enabled flags for the category filter.
///
/// Defaults to all-enabled. An item matches the category filter iff its raw
/// tag parses to a category whose entry here is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilterSet {
    enabled: IndexMap<ItemCategory, bool>,
}

impl Default for CategoryFilterSet {
    fn default() -> Self {
        Self {
            enabled: ItemCategory::ALL.iter().map(|&cat| (cat, true)).collect(),
        }
    }
}

impl CategoryFilterSet {
    pub fn is_enabled(&self, category: ItemCategory) -> bool {
        self.enabled.get(&category).copied().unwrap_or(true)
    }

    pub fn set_enabled(&mut self, category: ItemCategory, enabled: bool) {
        self.enabled.insert(category, enabled);
    }

    /// True when at least one category is filtered out (filter is "active"
    /// from the user's point of view).
    pub fn any_disabled(&self) -> bool {
        self.enabled.values().any(|&on| !on)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemCategory, bool)> + '_ {
        self.enabled.iter().map(|(&cat, &on)| (cat, on))
    }
}

impl Serialize for CategoryFilterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.enabled.len()))?;
        for (cat, on) in &self.enabled {
            map.serialize_entry(cat.settings_key(), on)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryFilterSet {
    /// Lenient: unknown keys are skipped with a warning, missing categories
    /// default to enabled. A corrupt settings file can never disable the
    /// category filter wholesale.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = CategoryFilterSet;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of category keys to booleans")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut set = CategoryFilterSet::default();
                while let Some((key, on)) = access.next_entry::<String, bool>()? {
                    match ItemCategory::from_settings_key(&key) {
                        Some(cat) => set.set_enabled(cat, on),
                        None => log::warn!("ignoring unknown category filter key: {}", key),
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

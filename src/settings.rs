//! Persisted settings and the port the engine talks to them through.
//!
//! The engine never touches the filesystem directly; it owns a
//! [`SettingsPort`] and works on [`AppSettings`] values. The file-backed
//! port is deliberately lenient on load: enum fields it cannot recognize
//! fall back to defaults, and a load that had to coerce anything writes the
//! cleaned-up file straight back so the next load is exact.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::category::CategoryFilterSet;
use crate::filter::{FilterMode, FrameRange, RangeSubMode};
use crate::grouping::GroupingMode;
use crate::projection::LengthViewMode;

/// Which settings field changed, for change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    FilterMode,
    RangeSubMode,
    GroupingMode,
    Range,
    Categories,
    LengthView,
    ShowFooter,
    VersionSkip,
}

/// A host version (major, minor) the user chose to skip the compatibility
/// warning for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSkip {
    pub major: u64,
    pub minor: u64,
}

/// Everything the engine persists between sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub filter_mode: FilterMode,
    pub range_sub_mode: RangeSubMode,
    pub grouping_mode: GroupingMode,
    pub range: FrameRange,
    pub categories: CategoryFilterSet,
    pub length_view: LengthViewMode,
    pub show_footer: ShowFooter,
    pub skipped_version: Option<VersionSkip>,
}

/// Footer visibility, defaulting to shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowFooter(pub bool);

impl Default for ShowFooter {
    fn default() -> Self {
        ShowFooter(true)
    }
}

/// Diff two settings snapshots into the list of changed fields.
pub fn diff_settings(old: &AppSettings, new: &AppSettings) -> Vec<SettingsField> {
    let mut changed = Vec::new();
    if old.filter_mode != new.filter_mode {
        changed.push(SettingsField::FilterMode);
    }
    if old.range_sub_mode != new.range_sub_mode {
        changed.push(SettingsField::RangeSubMode);
    }
    if old.grouping_mode != new.grouping_mode {
        changed.push(SettingsField::GroupingMode);
    }
    if old.range != new.range {
        changed.push(SettingsField::Range);
    }
    if old.categories != new.categories {
        changed.push(SettingsField::Categories);
    }
    if old.length_view != new.length_view {
        changed.push(SettingsField::LengthView);
    }
    if old.show_footer != new.show_footer {
        changed.push(SettingsField::ShowFooter);
    }
    if old.skipped_version != new.skipped_version {
        changed.push(SettingsField::VersionSkip);
    }
    changed
}

/// Storage seam for settings. Injected into the engine so tests and the
/// simulator can swap in an in-memory port.
pub trait SettingsPort {
    fn load(&mut self) -> Result<AppSettings>;
    fn save(&mut self, settings: &AppSettings) -> Result<()>;
}

/// JSON file on disk.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsPort for FileSettings {
    fn load(&mut self) -> Result<AppSettings> {
        if !self.path.exists() {
            log::info!("no settings file at {:?}, using defaults", self.path);
            return Ok(AppSettings::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading settings {:?}", self.path))?;
        let settings: AppSettings = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("settings file unreadable ({}), using defaults", e);
                return Ok(AppSettings::default());
            }
        };

        // Lenient enum fields may have coerced values the file does not
        // reflect. Compare the canonical form against what was stored and
        // write back once if they differ.
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap_or_default();
        let canonical = serde_json::to_value(&settings)?;
        if stored != canonical {
            log::info!("settings were coerced on load, rewriting {:?}", self.path);
            self.save(&settings)?;
        }
        Ok(settings)
    }

    fn save(&mut self, settings: &AppSettings) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json).with_context(|| format!("writing settings {:?}", self.path))?;
        log::debug!("settings saved to {:?}", self.path);
        Ok(())
    }
}

/// In-memory port for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemorySettings {
    pub settings: AppSettings,
    pub save_count: usize,
}

impl MemorySettings {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            save_count: 0,
        }
    }
}

impl SettingsPort for MemorySettings {
    fn load(&mut self) -> Result<AppSettings> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &AppSettings) -> Result<()> {
        self.settings = settings.clone();
        self.save_count += 1;
        Ok(())
    }
}

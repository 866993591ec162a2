use clap::Parser;
use std::path::PathBuf;

/// Timeline object list engine (simulated host demo)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Initial search text
    #[arg(short = 's', long = "search", value_name = "TEXT")]
    pub search: Option<String>,

    /// Initial filter mode (all, under_seek_bar, range)
    #[arg(long = "filter", value_name = "MODE")]
    pub filter: Option<String>,

    /// Initial grouping (none, category, layer, group, is_locked, is_hidden)
    #[arg(short = 'g', long = "grouping", value_name = "MODE")]
    pub grouping: Option<String>,

    /// Frame range for the range filter
    #[arg(long = "range", value_names = ["START", "END"], num_args = 2)]
    pub range: Option<Vec<i64>>,

    /// Use overlap matching for the range filter instead of strict
    #[arg(long = "overlap")]
    pub overlap: bool,

    /// Playhead position for the seek-bar filter
    #[arg(long = "frame", value_name = "N")]
    pub frame: Option<i64>,

    /// Simulated host version
    #[arg(long = "host-version", value_name = "VER", default_value = "4.42.0")]
    pub host_version: String,

    /// Accept an unverified host version without prompting
    #[arg(long = "accept-version")]
    pub accept_version: bool,

    /// Switch to a second scene halfway through the run
    #[arg(long = "switch-scene")]
    pub switch_scene: bool,

    /// Number of engine ticks to run
    #[arg(short = 't', long = "ticks", value_name = "N", default_value = "40")]
    pub ticks: u32,

    /// Enable debug logging to file (default: objectlist.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

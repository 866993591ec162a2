use objectlist::cli::Args;
use objectlist::engine::{Engine, EngineState};
use objectlist::filter::FilterMode;
use objectlist::grouping::GroupingMode;
use objectlist::host::TimelineHost;
use objectlist::paths;
use objectlist::settings::FileSettings;
use objectlist::sim::{self, SimHost};
use objectlist::version::AppVersion;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info};
use std::time::Duration;

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = paths::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| paths::data_file("objectlist.log", &path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("creating log file {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    info!("Object list engine starting...");
    debug!("Command-line args: {:?}", args);

    let settings_path = paths::config_file("objectlist.json", &path_config);
    info!("Config path: {}", settings_path.display());

    let host_version: AppVersion = args
        .host_version
        .parse()
        .context("parsing --host-version")?;
    let host = SimHost::new(host_version);
    host.switch_scene(sim::demo_scene());

    let mut engine = Engine::new(host.clone(), Box::new(FileSettings::new(settings_path)))?;

    // First tick performs the gate check and activation
    engine.update()?;
    if engine.state() == EngineState::Blocked {
        if args.accept_version {
            engine.confirm_version()?;
            engine.update()?;
        } else {
            let gate = engine.version_gate();
            bail!(
                "host version {} is outside the verified range [{}, {}); \
                 rerun with --accept-version to continue anyway",
                host.app_version(),
                gate.older_verified,
                gate.yet_verified
            );
        }
    }

    // Apply CLI options as engine commands
    if let Some(ref text) = args.search {
        engine.set_search_text(text);
    }
    if let Some(ref mode) = args.filter {
        match FilterMode::from_str(mode) {
            Some(mode) => engine.set_filter_mode(mode)?,
            None => bail!("unknown filter mode '{}'", mode),
        }
    }
    if let Some(ref mode) = args.grouping {
        match GroupingMode::from_str(mode) {
            Some(mode) => engine.set_grouping(mode)?,
            None => bail!("unknown grouping mode '{}'", mode),
        }
    }
    if let Some(ref range) = args.range {
        engine.set_range_start(range[0])?;
        engine.set_range_end(range[1])?;
    }
    if args.overlap {
        engine.set_range_sub_mode(objectlist::filter::RangeSubMode::Overlap)?;
    }
    if let Some(frame) = args.frame {
        if let Some(tl) = host.try_get_timeline() {
            tl.set_current_frame(frame);
        }
    }

    // Run the engine loop, optionally swapping scenes halfway
    for tick in 0..args.ticks {
        if args.switch_scene && tick == args.ticks / 2 {
            info!("switching scene");
            host.switch_scene(sim::alternate_scene());
        }
        engine.update()?;
        std::thread::sleep(Duration::from_millis(25));
    }

    print_view(&engine);
    info!("Done");
    Ok(())
}

/// Render the engine's current view state to stdout.
fn print_view(engine: &Engine<SimHost>) {
    let scene = engine.scene_info();
    println!(
        "── {} ── {}x{} @ {:.3} fps, {} Hz, {} frames",
        scene.name, scene.width, scene.height, scene.fps, scene.hz, scene.length
    );
    println!(
        "filter: {} | grouping: {} | search: {:?}",
        engine.filter_mode().as_str(),
        engine.grouping_mode().as_str(),
        engine.search_text()
    );

    let rows = engine.rows();
    match engine.grouped_rows() {
        Some(groups) => {
            for (key, indices) in groups {
                println!("[{}]", key.display_name());
                for &idx in indices {
                    print_row(&rows[idx], engine);
                }
            }
        }
        None => {
            for row in engine.visible_rows() {
                print_row(row, engine);
            }
        }
    }

    if engine.show_footer() {
        println!(
            "{} of {} items visible, max layer {}",
            engine.visible_count(),
            engine.row_count(),
            scene.max_layer
        );
    }
}

fn print_row(row: &objectlist::ObjectRow, engine: &Engine<SimHost>) {
    println!(
        "  {:<20} {:>6} +{:<8} L{:<3} {:<3} {:<9} [{}]",
        row.label(),
        row.frame(),
        row.length_display(engine.length_view(), engine.scene_info().fps),
        row.layer(),
        row.hidden_label(),
        row.locked_label(),
        row.icon_key()
    );
}

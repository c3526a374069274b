//! sarglotd - sysstat collector daemon.
//!
//! Samples system activity with `sadc` at a fixed cadence, extracts metrics
//! with `sadf` and writes them as JSON lines to stdout or a file.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use sarglot::collector::SystemRunner;
use sarglot::collector::sysstat::{DeviceTags, SysstatCollector};
use sarglot::config::{SysstatConfig, default_options};
use sarglot::sink::JsonLinesSink;
use sarglot::util::{find_sadc, format_duration};

/// Sysstat collector daemon.
#[derive(Parser)]
#[command(name = "sarglotd", about = "Sysstat collector daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Path to the sadc collector. Searched in the usual locations if omitted.
    #[arg(long, value_name = "PATH")]
    sadc_path: Option<PathBuf>,

    /// Path to sadf. Searched in PATH if omitted.
    #[arg(long, value_name = "PATH")]
    sadf_path: Option<PathBuf>,

    /// Activity passed to sadc as -S <ACTIVITY> (repeatable). Default: DISK.
    #[arg(short = 'S', long = "activity", value_name = "ACTIVITY")]
    activities: Vec<String>,

    /// sadf option and its description, e.g. "-n ALL=network" (repeatable).
    /// Replaces the stock option table.
    #[arg(
        long = "option",
        value_name = "FLAGS=DESCRIPTION",
        value_parser = parse_option,
        allow_hyphen_values = true
    )]
    options: Vec<(String, String)>,

    /// Group the fields of one device into a single measurement.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    group: bool,

    /// Extra tags for a device, e.g. "sda:vg=rootvg,tier=ssd" (repeatable).
    /// Later flags for the same device override earlier keys.
    #[arg(
        long = "device-tag",
        value_name = "DEVICE:KEY=VALUE[,KEY=VALUE]",
        value_parser = parse_device_tag
    )]
    device_tags: Vec<(String, Vec<(String, String)>)>,

    /// Directory for temporary capture files.
    #[arg(long, value_name = "DIR")]
    tmp_dir: Option<PathBuf>,

    /// Write metrics to this file (appending) instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses `FLAGS=DESCRIPTION`.
fn parse_option(s: &str) -> Result<(String, String), String> {
    let (flags, description) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FLAGS=DESCRIPTION, got '{}'", s))?;
    let flags = flags.trim();
    let description = description.trim();
    if flags.is_empty() || description.is_empty() {
        return Err(format!("empty flags or description in '{}'", s));
    }
    Ok((flags.to_string(), description.to_string()))
}

/// Parses `DEVICE:KEY=VALUE[,KEY=VALUE...]`.
fn parse_device_tag(s: &str) -> Result<(String, Vec<(String, String)>), String> {
    let (device, pairs) = s
        .split_once(':')
        .ok_or_else(|| format!("expected DEVICE:KEY=VALUE, got '{}'", s))?;
    if device.is_empty() {
        return Err(format!("empty device in '{}'", s));
    }

    let mut tags = Vec::new();
    for pair in pairs.split(',') {
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", pair))?;
        if k.is_empty() {
            return Err(format!("empty tag name in '{}'", s));
        }
        tags.push((k.to_string(), v.to_string()));
    }
    Ok((device.to_string(), tags))
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
///
/// Logs go to stderr so metrics can own stdout.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["sarglotd", "sarglot"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> SysstatConfig {
    let mut config = SysstatConfig::default();

    if let Some(path) = args.sadc_path.clone().or_else(find_sadc) {
        config.sadc_path = path;
    }
    if let Some(ref path) = args.sadf_path {
        config.sadf_path = path.clone();
    }
    if !args.activities.is_empty() {
        config.activities = args.activities.clone();
    }
    config.options = if args.options.is_empty() {
        default_options()
    } else {
        args.options.iter().cloned().collect()
    };
    config.group = args.group;

    let mut device_tags = DeviceTags::new();
    for (device, tags) in &args.device_tags {
        device_tags.add(device, tags.iter().cloned());
    }
    config.device_tags = device_tags;

    if let Some(ref dir) = args.tmp_dir {
        config.tmp_dir = dir.clone();
    }
    config
}

fn open_output(path: Option<&PathBuf>) -> std::io::Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = build_config(&args);
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        eprintln!("sarglotd: {}", e);
        std::process::exit(1);
    }

    info!("sarglotd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, sadc={}, sadf={}, activities={}, options={}, group={}",
        args.interval,
        config.sadc_path.display(),
        config.sadf_path.display(),
        config.activities.join(","),
        config.options.len(),
        config.group
    );
    for (option, description) in &config.options {
        debug!("Option '{}' -> {}", option, description);
    }

    let writer = match open_output(args.output.as_ref()) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to open output: {}", e);
            std::process::exit(1);
        }
    };
    let sink = JsonLinesSink::new(writer);

    let mut collector = SysstatCollector::new(SystemRunner::new(), config);
    let interval = Duration::from_secs(args.interval.max(1));

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut cycle_count: u64 = 0;
    let mut next_tick = Instant::now();

    while running.load(Ordering::SeqCst) {
        cycle_count += 1;
        let written_before = sink.written();

        match collector.run_cycle(&sink) {
            Ok(()) => {
                let timing = collector.last_timing().cloned().unwrap_or_default();
                info!(
                    "Cycle #{}: {} metrics from {} options in {} (capture {}s)",
                    cycle_count,
                    timing.metrics,
                    timing.workers,
                    format_duration(timing.total),
                    timing.collect_secs
                );
            }
            Err(e) => {
                for err in e.into_errors() {
                    error!("Cycle #{}: {}", cycle_count, err);
                }
            }
        }

        if let Err(e) = sink.flush() {
            warn!("Failed to flush output: {}", e);
        }
        debug!(
            "Wrote {} lines ({} failed so far)",
            sink.written() - written_before,
            sink.failed()
        );

        // Keep a fixed cadence; a cycle that overran starts the next at once.
        next_tick += interval;
        let now = Instant::now();
        if next_tick < now {
            next_tick = now;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        while running.load(Ordering::SeqCst) {
            let remaining = next_tick.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(sleep_interval));
        }
    }

    info!("Shutting down...");
    if let Err(e) = sink.flush() {
        warn!("Failed to flush output: {}", e);
    }
    info!("sarglotd stopped after {} cycles", cycle_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("-n ALL=network").unwrap(),
            ("-n ALL".to_string(), "network".to_string())
        );
        assert!(parse_option("-d").is_err());
        assert!(parse_option("=disk").is_err());
    }

    #[test]
    fn test_parse_device_tag() {
        let (device, tags) = parse_device_tag("sda:vg=rootvg,tier=ssd").unwrap();
        assert_eq!(device, "sda");
        assert_eq!(
            tags,
            [
                ("vg".to_string(), "rootvg".to_string()),
                ("tier".to_string(), "ssd".to_string())
            ]
        );
        assert!(parse_device_tag("sda").is_err());
        assert!(parse_device_tag("sda:vg").is_err());
        assert!(parse_device_tag(":vg=x").is_err());
    }

    #[test]
    fn test_build_config() {
        let args = Args::parse_from([
            "sarglotd",
            "--sadc-path",
            "/usr/lib/sa/sadc",
            "--sadf-path",
            "/usr/bin/sadf",
            "-S",
            "DISK",
            "-S",
            "SNMP",
            "--option",
            "-d=disk",
            "--group",
            "false",
            "--device-tag",
            "sda:vg=rootvg",
            "--device-tag",
            "sda:vg=datavg",
        ]);
        let config = build_config(&args);

        assert_eq!(config.activities, ["DISK", "SNMP"]);
        assert_eq!(config.options.len(), 1);
        assert!(!config.group);
        assert_eq!(config.device_tags.resolve(Some("sda"))["vg"], "datavg");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_build_config_defaults() {
        let args = Args::parse_from(["sarglotd", "--sadc-path", "/usr/lib/sa/sadc"]);
        let config = build_config(&args);

        assert_eq!(config.activities, ["DISK"]);
        assert_eq!(config.options, default_options());
        assert!(config.group);
    }
}

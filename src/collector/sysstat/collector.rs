//! Collection cycle controller.
//!
//! One cycle:
//!
//! 1. resolve the sampling interval;
//! 2. run `sadc` once to write a fresh temporary artifact;
//! 3. run one `sadf` extraction per configured option, concurrently;
//! 4. wait for every extraction;
//! 5. remove the artifact;
//! 6. report every failure of the cycle together.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::error::{CycleError, SysstatError};
use super::extract::{Extraction, extract};
use crate::collector::traits::{CommandRunner, command_line};
use crate::config::SysstatConfig;
use crate::sink::MetricSink;

/// Timing and volume of the last collection cycle.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CycleTiming {
    /// Total cycle time.
    pub total: Duration,
    /// Time spent in `sadc`, including the sampling window.
    pub capture: Duration,
    /// Time from the first extraction start until the last one finished.
    pub extraction: Duration,
    /// Time to remove the temporary artifact.
    pub cleanup: Duration,
    /// `sadc` sampling window in seconds.
    pub collect_secs: u64,
    /// Number of extractions started.
    pub workers: usize,
    /// Number of extractions that failed.
    pub failed_workers: usize,
    /// Measurements sent to the sink by successful extractions.
    pub metrics: usize,
}

/// State carried from one cycle to the next.
#[derive(Debug, Default)]
struct CycleState {
    /// Time of the first cycle.
    start: Option<Instant>,
    /// Learned collection interval in whole seconds.
    interval: Option<u64>,
    /// Artifact of the current (or last) cycle.
    artifact: Option<PathBuf>,
}

/// Builds the `sadc` arguments:
///
/// ```text
/// sadc -S <activity>... <collect_secs> 2 <artifact>
/// ```
pub fn sadc_args(activities: &[String], collect_secs: u64, artifact: &Path) -> Vec<String> {
    let mut args = Vec::with_capacity(activities.len() * 2 + 3);
    for activity in activities {
        args.push("-S".to_string());
        args.push(activity.clone());
    }
    args.push(collect_secs.to_string());
    args.push("2".to_string());
    args.push(artifact.display().to_string());
    args
}

/// Sysstat collector driving `sadc` and `sadf`.
///
/// Each call to [`SysstatCollector::run_cycle`] is one collection cycle. The
/// collector learns the cadence it is driven at from the time between its
/// first and second cycle, and samples for one second less than that.
pub struct SysstatCollector<R: CommandRunner> {
    runner: R,
    config: SysstatConfig,
    state: CycleState,
    /// Timing information from the last run_cycle call.
    last_timing: Option<CycleTiming>,
}

impl<R: CommandRunner> SysstatCollector<R> {
    /// Seconds reserved for running `sadf` after the capture window.
    const PARSE_INTERVAL: u64 = 1;

    /// Shortest capture window, also used while the interval is unknown.
    const MIN_COLLECT_SECS: u64 = 1;

    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `runner` - Command runner (real or mock)
    /// * `config` - Tool paths, activities and extraction options
    pub fn new(runner: R, config: SysstatConfig) -> Self {
        Self {
            runner,
            config,
            state: CycleState::default(),
            last_timing: None,
        }
    }

    pub fn config(&self) -> &SysstatConfig {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next cycle; the
    /// learned interval is kept.
    pub fn set_config(&mut self, config: SysstatConfig) {
        self.config = config;
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns the learned interval, `None` until it is known.
    pub fn interval(&self) -> Option<Duration> {
        self.state.interval.map(Duration::from_secs)
    }

    /// Returns timing information from the last run_cycle call.
    pub fn last_timing(&self) -> Option<&CycleTiming> {
        self.last_timing.as_ref()
    }

    /// Path of the artifact used by the last cycle. It no longer exists once
    /// the cycle has returned.
    pub fn last_artifact(&self) -> Option<&Path> {
        self.state.artifact.as_deref()
    }

    /// Resolves the interval (in seconds) for a cycle starting at `now`.
    ///
    /// The first cycle records the start reference and returns 0. Later
    /// cycles learn the whole seconds elapsed since the start reference;
    /// once non-zero that value is kept for good.
    fn resolve_interval(&mut self, now: Instant) -> u64 {
        if let Some(interval) = self.state.interval {
            return interval;
        }
        let Some(start) = self.state.start else {
            self.state.start = Some(now);
            return 0;
        };

        let secs = now.saturating_duration_since(start).as_secs();
        if secs > 0 {
            info!("Learned collection interval: {}s", secs);
            self.state.interval = Some(secs);
        }
        secs
    }

    /// Length of the `sadc` sampling window for a given interval.
    fn collect_secs(interval: u64) -> u64 {
        interval
            .saturating_sub(Self::PARSE_INTERVAL)
            .max(Self::MIN_COLLECT_SECS)
    }

    /// Runs one collection cycle, sending every measurement to `sink`.
    ///
    /// Returns `Ok(())` only if the capture, every extraction and the
    /// cleanup succeeded. A capture failure skips extraction entirely;
    /// extraction failures never stop sibling extractions. The temporary
    /// artifact is removed before this returns in every case.
    pub fn run_cycle(&mut self, sink: &dyn MetricSink) -> Result<(), CycleError> {
        let total_start = Instant::now();
        let mut timing = CycleTiming::default();

        let interval = self.resolve_interval(total_start);
        timing.collect_secs = Self::collect_secs(interval);
        let timestamp = Utc::now() + TimeDelta::seconds(interval as i64);

        let dir = match tempfile::Builder::new()
            .prefix("sysstat-")
            .tempdir_in(&self.config.tmp_dir)
        {
            Ok(dir) => dir,
            Err(source) => {
                let error = SysstatError::ArtifactDir {
                    dir: self.config.tmp_dir.clone(),
                    source,
                };
                warn!("{}", error);
                self.state.artifact = None;
                self.last_timing = Some(timing);
                return Err(error.into());
            }
        };
        let artifact = dir
            .path()
            .join(format!("sysstat-{}", Utc::now().timestamp()));
        self.state.artifact = Some(artifact.clone());

        let mut errors = Vec::new();

        let start = Instant::now();
        let captured = self.capture(&artifact, timing.collect_secs);
        timing.capture = start.elapsed();

        match captured {
            Ok(()) => {
                let start = Instant::now();
                let report = self.extract_all(&artifact, Some(timestamp), sink);
                timing.extraction = start.elapsed();
                timing.workers = report.workers;
                timing.failed_workers = report.errors.len();
                timing.metrics = report.metrics;
                errors.extend(report.errors);
            }
            Err(e) => {
                warn!("{}", e);
                errors.push(e);
            }
        }

        let start = Instant::now();
        errors.extend(Self::cleanup(dir, &artifact));
        timing.cleanup = start.elapsed();

        timing.total = total_start.elapsed();
        debug!(
            "Cycle finished in {:?}: {} workers, {} failed, {} metrics",
            timing.total, timing.workers, timing.failed_workers, timing.metrics
        );
        self.last_timing = Some(timing);

        match CycleError::from_errors(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Runs `sadc` to write the artifact.
    fn capture(&self, artifact: &Path, collect_secs: u64) -> Result<(), SysstatError> {
        let sadc = &self.config.sadc_path;
        let args = sadc_args(&self.config.activities, collect_secs, artifact);
        let command = command_line(sadc, &args);
        debug!("Running {}", command);

        let output = self
            .runner
            .output(sadc, &args)
            .map_err(|source| SysstatError::CaptureIo {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SysstatError::Capture {
                command,
                output: output.combined_text(),
            });
        }
        if !artifact.exists() {
            return Err(SysstatError::CaptureIo {
                command,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} was not created", artifact.display()),
                ),
            });
        }
        Ok(())
    }

    /// Runs one extraction per configured option and waits for all of them.
    fn extract_all(
        &self,
        artifact: &Path,
        timestamp: Option<DateTime<Utc>>,
        sink: &dyn MetricSink,
    ) -> ExtractionReport {
        let sadf = self.config.sadf_path.as_path();
        let runner = &self.runner;

        let results: Vec<(&str, thread::Result<Result<usize, SysstatError>>)> =
            thread::scope(|s| {
                let handles: Vec<_> = self
                    .config
                    .options
                    .iter()
                    .map(|(option, description)| {
                        let job = Extraction {
                            option,
                            description,
                            group: self.config.group,
                            device_tags: &self.config.device_tags,
                            artifact,
                            timestamp,
                        };
                        let handle = s.spawn(move || extract(runner, sadf, &job, sink));
                        (description.as_str(), handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(description, handle)| (description, handle.join()))
                    .collect()
            });

        let mut report = ExtractionReport {
            workers: results.len(),
            ..ExtractionReport::default()
        };
        for (description, result) in results {
            match result {
                Ok(Ok(n)) => report.metrics += n,
                Ok(Err(e)) => {
                    warn!("{}: {}", description, e);
                    report.errors.push(e);
                }
                Err(_) => {
                    warn!("{}: extraction panicked", description);
                    report.errors.push(SysstatError::WorkerPanicked {
                        option: description.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Removes the artifact and its private directory.
    fn cleanup(dir: TempDir, artifact: &Path) -> Vec<SysstatError> {
        let mut errors = Vec::new();

        if artifact.symlink_metadata().is_ok()
            && let Err(source) = std::fs::remove_file(artifact)
        {
            errors.push(SysstatError::Cleanup {
                path: artifact.to_path_buf(),
                source,
            });
        }

        let dir_path = dir.path().to_path_buf();
        if let Err(source) = dir.close() {
            errors.push(SysstatError::Cleanup {
                path: dir_path,
                source,
            });
        }

        for e in &errors {
            warn!("{}", e);
        }
        errors
    }
}

#[derive(Debug, Default)]
struct ExtractionReport {
    workers: usize,
    metrics: usize,
    errors: Vec<SysstatError>,
}

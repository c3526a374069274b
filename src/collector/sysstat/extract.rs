//! Extraction of one metric family from a capture artifact with `sadf`.

use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::error::SysstatError;
use super::parser::parse_record;
use super::shaper::OutputShaper;
use super::tags::DeviceTags;
use crate::collector::traits::{CommandRunner, RunningCommand, command_line};
use crate::sink::MetricSink;

/// Fixed leading arguments: database-friendly output of the `sar` options
/// that follow.
const SADF_PREFIX: [&str; 3] = ["-p", "--", "-p"];

/// Builds the `sadf` arguments for one option:
///
/// ```text
/// sadf -p -- -p <option tokens...> <artifact>
/// ```
///
/// An option such as `"-n ALL"` is split on spaces into separate arguments.
pub fn sadf_args(option: &str, artifact: &Path) -> Vec<String> {
    SADF_PREFIX
        .iter()
        .map(|s| s.to_string())
        .chain(option.split_whitespace().map(str::to_string))
        .chain(std::iter::once(artifact.display().to_string()))
        .collect()
}

/// One extraction request within a cycle.
#[derive(Debug, Clone, Copy)]
pub struct Extraction<'a> {
    /// `sar` option token(s), e.g. `"-d"` or `"-n ALL"`.
    pub option: &'a str,
    /// Measurement name (grouped) or prefix (ungrouped).
    pub description: &'a str,
    pub group: bool,
    pub device_tags: &'a DeviceTags,
    pub artifact: &'a Path,
    /// Timestamp attached to every emitted measurement.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Runs `sadf` for one option and streams its records into `sink`.
///
/// Returns the number of measurements emitted. The first malformed record
/// stops the extraction; measurements already emitted in ungrouped mode stay
/// in the sink. A non-zero exit after the whole stream was read is reported
/// after grouped measurements have been flushed.
pub fn extract<R: CommandRunner + ?Sized>(
    runner: &R,
    sadf: &Path,
    job: &Extraction<'_>,
    sink: &dyn MetricSink,
) -> Result<usize, SysstatError> {
    let args = sadf_args(job.option, job.artifact);
    let command = command_line(sadf, &args);
    debug!("Running {}", command);

    let mut child = runner
        .spawn(sadf, &args)
        .map_err(|source| SysstatError::Transport {
            command: command.clone(),
            source,
        })?;

    let Some(stdout) = child.take_stdout() else {
        abandon(child.as_mut());
        return Err(SysstatError::Transport {
            command,
            source: std::io::Error::other("stdout not captured"),
        });
    };

    let mut shaper = OutputShaper::new(
        job.description,
        job.group,
        job.device_tags,
        job.timestamp,
        sink,
    );

    for (idx, line) in BufReader::new(stdout).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(source) => {
                abandon(child.as_mut());
                return Err(SysstatError::Transport { command, source });
            }
        };
        if line.is_empty() {
            continue;
        }
        trace!("{}: {}", job.description, line);

        match parse_record(&line) {
            Ok(record) => shaper.push(record),
            Err(source) => {
                abandon(child.as_mut());
                return Err(SysstatError::Parse {
                    command,
                    line: idx + 1,
                    source,
                });
            }
        }
    }

    let emitted = shaper.finish();

    let status = child
        .wait()
        .map_err(|source| SysstatError::Transport {
            command: command.clone(),
            source,
        })?;
    if !status.success() {
        return Err(SysstatError::Exit { command, status });
    }

    debug!("{}: {} measurements", job.description, emitted);
    Ok(emitted)
}

/// Stops a command whose output is no longer read and reaps it.
fn abandon(child: &mut dyn RunningCommand) {
    if let Err(e) = child.kill() {
        debug!("Failed to kill sadf: {}", e);
    }
    if let Err(e) = child.wait() {
        debug!("Failed to reap sadf: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockRunner;
    use crate::sink::MemorySink;
    use std::path::PathBuf;

    const SADF: &str = "/usr/bin/sadf";

    fn job<'a>(
        option: &'a str,
        description: &'a str,
        group: bool,
        tags: &'a DeviceTags,
    ) -> Extraction<'a> {
        Extraction {
            option,
            description,
            group,
            device_tags: tags,
            artifact: Path::new("/tmp/sysstat-1"),
            timestamp: None,
        }
    }

    #[test]
    fn test_sadf_args() {
        let artifact = PathBuf::from("/tmp/sysstat-1");
        assert_eq!(
            sadf_args("-d", &artifact),
            ["-p", "--", "-p", "-d", "/tmp/sysstat-1"]
        );
        assert_eq!(
            sadf_args("-n ALL", &artifact),
            ["-p", "--", "-p", "-n", "ALL", "/tmp/sysstat-1"]
        );
    }

    #[test]
    fn test_extract_ungrouped() {
        let runner = MockRunner::new().with_extraction("-C", "h\t1\tts\t-\tcpu_idle\t97.3\n", 0);
        let sink = MemorySink::new();
        let tags = DeviceTags::new();

        let n = extract(&runner, Path::new(SADF), &job("-C", "cpu", false, &tags), &sink).unwrap();

        assert_eq!(n, 1);
        let metric = &sink.by_name("cpu_cpu_idle")[0];
        assert_eq!(metric.fields["value"], 97.3);
        assert!(metric.tags.is_empty());
        assert_eq!(
            runner.invocations()[0].args,
            ["-p", "--", "-p", "-C", "/tmp/sysstat-1"]
        );
    }

    #[test]
    fn test_extract_grouped_with_device_tags() {
        let runner = MockRunner::new().with_extraction("-d", MockRunner::SADF_DISK, 0);
        let sink = MemorySink::new();
        let mut tags = DeviceTags::new();
        tags.add("sda", [("vg", "rootvg")]);

        let n = extract(&runner, Path::new(SADF), &job("-d", "disk", true, &tags), &sink).unwrap();

        assert_eq!(n, 2);
        let disks = sink.by_name("disk");
        let sda = disks.iter().find(|m| m.tags["device"] == "sda").unwrap();
        assert_eq!(sda.tags["vg"], "rootvg");
        assert!(sda.fields.contains_key("pct_util"));
        assert!(sda.fields.contains_key("rkB_per_s"));
    }

    #[test]
    fn test_extract_parse_error_stops_stream() {
        let output = "h\t1\tts\t-\ta\t1\nh\t1\tts\t-\tb\tnot-a-number\nh\t1\tts\t-\tc\t3\n";
        let runner = MockRunner::new().with_extraction("-q", output, 0);
        let sink = MemorySink::new();
        let tags = DeviceTags::new();

        let err = extract(&runner, Path::new(SADF), &job("-q", "queue", false, &tags), &sink)
            .unwrap_err();

        assert!(matches!(err, SysstatError::Parse { line: 2, .. }));
        // Ungrouped output before the bad record is kept, nothing after it.
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.metrics()[0].name, "queue_a");
        assert_eq!(runner.killed(), 1);
    }

    #[test]
    fn test_extract_grouped_parse_error_emits_nothing() {
        let output = "h\t1\tts\t-\ta\t1\nh\t1\tts\t-\tb\n";
        let runner = MockRunner::new().with_extraction("-q", output, 0);
        let sink = MemorySink::new();
        let tags = DeviceTags::new();

        let err = extract(&runner, Path::new(SADF), &job("-q", "queue", true, &tags), &sink)
            .unwrap_err();

        assert!(err.to_string().contains("wrong number of fields"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_extract_non_zero_exit_keeps_output() {
        let runner = MockRunner::new().with_extraction("-r", MockRunner::SADF_MEMORY, 1);
        let sink = MemorySink::new();
        let tags = DeviceTags::new();

        let err = extract(&runner, Path::new(SADF), &job("-r", "mem_util", true, &tags), &sink)
            .unwrap_err();

        assert!(matches!(err, SysstatError::Exit { .. }));
        assert_eq!(
            err.to_string(),
            "command /usr/bin/sadf -p -- -p -r /tmp/sysstat-1 failed with exit status: 1"
        );
        // Grouped measurements are flushed before the exit status is checked.
        assert_eq!(sink.by_name("mem_util").len(), 1);
    }

    #[test]
    fn test_extract_spawn_failure() {
        let runner = MockRunner::new();
        let sink = MemorySink::new();
        let tags = DeviceTags::new();

        let err = extract(&runner, Path::new(SADF), &job("-w", "task", true, &tags), &sink)
            .unwrap_err();

        assert!(matches!(err, SysstatError::Transport { .. }));
        assert!(err.to_string().starts_with("running command '/usr/bin/sadf"));
    }

    #[test]
    fn test_extract_skips_blank_lines() {
        let runner = MockRunner::new().with_extraction("-w", "\nh\t1\tts\t-\tproc/s\t2.0\n\n", 0);
        let sink = MemorySink::new();
        let tags = DeviceTags::new();

        let n = extract(&runner, Path::new(SADF), &job("-w", "task", false, &tags), &sink).unwrap();

        assert_eq!(n, 1);
        assert_eq!(sink.metrics()[0].name, "task_proc_per_s");
    }
}

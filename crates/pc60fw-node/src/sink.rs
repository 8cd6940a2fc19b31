use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pc60fw_core::{CoreError, VitalsSample};
use thiserror::Error;
use tracing::info;

/// Errors returned by vitals sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open vitals log {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write vitals log: {0}")]
    Write(#[from] std::io::Error),
    #[error("invalid sample: {0}")]
    Sample(#[from] CoreError),
}

/// Destination for decoded vitals samples.
pub trait VitalsSink {
    fn record(&mut self, sample: &VitalsSample) -> Result<(), SinkError>;
}

/// Formats one durable log line: `<unix secs>\t<spo2>\t<pr>\t<pi>\n`.
pub fn format_tsv_line(sample: &VitalsSample) -> Result<String, SinkError> {
    Ok(format!(
        "{}\t{}\t{}\t{}\n",
        sample.unix_seconds()?,
        sample.spo2_percent,
        sample.pulse_rate_bpm,
        sample.perfusion_index
    ))
}

/// Append-only tab-separated vitals log, flushed after every sample.
#[derive(Debug)]
pub struct TsvFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TsvFileSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VitalsSink for TsvFileSink {
    fn record(&mut self, sample: &VitalsSample) -> Result<(), SinkError> {
        info!("{sample}");
        let line = format_tsv_line(sample)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects samples in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub samples: Vec<VitalsSample>,
}

impl VitalsSink for MemorySink {
    fn record(&mut self, sample: &VitalsSample) -> Result<(), SinkError> {
        self.samples.push(*sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc60fw_core::PerfusionIndex;
    use std::time::{Duration, UNIX_EPOCH};

    fn sample(secs: u64, spo2: u8, pr: u8, pi: u8) -> VitalsSample {
        VitalsSample::new(
            UNIX_EPOCH + Duration::from_secs(secs),
            spo2,
            pr,
            PerfusionIndex(pi),
        )
    }

    #[test]
    fn tsv_line_format() {
        assert_eq!(
            format_tsv_line(&sample(1_700_000_000, 98, 75, 10)).unwrap(),
            "1700000000\t98\t75\t1.0\n"
        );
        assert_eq!(
            format_tsv_line(&sample(5, 100, 180, 204)).unwrap(),
            "5\t100\t180\t20.4\n"
        );
    }

    #[test]
    fn file_sink_appends_and_flushes_each_sample() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pc60fw.log");
        std::fs::write(&path, "1\t90\t60\t0.5\n").expect("seed log");

        let mut sink = TsvFileSink::open(&path).expect("open sink");
        sink.record(&sample(2, 98, 75, 10)).expect("record");
        // Visible on disk before the sink is dropped.
        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "1\t90\t60\t0.5\n2\t98\t75\t1.0\n");

        sink.record(&sample(3, 97, 74, 9)).expect("record");
        let contents = std::fs::read_to_string(sink.path()).expect("read log");
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.ends_with("3\t97\t74\t0.9\n"));
    }

    #[test]
    fn open_failure_names_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("pc60fw.log");
        let err = TsvFileSink::open(&path).unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
        assert!(err.to_string().contains("pc60fw.log"));
    }
}

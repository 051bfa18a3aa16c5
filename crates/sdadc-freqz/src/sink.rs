//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use tracing::{debug, info};

use crate::errors::{FreqzError, Result};

pub const INPUT_FILE: &str = "adc_tb_0_input.csv";
pub const OUTPUT_FILE: &str = "adc_tb_1_output.csv";
pub const GAIN_FILE: &str = "adc_tb_2_gain.csv";
pub const PHASE_FILE: &str = "adc_tb_3_phase.csv";

const SAMPLE_HEADER: [&str; 2] = ["index", "voltage(V)"];
const GAIN_HEADER: [&str; 2] = ["frequency (Hz)", " Gain(dB)"];
const PHASE_HEADER: [&str; 2] = ["frequency (Hz)", " Phase(deg)"];

/// Destination of the series produced by a sweep. Records arrive in
/// measurement order and are never revisited.
pub trait ResultSink {
    fn record_input(&mut self, index: u64, volts: f64) -> Result<()>;

    fn record_output(&mut self, index: u64, volts: f64) -> Result<()>;

    fn record_gain(&mut self, frequency_hz: f64, gain_db: f64) -> Result<()>;

    fn record_phase(&mut self, frequency_hz: f64, phase_deg: f64) -> Result<()>;

    /// Flush whatever is buffered. Called once after the last point.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes every series to its own CSV file inside one directory.
#[derive(Debug)]
pub struct CsvResultSink {
    directory: PathBuf,
    input: Writer<File>,
    output: Writer<File>,
    gain: Writer<File>,
    phase: Option<Writer<File>>,
}

impl CsvResultSink {
    /// Create the directory if needed and start fresh series files, replacing
    /// any left over from a previous run. The phase file is only created when
    /// `emit_phase` is set.
    pub fn create(directory: impl AsRef<Path>, emit_phase: bool) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|source| FreqzError::Create {
            path: directory.clone(),
            source,
        })?;

        let input = open_series(&directory, INPUT_FILE, SAMPLE_HEADER)?;
        let output = open_series(&directory, OUTPUT_FILE, SAMPLE_HEADER)?;
        let gain = open_series(&directory, GAIN_FILE, GAIN_HEADER)?;
        let phase = if emit_phase {
            Some(open_series(&directory, PHASE_FILE, PHASE_HEADER)?)
        } else {
            None
        };

        info!(directory = %directory.display(), emit_phase, "result series opened");
        Ok(Self {
            directory,
            input,
            output,
            gain,
            phase,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ResultSink for CsvResultSink {
    fn record_input(&mut self, index: u64, volts: f64) -> Result<()> {
        self.input.serialize((index, volts))?;
        Ok(())
    }

    fn record_output(&mut self, index: u64, volts: f64) -> Result<()> {
        self.output.serialize((index, volts))?;
        Ok(())
    }

    fn record_gain(&mut self, frequency_hz: f64, gain_db: f64) -> Result<()> {
        self.gain.serialize((frequency_hz, gain_db))?;
        Ok(())
    }

    fn record_phase(&mut self, frequency_hz: f64, phase_deg: f64) -> Result<()> {
        if let Some(phase) = self.phase.as_mut() {
            phase.serialize((frequency_hz, phase_deg))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.input.flush()?;
        self.output.flush()?;
        self.gain.flush()?;
        if let Some(phase) = self.phase.as_mut() {
            phase.flush()?;
        }
        debug!(directory = %self.directory.display(), "result series flushed");
        Ok(())
    }
}

fn open_series(directory: &Path, name: &str, header: [&str; 2]) -> Result<Writer<File>> {
    let path = directory.join(name);
    let file = File::create(&path).map_err(|source| FreqzError::Create {
        path: path.clone(),
        source,
    })?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(header)?;
    Ok(writer)
}

/// Collects every series in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub inputs: Vec<(u64, f64)>,
    pub outputs: Vec<(u64, f64)>,
    pub gains: Vec<(f64, f64)>,
    pub phases: Vec<(f64, f64)>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn record_input(&mut self, index: u64, volts: f64) -> Result<()> {
        self.inputs.push((index, volts));
        Ok(())
    }

    fn record_output(&mut self, index: u64, volts: f64) -> Result<()> {
        self.outputs.push((index, volts));
        Ok(())
    }

    fn record_gain(&mut self, frequency_hz: f64, gain_db: f64) -> Result<()> {
        self.gains.push((frequency_hz, gain_db));
        Ok(())
    }

    fn record_phase(&mut self, frequency_hz: f64, phase_deg: f64) -> Result<()> {
        self.phases.push((frequency_hz, phase_deg));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn csv_sink_writes_headers_and_rows() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("tb_dumps");
        let mut sink = CsvResultSink::create(&out, true).unwrap();
        sink.record_input(0, 1.5).unwrap();
        sink.record_output(0, 1.25).unwrap();
        sink.record_gain(220.0, -0.5).unwrap();
        sink.record_phase(220.0, 12.0).unwrap();
        sink.finish().unwrap();

        let input = fs::read_to_string(out.join(INPUT_FILE)).unwrap();
        assert_eq!(input, "index,voltage(V)\n0,1.5\n");
        let output = fs::read_to_string(out.join(OUTPUT_FILE)).unwrap();
        assert_eq!(output, "index,voltage(V)\n0,1.25\n");
        let gain = fs::read_to_string(out.join(GAIN_FILE)).unwrap();
        assert_eq!(gain, "frequency (Hz), Gain(dB)\n220.0,-0.5\n");
        let phase = fs::read_to_string(out.join(PHASE_FILE)).unwrap();
        assert_eq!(phase, "frequency (Hz), Phase(deg)\n220.0,12.0\n");
    }

    #[test]
    fn csv_sink_starts_fresh_and_skips_phase_when_disabled() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(GAIN_FILE), "stale\n").unwrap();

        let mut sink = CsvResultSink::create(dir.path(), false).unwrap();
        sink.record_phase(1_000.0, 90.0).unwrap();
        sink.finish().unwrap();

        let gain = fs::read_to_string(dir.path().join(GAIN_FILE)).unwrap();
        assert_eq!(gain, "frequency (Hz), Gain(dB)\n");
        assert!(!dir.path().join(PHASE_FILE).exists());
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.record_gain(100.0, 0.0).unwrap();
        sink.record_gain(200.0, -1.0).unwrap();
        sink.record_input(3, 0.5).unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.gains, vec![(100.0, 0.0), (200.0, -1.0)]);
        assert_eq!(sink.inputs, vec![(3, 0.5)]);
        assert!(sink.finished);
    }
}

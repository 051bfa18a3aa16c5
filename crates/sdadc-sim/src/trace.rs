//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime helpers and device models."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sdadc_common::Polarity;
use tracing::debug;
use vcd::{IdCode, TimescaleUnit, Value, VarType};

use crate::device::DeviceUnderTest;
use crate::errors::{Result, SimError};

const SCOPE: &str = "sdadc_tb";

/// Value-change dump of the harness-visible pins.
///
/// Every call to [`dump`](Self::dump) writes one timestamp, numbered by the
/// count of dumps so far, followed by the current level of each pin.
pub struct WaveformTrace {
    path: PathBuf,
    writer: vcd::Writer<BufWriter<File>>,
    clk: IdCode,
    rst: IdCode,
    valid: IdCode,
    input: IdCode,
    unsigned_output: IdCode,
    signed_output: IdCode,
    events: u64,
}

impl WaveformTrace {
    /// Create (or truncate) the dump file and write its header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SimError::TraceOpen {
                path: path.clone(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| SimError::TraceOpen {
            path: path.clone(),
            source,
        })?;

        let mut writer = vcd::Writer::new(BufWriter::new(file));
        writer.timescale(1, TimescaleUnit::NS)?;
        writer.add_module(SCOPE)?;
        let clk = writer.add_wire(1, "clk")?;
        let rst = writer.add_wire(1, "rst")?;
        let valid = writer.add_wire(1, "adc_valid")?;
        let input = writer.add_var(VarType::Real, 64, "adc_input", None)?;
        let unsigned_output = writer.add_var(VarType::Real, 64, "adc_u_output", None)?;
        let signed_output = writer.add_var(VarType::Real, 64, "adc_s_output", None)?;
        writer.upscope()?;
        writer.enddefinitions()?;

        debug!(path = %path.display(), "waveform trace opened");
        Ok(Self {
            path,
            writer,
            clk,
            rst,
            valid,
            input,
            unsigned_output,
            signed_output,
            events: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of timestamps written so far.
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Record the device's current pin levels at the next timestamp.
    pub fn dump<D: DeviceUnderTest>(&mut self, device: &D) -> Result<()> {
        self.writer.timestamp(self.events)?;
        self.writer.change_scalar(self.clk, level(device.clock_high()))?;
        self.writer.change_scalar(self.rst, level(device.reset_asserted()))?;
        self.writer.change_scalar(self.valid, level(device.is_output_valid()))?;
        self.writer.change_real(self.input, device.driven_input())?;
        self.writer.change_real(
            self.unsigned_output,
            device.read_output(Polarity::Unsigned) as f64,
        )?;
        self.writer.change_real(
            self.signed_output,
            device.read_output(Polarity::Signed) as f64,
        )?;
        self.events += 1;
        Ok(())
    }

    /// Flush buffered changes to disk.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.writer().flush()?;
        debug!(path = %self.path.display(), events = self.events, "waveform trace closed");
        Ok(self.path)
    }
}

impl std::fmt::Debug for WaveformTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveformTrace")
            .field("path", &self.path)
            .field("events", &self.events)
            .finish()
    }
}

fn level(high: bool) -> Value {
    if high {
        Value::V1
    } else {
        Value::V0
    }
}

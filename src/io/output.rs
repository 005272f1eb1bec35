//! Logging setup and the stress-strain curve sink.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = StdSystemTime::now();
        let duration = now
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        // Format as HH:MM:SS (only seconds precision)
        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => {
            if let Ok(log) = File::create(path) {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            } else {
                eprintln!("Could not create output file: {}", path);
            }
        }
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
        }
    }
}

/// Receives the ordered (dphi-from-jamming, pressure) pairs produced by the
/// sweep above jamming.
pub trait CurveSink {
    fn record(&mut self, delta_phi: f64, pressure: f64) -> io::Result<()>;
}

/// In-memory sink; what the tests use.
impl CurveSink for Vec<(f64, f64)> {
    fn record(&mut self, delta_phi: f64, pressure: f64) -> io::Result<()> {
        self.push((delta_phi, pressure));
        Ok(())
    }
}

/// File-backed curve sink: the jamming-point value, a blank separator line,
/// then one `dphi pressure` row per record.
pub struct CurveFile {
    writer: BufWriter<File>,
}

impl CurveFile {
    pub fn create<P: AsRef<Path>>(path: P, phi_j: f64) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{:.12}", phi_j)?;
        writeln!(writer)?;
        Ok(CurveFile { writer })
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl CurveSink for CurveFile {
    fn record(&mut self, delta_phi: f64, pressure: f64) -> io::Result<()> {
        writeln!(self.writer, "{:.9e} {:.9e}", delta_phi, pressure)
    }
}

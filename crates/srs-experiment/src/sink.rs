//! Sample-sink backends.
//!
//! Sinks swallow their own I/O failures during the run and surface them via
//! `take_error` afterwards, so a full disk cannot abort a simulation that is
//! otherwise fine.

use std::io::Write;

use thiserror::Error;

use crate::driver::{Sample, SampleSink};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// ── MemorySink ────────────────────────────────────────────────────────────────

/// Keeps every sample in memory; used by tests and ad-hoc analysis.
#[derive(Default)]
pub struct MemorySink {
    pub samples: Vec<(u64, Sample)>,
}

impl SampleSink for MemorySink {
    fn emit(&mut self, step: u64, sample: &Sample) {
        self.samples.push((step, sample.clone()));
    }
}

// ── JsonLinesSink ─────────────────────────────────────────────────────────────

/// One sample record per line:
/// `{"candidates": {<name>: {<metric>: <value>, ...}, ...}}`.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    error: Option<SinkError>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<SinkError> {
        self.error.take()
    }

    fn try_emit(&mut self, sample: &Sample) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, sample)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> SampleSink for JsonLinesSink<W> {
    fn emit(&mut self, _step: u64, sample: &Sample) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.try_emit(sample) {
            self.error = Some(error);
        }
    }

    fn finish(&mut self) {
        if self.error.is_none() {
            if let Err(error) = self.writer.flush() {
                self.error = Some(error.into());
            }
        }
    }
}

// ── CsvSink ───────────────────────────────────────────────────────────────────

/// Long-format CSV: `step,candidate,metric,value` — one row per metric per
/// candidate per scrape.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    wrote_header: bool,
    error: Option<SinkError>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            wrote_header: false,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<SinkError> {
        self.error.take()
    }

    fn try_emit(&mut self, step: u64, sample: &Sample) -> Result<(), SinkError> {
        if !self.wrote_header {
            self.writer
                .write_record(["step", "candidate", "metric", "value"])?;
            self.wrote_header = true;
        }
        for (candidate, metrics) in &sample.candidates {
            for (metric, value) in metrics {
                self.writer.write_record([
                    step.to_string(),
                    candidate.clone(),
                    metric.clone(),
                    value.to_string(),
                ])?;
            }
        }
        Ok(())
    }
}

impl<W: Write> SampleSink for CsvSink<W> {
    fn emit(&mut self, step: u64, sample: &Sample) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.try_emit(step, sample) {
            self.error = Some(error);
        }
    }

    fn finish(&mut self) {
        if self.error.is_none() {
            if let Err(error) = self.writer.flush() {
                self.error = Some(SinkError::Io(error));
            }
        }
    }
}

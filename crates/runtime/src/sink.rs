//! Persistence-side consumers of scheduler updates.

use std::io::Write;

use anyhow::{Context, Result};

use crate::scheduler::FleetUpdate;

pub trait SnapshotSink {
    fn record(&mut self, update: &FleetUpdate) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per machine for every update marked for persistence.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    lines: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn record(&mut self, update: &FleetUpdate) -> Result<()> {
        if !update.persist {
            return Ok(());
        }
        for (id, snapshot) in &update.snapshot {
            serde_json::to_writer(&mut self.writer, snapshot)
                .with_context(|| format!("failed to encode snapshot for {id}"))?;
            self.writer.write_all(b"\n").context("failed to write snapshot line")?;
            self.lines += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush snapshot sink")
    }
}

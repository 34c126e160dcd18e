//! Export of collected statistics to a structured byte stream.

use renderbench_core::{Result, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// The document written when a trial's data is downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    /// ISO-8601 time the record was produced
    pub collected_at: String,
    pub stats: StatsSnapshot,
}

impl ExportRecord {
    /// Wrap `stats` with the current UTC time.
    pub fn new(stats: StatsSnapshot) -> Result<Self> {
        Self::at(OffsetDateTime::now_utc(), stats)
    }

    pub fn at(collected_at: OffsetDateTime, stats: StatsSnapshot) -> Result<Self> {
        Ok(Self {
            collected_at: collected_at.format(&Rfc3339)?,
            stats,
        })
    }

    /// Write the record as pretty-printed JSON.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut sink, self)?;
        sink.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Default file name for a downloaded record: `{profiler_id}-performance-{epoch_ms}.json`.
pub fn export_filename(profiler_id: &str) -> String {
    export_filename_at(profiler_id, OffsetDateTime::now_utc())
}

pub fn export_filename_at(profiler_id: &str, at: OffsetDateTime) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("{profiler_id}-performance-{millis}.json")
}

//! Export replay summaries for external tools

use crate::replay::Replay;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use meshfire_core::{ClientId, RoomConfig, Tick};
use serde::Serialize;
use std::io::Write;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// RON format (Rust Object Notation)
    Ron,
    /// JSON format (requires serde_json feature)
    Json,
    /// Human-readable text format
    Text,
}

/// Exporter for replay metadata and event statistics
pub struct Exporter<'a> {
    replay: &'a Replay,
}

impl<'a> Exporter<'a> {
    pub fn new(replay: &'a Replay) -> Self {
        Self { replay }
    }

    /// Export to a string in the specified format
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Ron => self.to_ron(),
            ExportFormat::Json => self.to_json(),
            ExportFormat::Text => Ok(self.to_text()),
        }
    }

    /// Export to a writer
    pub fn export_to<W: Write>(&self, writer: &mut W, format: ExportFormat) -> Result<()> {
        let content = self.export(format)?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| Error::ExportError(e.to_string()))?;
        Ok(())
    }

    pub fn to_ron(&self) -> Result<String> {
        let summary = ReplaySummary::from_replay(self.replay);
        ron::ser::to_string_pretty(&summary, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> Result<String> {
        let summary = ReplaySummary::from_replay(self.replay);
        serde_json::to_string_pretty(&summary).map_err(|e| Error::Serialization(e.to_string()))
    }

    #[cfg(not(feature = "serde_json"))]
    pub fn to_json(&self) -> Result<String> {
        Err(Error::ExportError(
            "JSON export requires the 'serde_json' feature".to_string(),
        ))
    }

    pub fn to_text(&self) -> String {
        let summary = ReplaySummary::from_replay(self.replay);
        let mut output = String::new();
        output.push_str("=== Replay ===\n\n");
        output.push_str(&format!("Build: {}\n", summary.build));
        output.push_str(&format!("Recorded: {}\n", summary.recorded_at.to_rfc3339()));
        output.push_str(&format!(
            "Ticks: {} - {}\n",
            summary.first_tick, summary.last_tick
        ));
        output.push_str(&format!("Events: {}\n", summary.event_count));

        output.push_str("\n=== Clients ===\n\n");
        for (client, count) in &summary.events_per_client {
            let name = summary
                .names
                .get(client)
                .map(String::as_str)
                .unwrap_or("?");
            output.push_str(&format!("{client:>4} {name:<16} {count} events\n"));
        }
        output
    }
}

#[derive(Debug, Clone, Serialize)]
struct ReplaySummary {
    build: String,
    recorded_at: DateTime<Utc>,
    room: RoomConfig,
    names: IndexMap<ClientId, String>,
    first_tick: Tick,
    last_tick: Tick,
    event_count: usize,
    events_per_client: IndexMap<ClientId, usize>,
}

impl ReplaySummary {
    fn from_replay(replay: &Replay) -> Self {
        let mut events_per_client: IndexMap<ClientId, usize> = replay
            .metadata
            .names
            .keys()
            .map(|&id| (id, 0))
            .collect();
        for event in &replay.events {
            *events_per_client.entry(event.client).or_default() += 1;
        }
        Self {
            build: replay.metadata.build.clone(),
            recorded_at: replay.metadata.recorded_at,
            room: replay.metadata.room.clone(),
            names: replay.metadata.names.clone(),
            first_tick: replay.first_tick(),
            last_tick: replay.last_tick(),
            event_count: replay.events.len(),
            events_per_client,
        }
    }
}

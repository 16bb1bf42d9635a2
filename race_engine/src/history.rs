use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::aggregate::AggregateResult;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub recorded_at_ms: i64,
    pub result: AggregateResult,
}

/// Results of past runs, owned by whoever hosts the engine.
///
/// Grows without bound; long-running hosts decide when to drop it.
#[derive(Debug, Default, Clone)]
pub struct RunHistory {
    entries: Vec<HistoryEntry>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: AggregateResult) -> &HistoryEntry {
        let recorded_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        self.entries.push(HistoryEntry { recorded_at_ms, result });
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn for_track<'a>(&'a self, track: &'a str) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.entries.iter().filter(move |e| e.result.track == track)
    }
}

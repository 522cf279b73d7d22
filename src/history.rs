//! Message history tracking for debugging and diagnostics.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Which way a message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Written to the light.
    Outbound,
    /// Received from the light and decoded.
    Inbound,
}

/// A recorded message in the history.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub kind: String,
    pub id: u8,
    /// Hex-encoded payload; absent for empty payloads.
    pub payload: Option<String>,
    /// Seconds since history creation
    pub timestamp: f64,
}

/// Tracks message history for debugging.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    counts: HashMap<Direction, HashMap<String, usize>>,
    last_error: Option<String>,
    start_time: Instant,
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self {
            counts: HashMap::from([
                (Direction::Outbound, HashMap::new()),
                (Direction::Inbound, HashMap::new()),
            ]),
            last_error: None,
            start_time: Instant::now(),
            entries: Vec::new(),
            max_entries: Self::DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::new()
        }
    }

    pub fn record(&mut self, direction: Direction, message: &Message) {
        let kind = message.name();
        *self
            .counts
            .entry(direction)
            .or_default()
            .entry(kind.to_string())
            .or_default() += 1;

        // Re-encoding only fails for out-of-range values that were never sent.
        let payload = message
            .encode_payload()
            .ok()
            .filter(|p| !p.is_empty())
            .map(|p| p.iter().map(|b| format!("{b:02x}")).collect());

        self.entries.push(HistoryEntry {
            direction,
            kind: kind.to_string(),
            id: message.id(),
            payload,
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });

        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn record_error(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// How many messages of `kind` went in `direction`, including evicted entries.
    pub fn count(&self, direction: Direction, kind: &str) -> usize {
        self.counts
            .get(&direction)
            .and_then(|m| m.get(kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.values_mut().for_each(|m| m.clear());
        self.entries.clear();
        self.last_error = None;
    }

    pub fn summary(&self) -> HistorySummary {
        let total = |d: Direction| self.counts.get(&d).map_or(0, |m| m.values().sum());
        HistorySummary {
            outbound_count: total(Direction::Outbound),
            inbound_count: total(Direction::Inbound),
            total_entries: self.entries.len(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Summary of message history for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub outbound_count: usize,
    pub inbound_count: usize,
    pub total_entries: usize,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateKind;

    #[test]
    fn test_record_message() {
        let mut history = MessageHistory::new();
        history.record(Direction::Outbound, &Message::QueryState(StateKind::Light));

        assert_eq!(history.len(), 1);
        let entry = &history.entries()[0];
        assert_eq!(entry.kind, "QueryState");
        assert_eq!(entry.id, 0x06);
        assert_eq!(entry.payload.as_deref(), Some("02"));
    }

    #[test]
    fn test_empty_payload_is_omitted() {
        let mut history = MessageHistory::new();
        history.record(Direction::Inbound, &Message::HostHeartbeat);

        let json = serde_json::to_value(&history.entries()[0]).unwrap();
        assert!(json.get("payload").is_none());
        assert_eq!(json["kind"], "HostHeartbeat");
    }

    #[test]
    fn test_record_error() {
        let mut history = MessageHistory::new();
        history.record_error("checksum mismatch");
        assert_eq!(history.last_error(), Some("checksum mismatch"));
    }

    #[test]
    fn test_max_entries() {
        let mut history = MessageHistory::with_max_entries(2);
        for _ in 0..5 {
            history.record(Direction::Outbound, &Message::ClientHeartbeat);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.count(Direction::Outbound, "ClientHeartbeat"), 5);
        assert_eq!(history.summary().outbound_count, 5);
        assert_eq!(history.summary().inbound_count, 0);
    }
}

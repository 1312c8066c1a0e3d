//! Call log entry model

use super::SimSlot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a call log row (the provider's row id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for CallId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction / disposition of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    Incoming,
    Outgoing,
    Missed,
    Rejected,
    Blocked,
    Voicemail,
}

impl CallType {
    /// Map the platform call-log type code to a call type.
    ///
    /// Calls answered on another device (code 7) count as incoming.
    pub fn from_platform_code(code: i32) -> Option<Self> {
        match code {
            1 | 7 => Some(CallType::Incoming),
            2 => Some(CallType::Outgoing),
            3 => Some(CallType::Missed),
            4 => Some(CallType::Voicemail),
            5 => Some(CallType::Rejected),
            6 => Some(CallType::Blocked),
            _ => None,
        }
    }

    /// Wire name used by the upstream API
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Incoming => "INCOMING",
            CallType::Outgoing => "OUTGOING",
            CallType::Missed => "MISSED",
            CallType::Rejected => "REJECTED",
            CallType::Blocked => "BLOCKED",
            CallType::Voicemail => "VOICEMAIL",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row read from the device call log
///
/// Entries are read-only snapshots; the agent never writes back to the
/// call log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    pub id: CallId,
    /// Remote party number as recorded by the dialer
    pub number: String,
    /// Cached contact name, if the dialer resolved one
    pub name: Option<String>,
    pub call_type: CallType,
    /// Call start time (milliseconds since the Unix epoch)
    pub timestamp_millis: i64,
    pub duration_seconds: i64,
    #[serde(default)]
    pub sim_slot: SimSlot,
}

impl CallLogEntry {
    pub fn new(
        id: impl Into<CallId>,
        number: impl Into<String>,
        call_type: CallType,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            name: None,
            call_type,
            timestamp_millis,
            duration_seconds: 0,
            sim_slot: SimSlot::Unknown,
        }
    }

    /// Set the cached contact name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }

    /// Set the call duration in seconds
    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.duration_seconds = seconds.max(0);
        self
    }

    pub fn with_sim_slot(mut self, slot: SimSlot) -> Self {
        self.sim_slot = slot;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_codes() {
        assert_eq!(CallType::from_platform_code(1), Some(CallType::Incoming));
        assert_eq!(CallType::from_platform_code(2), Some(CallType::Outgoing));
        assert_eq!(CallType::from_platform_code(3), Some(CallType::Missed));
        assert_eq!(CallType::from_platform_code(4), Some(CallType::Voicemail));
        assert_eq!(CallType::from_platform_code(5), Some(CallType::Rejected));
        assert_eq!(CallType::from_platform_code(6), Some(CallType::Blocked));
        assert_eq!(CallType::from_platform_code(7), Some(CallType::Incoming));
        assert_eq!(CallType::from_platform_code(0), None);
        assert_eq!(CallType::from_platform_code(42), None);
    }

    #[test]
    fn test_call_type_serializes_upper_case() {
        let json = serde_json::to_string(&CallType::Voicemail).unwrap();
        assert_eq!(json, "\"VOICEMAIL\"");
        assert_eq!(CallType::Missed.to_string(), "MISSED");
    }

    #[test]
    fn test_entry_builder() {
        let entry = CallLogEntry::new(17_i64, "+15550100", CallType::Outgoing, 1_700_000_000_000)
            .with_name("Alice")
            .with_duration(-5)
            .with_sim_slot(SimSlot::Sim2);

        assert_eq!(entry.id.as_str(), "17");
        assert_eq!(entry.name.as_deref(), Some("Alice"));
        assert_eq!(entry.duration_seconds, 0);
        assert_eq!(entry.sim_slot, SimSlot::Sim2);
    }

    #[test]
    fn test_blank_name_is_none() {
        let entry = CallLogEntry::new("1", "100", CallType::Missed, 0).with_name("  ");
        assert!(entry.name.is_none());
    }
}

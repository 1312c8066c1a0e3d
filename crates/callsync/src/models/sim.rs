//! SIM slot inference and selection policy
//!
//! The platform only exposes an opaque phone-account identifier per call.
//! Mapping it to a physical slot is a heuristic: vendors encode the slot in
//! different ways (and some expose an ICCID that carries no slot at all),
//! so the result is best-effort.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Markers that identify the second slot. Checked before [`SIM1_MARKERS`].
const SIM2_MARKERS: &[&str] = &["sim2", "slot1", "sub2", "sim_2"];
const SIM1_MARKERS: &[&str] = &["sim1", "slot0", "sub1", "sim_1"];

/// Physical SIM slot a call was placed/received on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimSlot {
    Sim1,
    Sim2,
    #[default]
    Unknown,
}

impl SimSlot {
    /// Infer the slot from a platform phone-account identifier
    pub fn infer(account_id: Option<&str>) -> SimSlot {
        let Some(raw) = account_id else {
            return SimSlot::Unknown;
        };
        let id = raw.trim().to_ascii_lowercase();
        if id.is_empty() {
            return SimSlot::Unknown;
        }

        if SIM2_MARKERS.iter().any(|m| id.contains(m)) {
            return SimSlot::Sim2;
        }
        if SIM1_MARKERS.iter().any(|m| id.contains(m)) {
            return SimSlot::Sim1;
        }

        // Short numeric ids are subscription or slot indexes
        if id.len() <= 2 && id.bytes().all(|b| b.is_ascii_digit()) {
            return match id.parse::<u8>() {
                Ok(0 | 1) => SimSlot::Sim1,
                Ok(2) => SimSlot::Sim2,
                _ => SimSlot::Unknown,
            };
        }

        SimSlot::Unknown
    }
}

/// Which SIM's calls the device forwards upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SimPolicy {
    #[default]
    All,
    Sim1,
    Sim2,
}

impl SimPolicy {
    /// Whether a call on `slot` passes this policy.
    ///
    /// Unknown slots are treated as the primary SIM.
    pub fn allows(&self, slot: SimSlot) -> bool {
        match self {
            SimPolicy::All => true,
            SimPolicy::Sim1 => slot != SimSlot::Sim2,
            SimPolicy::Sim2 => slot == SimSlot::Sim2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimPolicy::All => "ALL",
            SimPolicy::Sim1 => "SIM1",
            SimPolicy::Sim2 => "SIM2",
        }
    }
}

impl fmt::Display for SimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "ALL" => Ok(SimPolicy::All),
            "SIM1" | "1" => Ok(SimPolicy::Sim1),
            "SIM2" | "2" => Ok(SimPolicy::Sim2),
            other => Err(format!("Unknown SIM policy: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_markers() {
        assert_eq!(SimSlot::infer(Some("com.vendor/SIM1")), SimSlot::Sim1);
        assert_eq!(SimSlot::infer(Some("slot0_account")), SimSlot::Sim1);
        assert_eq!(SimSlot::infer(Some("Sim2-Carrier")), SimSlot::Sim2);
        assert_eq!(SimSlot::infer(Some("telephony_slot1")), SimSlot::Sim2);
    }

    #[test]
    fn test_infer_from_short_index() {
        assert_eq!(SimSlot::infer(Some("0")), SimSlot::Sim1);
        assert_eq!(SimSlot::infer(Some("1")), SimSlot::Sim1);
        assert_eq!(SimSlot::infer(Some(" 2 ")), SimSlot::Sim2);
        assert_eq!(SimSlot::infer(Some("7")), SimSlot::Unknown);
    }

    #[test]
    fn test_infer_opaque_ids_are_unknown() {
        assert_eq!(SimSlot::infer(None), SimSlot::Unknown);
        assert_eq!(SimSlot::infer(Some("")), SimSlot::Unknown);
        assert_eq!(SimSlot::infer(Some("8991101200003204510")), SimSlot::Unknown);
    }

    #[test]
    fn test_policy_allows() {
        assert!(SimPolicy::All.allows(SimSlot::Sim2));
        assert!(SimPolicy::All.allows(SimSlot::Unknown));

        assert!(SimPolicy::Sim1.allows(SimSlot::Sim1));
        assert!(SimPolicy::Sim1.allows(SimSlot::Unknown));
        assert!(!SimPolicy::Sim1.allows(SimSlot::Sim2));

        assert!(SimPolicy::Sim2.allows(SimSlot::Sim2));
        assert!(!SimPolicy::Sim2.allows(SimSlot::Sim1));
        assert!(!SimPolicy::Sim2.allows(SimSlot::Unknown));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("sim1".parse::<SimPolicy>(), Ok(SimPolicy::Sim1));
        assert_eq!("SIM2".parse::<SimPolicy>(), Ok(SimPolicy::Sim2));
        assert_eq!("".parse::<SimPolicy>(), Ok(SimPolicy::All));
        assert!("sim3".parse::<SimPolicy>().is_err());
    }

    #[test]
    fn test_policy_serialization() {
        assert_eq!(serde_json::to_string(&SimPolicy::Sim1).unwrap(), "\"SIM1\"");
        let parsed: SimPolicy = serde_json::from_str("\"ALL\"").unwrap();
        assert_eq!(parsed, SimPolicy::All);
    }
}

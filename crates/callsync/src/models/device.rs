//! Device registration written by the host app's setup screen

use super::SimPolicy;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// Identifiers the upstream API needs to attribute calls to a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Warehouse the device belongs to
    pub warehouse_id: String,
    /// Device identifier registered with the backend
    pub device_id: String,
    /// Phone number of the device itself
    pub mobile_number: String,
    /// Which SIM's calls to forward
    #[serde(default)]
    pub sim_policy: SimPolicy,
    /// Whether the sync service should come back after reboot/update
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

fn default_true() -> bool {
    true
}

impl DeviceConfig {
    pub fn new(
        warehouse_id: impl Into<String>,
        device_id: impl Into<String>,
        mobile_number: impl Into<String>,
    ) -> Self {
        Self {
            warehouse_id: warehouse_id.into(),
            device_id: device_id.into(),
            mobile_number: mobile_number.into(),
            sim_policy: SimPolicy::All,
            auto_start: true,
        }
    }

    pub fn with_sim_policy(mut self, policy: SimPolicy) -> Self {
        self.sim_policy = policy;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Check that every identifier the upstream API requires is present
    pub fn validate(&self) -> Result<(), SyncError> {
        let required = [
            ("warehouse_id", &self.warehouse_id),
            ("device_id", &self.device_id),
            ("mobile_number", &self.mobile_number),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::ConfigMissing(field.to_string()));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = DeviceConfig::new("WH-1", "dev-42", "+15550100");
        assert!(config.is_valid());
        assert!(config.auto_start);
        assert_eq!(config.sim_policy, SimPolicy::All);
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let config = DeviceConfig::new("WH-1", " ", "+15550100");
        match config.validate() {
            Err(SyncError::ConfigMissing(field)) => assert_eq!(field, "device_id"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!DeviceConfig::default().is_valid());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"warehouse_id":"7","device_id":"d","mobile_number":"1"}"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();
        assert!(config.auto_start);
        assert_eq!(config.sim_policy, SimPolicy::All);
    }
}

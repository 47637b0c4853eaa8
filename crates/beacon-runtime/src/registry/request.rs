use serde::{Deserialize, Serialize};

use beacon_core::{BeaconError, Result};

/// Request naming one node of a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeRequest {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NodeRequest {
    pub fn new(service: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            address: Some(address.into()),
        }
    }

    /// Validated `(service, address)`.
    pub fn validate(&self) -> Result<(String, String)> {
        let service = required("service", self.service.as_deref())?;
        let address = required("address", self.address.as_deref())?;
        Ok((service, address))
    }
}

/// Request naming a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverRequest {
    #[serde(default)]
    pub service: Option<String>,
}

impl DiscoverRequest {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
        }
    }

    /// Validated service name.
    pub fn validate(&self) -> Result<String> {
        required("service", self.service.as_deref())
    }
}

/// Trimmed value of a required field; blank counts as missing.
fn required(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BeaconError::Validation(format!(
            "missing required field: {}",
            field
        ))),
    }
}

//! The fixed approval topology, held as data.
//!
//! A topology is an ordered list of stages. A stage is settled either by the
//! request holding one of its statuses, or by the request's current approval
//! group matching one of its group name fragments. The engine only reads it;
//! nothing here is ever mutated after construction.
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::request::RequestStatus;

pub const SERVICE_PRODUCT_OWNER: &str = "Service Product Owner";
pub const PRODUCT_ENABLEMENT: &str = "PRODUCT ENABLEMENT";
// legacy spelling still found on groups handed over from older requests
pub const PRODUCT_ENABLEMENT_LEGACY: &str = "PRODUCT_ENABLEMENT";
pub const TAM_COMPLIANCE: &str = "TAM COMPLIANCE";
pub const CSO_GUARDRAILS: &str = "CSO GUARDRAILS";
pub const IAM_COMPLIANCE: &str = "IAM COMPLIANCE";

/// TOML form of [`Topology::builtin`].
pub const DEFAULT_TOPOLOGY_TOML: &str = r#"
[[stage]]
label = "Submitted"
statuses = ["SUBMITTED", "APPROVED", "COMPLETED", "REJECTED", "OPEN"]

[[stage]]
label = "Service Product Owner"
groups = ["Service Product Owner"]

[[stage]]
label = "Product Enablement"
groups = ["PRODUCT ENABLEMENT"]

[[stage]]
label = "TAM Compliance"
groups = ["TAM COMPLIANCE"]

[[stage]]
label = "CSO Guardrails"
groups = ["CSO GUARDRAILS"]

[[stage]]
label = "IAM Compliance"
groups = ["IAM COMPLIANCE"]

[[stage]]
label = "Completed"
statuses = ["COMPLETED"]
"#;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub label: String,
    #[serde(default)]
    pub statuses: Vec<RequestStatus>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Stage {
    pub fn by_status(label: &str, statuses: &[RequestStatus]) -> Self {
        Self {
            label: label.into(),
            statuses: statuses.to_vec(),
            groups: vec![],
        }
    }
    pub fn by_group(label: &str, groups: &[&str]) -> Self {
        Self {
            label: label.into(),
            statuses: vec![],
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }
    pub fn has_group_qualifier(&self) -> bool {
        !self.groups.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    #[serde(rename = "stage")]
    stages: Vec<Stage>,
}

impl Topology {
    /// Validates and wraps a list of stages.
    pub fn new(stages: Vec<Stage>) -> Result<Self, ConfigError> {
        let topology = Self { stages };
        topology.validate()?;
        Ok(topology)
    }

    pub fn builtin() -> Self {
        use RequestStatus::*;

        Self {
            stages: vec![
                Stage::by_status("Submitted", &[Submitted, Approved, Completed, Rejected, Open]),
                Stage::by_group("Service Product Owner", &[SERVICE_PRODUCT_OWNER]),
                Stage::by_group("Product Enablement", &[PRODUCT_ENABLEMENT]),
                Stage::by_group("TAM Compliance", &[TAM_COMPLIANCE]),
                Stage::by_group("CSO Guardrails", &[CSO_GUARDRAILS]),
                Stage::by_group("IAM Compliance", &[IAM_COMPLIANCE]),
                Stage::by_status("Completed", &[Completed]),
            ],
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let topology: Topology = toml::from_str(contents)?;
        topology.validate()?;
        Ok(topology)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::Validation("topology has no stages".into()));
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            if stage.label.trim().is_empty() {
                return Err(ConfigError::Validation(format!("stage {idx} has an empty label")));
            }
            if stage.statuses.is_empty() && stage.groups.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "stage `{}` declares neither statuses nor groups",
                    stage.label
                )));
            }
            if stage.groups.iter().any(|g| g.is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "stage `{}` has an empty group fragment",
                    stage.label
                )));
            }
        }
        Ok(())
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::builtin()
    }
}

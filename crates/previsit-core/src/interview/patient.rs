//! Patient and symptom fixtures
//!
//! Thin serde loaders over the JSON fixture files; the interesting
//! structure lives in the prompts and the session, not here.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Immutable snapshot of one patient's attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Full patient name, also the session id
    pub name: String,
    /// Age in years
    pub age: u32,
    /// Self-reported gender
    pub gender: String,
    /// Provider voice used for this patient's synthesized replies
    pub voice: String,
    /// Known pre-existing condition
    pub existing_condition: String,
    /// Pre-computed EHR summary; generated on demand when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ehr_summary: Option<String>,
}

impl PatientProfile {
    /// First name, used when addressing the patient in prompts.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// All patients known to the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRoster {
    /// Patient profiles
    pub patients: Vec<PatientProfile>,
}

impl PatientRoster {
    /// Load the roster from a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::fixture(format!("failed to read patient roster {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::fixture(format!("malformed patient roster {}: {e}", path.display()))
        })
    }

    /// Look up a patient by full name.
    pub fn find(&self, name: &str) -> Option<&PatientProfile> {
        self.patients.iter().find(|p| p.name == name)
    }

    /// Look up a patient by full name, erroring when absent.
    pub fn require(&self, name: &str) -> CoreResult<&PatientProfile> {
        self.find(name)
            .ok_or_else(|| CoreError::fixture(format!("unknown patient: {name}")))
    }
}

/// Per-condition symptom scripts the roleplayed patient draws from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomCatalog {
    conditions: BTreeMap<String, Vec<String>>,
}

impl SymptomCatalog {
    /// Load the catalog from a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::fixture(format!("failed to read symptom catalog {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::fixture(format!("malformed symptom catalog {}: {e}", path.display()))
        })
    }

    /// Symptom lines for a condition.
    pub fn symptoms_for(&self, condition: &str) -> Option<&[String]> {
        self.conditions.get(condition).map(Vec::as_slice)
    }

    /// Symptom lines joined for prompt interpolation, erroring on an
    /// unknown condition.
    pub fn script_for(&self, condition: &str) -> CoreResult<String> {
        self.symptoms_for(condition)
            .map(|lines| lines.join("\n"))
            .ok_or_else(|| CoreError::fixture(format!("unknown condition: {condition}")))
    }
}

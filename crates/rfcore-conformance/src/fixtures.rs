//! Fixture loading and management: JSON-serializable (`serde`) golden-vector
//! cases grouped into named sets, covering `spec.md` §8's end-to-end
//! scenarios.

use serde::{Deserialize, Serialize};

/// One golden-vector test case for a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Scenario identifier, e.g. `"S1"`.
    pub name: String,
    /// One-line description of what's being checked.
    pub description: String,
    /// Input parameters, serialized as a JSON value (hex strings, numbers).
    pub inputs: serde_json::Value,
    /// Expected output, serialized as a JSON value.
    pub expected: serde_json::Value,
}

/// A collection of fixture cases for one property or scenario family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    pub version: String,
    pub family: String,
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    #[must_use]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

//! Combination of global and local verdicts into a removal decision

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-record outcome of the two plausibility tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyTag {
    NotAnomalous,
    GlobalOnly,
    LocalOnly,
    Both,
}

impl AnomalyTag {
    /// Build the tag from the global and local flags
    pub fn from_flags(global: bool, local: bool) -> Self {
        match (global, local) {
            (false, false) => Self::NotAnomalous,
            (true, false) => Self::GlobalOnly,
            (false, true) => Self::LocalOnly,
            (true, true) => Self::Both,
        }
    }

    pub fn is_global(self) -> bool {
        matches!(self, Self::GlobalOnly | Self::Both)
    }

    pub fn is_local(self) -> bool {
        matches!(self, Self::LocalOnly | Self::Both)
    }
}

/// How global and local flags combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Remove records flagged by either test
    #[default]
    Union,
    /// Remove records flagged by both tests
    Intersection,
}

impl CombineMode {
    /// Whether a record with this tag is removed
    pub fn removes(self, tag: AnomalyTag) -> bool {
        match self {
            Self::Union => tag != AnomalyTag::NotAnomalous,
            Self::Intersection => tag == AnomalyTag::Both,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Intersection => "intersection",
        }
    }
}

impl FromStr for CombineMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(Self::Union),
            "intersection" => Ok(Self::Intersection),
            other => Err(Error::configuration(format!(
                "Unknown combine mode '{}', expected 'union' or 'intersection'",
                other
            ))),
        }
    }
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

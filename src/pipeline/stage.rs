//! Pipeline stages

use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Stage 1: Create the destination table if absent
    EnsureTable,
    /// Stage 2: Load the source file into the table
    Load,
}

impl PipelineStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![Self::EnsureTable, Self::Load]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnsureTable => "ensure_table",
            Self::Load => "load",
        }
    }

    /// Get stage description
    pub fn description(&self) -> &'static str {
        match self {
            Self::EnsureTable => "Create the destination table if absent",
            Self::Load => "Load the source file into the destination table",
        }
    }

    /// Get stage index (1-based)
    pub fn index(&self) -> usize {
        match self {
            Self::EnsureTable => 1,
            Self::Load => 2,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "ensure_table" | "create_table" | "1" => Ok(Self::EnsureTable),
            "load" | "load_csv" | "2" => Ok(Self::Load),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

//! Error types for pipeline operations

use thiserror::Error;

use super::stage::PipelineStage;
use crate::load::LoadError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Stage failed with underlying cause
    #[error("Stage '{stage}' failed: {source}")]
    StageFailure {
        stage: PipelineStage,
        #[source]
        source: LoadError,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a stage failure with underlying error
    pub fn stage_failure(stage: PipelineStage, source: LoadError) -> Self {
        Self::StageFailure { stage, source }
    }

    /// Get the stage if this is a stage error
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::StageFailure { stage, .. } => Some(*stage),
            PipelineError::ConfigError(_) => None,
        }
    }

    /// Underlying load error, if any
    pub fn load_error(&self) -> Option<&LoadError> {
        match self {
            PipelineError::StageFailure { source, .. } => Some(source),
            PipelineError::ConfigError(_) => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your loader configuration file.")
            }
            PipelineError::StageFailure { stage, source } if source.is_pre_connection() => {
                format!(
                    "Stage '{stage}' failed: {}\nNothing was written to the destination.",
                    source.user_message()
                )
            }
            PipelineError::StageFailure { stage, source } => {
                format!("Stage '{stage}' failed: {}", source.user_message())
            }
        }
    }
}

impl From<LoadError> for PipelineError {
    fn from(err: LoadError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure() {
        let err = PipelineError::stage_failure(
            PipelineStage::Load,
            LoadError::SchemaMismatch {
                missing: vec!["birth_date".to_string()],
                found: vec!["customer_name".to_string()],
            },
        );
        assert_eq!(err.stage(), Some(PipelineStage::Load));
        assert!(err.to_string().starts_with("Stage 'load' failed: CSV missing columns"));
        assert!(err.user_message().contains("Hint:"));
        assert!(err.user_message().ends_with("Nothing was written to the destination."));
        assert!(matches!(
            err.load_error(),
            Some(LoadError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_failure_does_not_claim_nothing_written() {
        let err = PipelineError::stage_failure(
            PipelineStage::Load,
            LoadError::Insert {
                batch: 2,
                first_row: 51,
                last_row: 100,
                committed: 50,
                message: "value too long".to_string(),
            },
        );
        assert!(!err.user_message().contains("Nothing was written"));
        assert!(err.user_message().contains("50 rows"));
    }

    #[test]
    fn test_config_error() {
        let err: PipelineError = LoadError::InvalidConfig("batch_size must be positive".into()).into();
        assert_eq!(err.stage(), None);
        assert!(err.to_string().contains("batch_size"));
    }
}

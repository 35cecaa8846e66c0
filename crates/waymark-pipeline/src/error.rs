//! Pipeline construction and configuration errors.
//!
//! Failures while *running* a pipeline are never errors: they come back as
//! error [`waymark_core::PipelineResult`]s.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("pipeline name cannot be empty")]
    EmptyName,

    #[error("pipeline '{pipeline}': step ids start at 1, got {id}")]
    InvalidStepId { pipeline: String, id: u32 },

    #[error("pipeline '{pipeline}': step {id} must come after step {previous}")]
    StepOutOfOrder {
        pipeline: String,
        previous: u32,
        id: u32,
    },

    #[error("pipeline '{pipeline}': step {step} names unknown agent '{agent}'")]
    UnknownAgent {
        pipeline: String,
        step: u32,
        agent: String,
    },

    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },
}

impl PipelineError {
    /// Stable error code for logs and CLI output.
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::EmptyName => "EMPTY_NAME",
            PipelineError::InvalidStepId { .. } => "INVALID_STEP_ID",
            PipelineError::StepOutOfOrder { .. } => "STEP_OUT_OF_ORDER",
            PipelineError::UnknownAgent { .. } => "UNKNOWN_AGENT",
            PipelineError::InvalidEnvVar { .. } => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_pipeline() {
        let err = PipelineError::StepOutOfOrder {
            pipeline: "release".into(),
            previous: 3,
            id: 2,
        };
        assert_eq!(err.to_string(), "pipeline 'release': step 2 must come after step 3");
        assert_eq!(err.error_code(), "STEP_OUT_OF_ORDER");
    }
}

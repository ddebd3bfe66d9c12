use thiserror::Error;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{stage}' has no item at index {index}")]
    ExhaustedSequence { stage: String, index: usize },

    #[error("listener '{listener}' is already registered on '{node}'")]
    DuplicateListener { node: String, listener: String },

    #[error("source '{source_label}' has already been driven")]
    SourceExhausted { source_label: String },

    #[error("stage '{stage}' failed on item {index}: {source}")]
    TransformFailure {
        stage: String,
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub(crate) fn exhausted(stage: &str, index: usize) -> Self {
        Self::ExhaustedSequence {
            stage: stage.to_string(),
            index,
        }
    }

    pub(crate) fn transform(stage: &str, index: usize, source: anyhow::Error) -> Self {
        Self::TransformFailure {
            stage: stage.to_string(),
            index,
            source,
        }
    }

    /// Label of the stage or node the error was raised by.
    pub fn stage(&self) -> &str {
        match self {
            Self::ExhaustedSequence { stage, .. } | Self::TransformFailure { stage, .. } => stage,
            Self::DuplicateListener { node, .. } => node,
            Self::SourceExhausted { source_label } => source_label,
        }
    }

    /// Item index the error refers to, when it refers to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::ExhaustedSequence { index, .. } | Self::TransformFailure { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn transform_failure_names_stage_and_index() {
        let err = PipelineError::transform("increment", 2, anyhow!("overflow"));
        assert_eq!(err.stage(), "increment");
        assert_eq!(err.index(), Some(2));
        assert_eq!(
            err.to_string(),
            "stage 'increment' failed on item 2: overflow"
        );
    }

    #[test]
    fn source_exhausted_has_no_index() {
        let err = PipelineError::SourceExhausted {
            source_label: "ints".into(),
        };
        assert_eq!(err.stage(), "ints");
        assert_eq!(err.index(), None);
    }
}

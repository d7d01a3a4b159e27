//! Error types for model training, storage and reporting

use thiserror::Error;

/// Result type for ML operations
pub type MLResult<T> = Result<T, MLError>;

/// Errors raised by the clusterer, the classifier and the model store
#[derive(Error, Debug)]
pub enum MLError {
    /// Not enough windows to fit a model
    #[error("Insufficient data: need {required} windows, have {available}")]
    InsufficientData {
        /// Minimum window count
        required: usize,
        /// Windows supplied
        available: usize,
    },

    /// Label vector does not line up with the windows
    #[error("Label mismatch: {reason}")]
    LabelMismatch {
        /// What was wrong
        reason: String,
    },

    /// Input geometry differs from what the model was built for
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// A stored artifact exists but cannot be used
    #[error("Failed to load artifact `{key}`: {reason}")]
    ArtifactLoad {
        /// Store key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Persisting a freshly trained model failed
    #[error("Failed to save artifact `{key}`: {reason}")]
    ArtifactSave {
        /// Store key
        key: String,
        /// Underlying failure
        reason: String,
    },

    /// A stored artifact holds a different model kind than requested
    #[error("Artifact `{key}` holds a {actual} model, expected {expected}")]
    ArtifactKind {
        /// Store key
        key: String,
        /// Requested kind
        expected: &'static str,
        /// Kind found in the store
        actual: &'static str,
    },

    /// Encoding or decoding a model failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_artifact() {
        let err = MLError::ArtifactKind {
            key: "clusterer".into(),
            expected: "clusterer",
            actual: "classifier",
        };
        assert_eq!(
            err.to_string(),
            "Artifact `clusterer` holds a classifier model, expected clusterer"
        );

        let err = MLError::InsufficientData {
            required: 3,
            available: 1,
        };
        assert!(err.to_string().contains("need 3 windows, have 1"));
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: MLError = parse.into();
        assert!(matches!(err, MLError::Serialization(_)));
    }
}

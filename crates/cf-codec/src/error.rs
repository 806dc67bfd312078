use std::path::PathBuf;

use cf_project::ValidationError;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("Format error at line {line}: {what}")]
    Format { line: usize, what: String },

    #[error("Project failed validation:\n{}", .problems.join("\n"))]
    Validation { problems: Vec<String> },

    #[error("Unsupported feature: {feature} - {reason}")]
    UnsupportedFeature { feature: String, reason: String },

    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

impl CodecError {
    pub(crate) fn format(line: usize, what: impl Into<String>) -> Self {
        CodecError::Format {
            line,
            what: what.into(),
        }
    }
}

impl From<ValidationError> for CodecError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Invariants { problems } => CodecError::Validation { problems },
            ValidationError::Unsupported { feature, reason } => {
                CodecError::UnsupportedFeature { feature, reason }
            }
        }
    }
}

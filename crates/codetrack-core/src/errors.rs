/// Error taxonomy for the statistics and report pipeline.
///
/// Nothing in the pipeline catches or retries these: the first failure
/// aborts the request and reaches the HTTP layer with its original kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ReportError {
    /// Stable label used in logs and metric labels.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Render(_) => "render",
            Self::Upstream(_) => "upstream",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

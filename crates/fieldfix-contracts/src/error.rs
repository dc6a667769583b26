use std::fmt;

pub const UPSTREAM_MESSAGE: &str =
    "Could not reach the diagnostic service. Wait a moment, then retry the assessment.";
pub const DECODE_MESSAGE: &str =
    "Diagnostic data came back corrupted. Re-run the assessment.";
pub const MISSING_RECORD_MESSAGE: &str =
    "That assessment is no longer in this session's history.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssessmentErrorKind {
    /// The completion service call itself failed.
    Upstream,
    /// The call succeeded but the body did not match the expected shape.
    Decode,
    MissingRecord,
}

/// Failure of one user action (solve or bill-of-materials).
///
/// `Display` renders the operator-facing message; `detail` keeps the underlying cause for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentError {
    kind: AssessmentErrorKind,
    detail: String,
}

impl AssessmentError {
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self {
            kind: AssessmentErrorKind::Upstream,
            detail: detail.into(),
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self {
            kind: AssessmentErrorKind::Decode,
            detail: detail.into(),
        }
    }

    pub fn missing_record(id: &str) -> Self {
        Self {
            kind: AssessmentErrorKind::MissingRecord,
            detail: format!("no record with id '{id}'"),
        }
    }

    /// Flattens an `anyhow` chain into one upstream error.
    pub fn from_gateway(err: &anyhow::Error) -> Self {
        Self::upstream(error_chain_message(err))
    }

    pub fn kind(&self) -> AssessmentErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_upstream(&self) -> bool {
        self.kind == AssessmentErrorKind::Upstream
    }

    pub fn is_decode(&self) -> bool {
        self.kind == AssessmentErrorKind::Decode
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind {
            AssessmentErrorKind::Upstream => UPSTREAM_MESSAGE,
            AssessmentErrorKind::Decode => DECODE_MESSAGE,
            AssessmentErrorKind::MissingRecord => MISSING_RECORD_MESSAGE,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            AssessmentErrorKind::Upstream => "upstream",
            AssessmentErrorKind::Decode => "decode",
            AssessmentErrorKind::MissingRecord => "missing_record",
        }
    }
}

impl fmt::Display for AssessmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AssessmentError {}

fn error_chain_message(err: &anyhow::Error) -> String {
    err.chain()
        .map(|entry| entry.to_string())
        .filter(|entry| !entry.trim().is_empty())
        .collect::<Vec<String>>()
        .join(": ")
}

use speed_core::ActionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },

    #[error("report window is out of the supported date range")]
    OutOfRange,

    #[error("report request failed: {0}")]
    Http(String),

    #[error("report service returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<ReportError> for ActionError {
    fn from(e: ReportError) -> Self {
        ActionError::Execution(e.to_string())
    }
}

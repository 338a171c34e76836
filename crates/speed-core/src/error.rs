use thiserror::Error;

/// Tagged failure classes shared by every crate in the workspace.
///
/// Each kind has a fixed human-readable message; error enums map their
/// variants onto a kind via `kind()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    MalformedRequest,
    UnknownOperation,
    ActionExecution,
    ReplyPublish,
    StorageNameExhausted,
    StorageTokenInvalid,
    StorageNotFound,
    Storage,
}

impl ErrorKind {
    pub const fn message(self) -> &'static str {
        match self {
            Self::Connection => "Message broker is unreachable",
            Self::MalformedRequest => "Malformed request",
            Self::UnknownOperation => "Неизвестный тип отчёта",
            Self::ActionExecution => "Report execution failed",
            Self::ReplyPublish => "Reply could not be published",
            Self::StorageNameExhausted => "Please rename upload file",
            Self::StorageTokenInvalid => {
                "The Yandex disk token failed verification, update token."
            }
            Self::StorageNotFound => "File not found",
            Self::Storage => "Storage request failed",
        }
    }

    /// Whether a failure of this kind ends the process.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Connection)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Failures of the artifact store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} ({attempts} attempts for {name})", ErrorKind::StorageNameExhausted.message())]
    NameExhausted { name: String, attempts: u32 },

    #[error("{}", ErrorKind::StorageTokenInvalid.message())]
    TokenInvalid,

    #[error("{kind}: {0}", kind = ErrorKind::StorageNotFound.message())]
    NotFound(String),

    #[error("path already exists: {0}")]
    AlreadyExists(String),

    #[error("storage request failed: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NameExhausted { .. } => ErrorKind::StorageNameExhausted,
            Self::TokenInvalid => ErrorKind::StorageTokenInvalid,
            Self::NotFound(_) => ErrorKind::StorageNotFound,
            Self::AlreadyExists(_) | Self::Backend(_) => ErrorKind::Storage,
        }
    }
}

/// Failures while decoding or executing a single request.
///
/// Every variant is recoverable: the consumer turns it into an `ERROR`
/// response and moves on to the next message.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{}", ErrorKind::UnknownOperation.message())]
    UnknownOperation(String),

    #[error("invalid request: {0}")]
    MalformedRequest(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::MissingParameter(_) | Self::Execution(_) => ErrorKind::ActionExecution,
            Self::Store(e) => e.kind(),
        }
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedRequest(e.to_string())
    }
}

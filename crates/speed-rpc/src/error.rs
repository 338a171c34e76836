use speed_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{kind}: {0}", kind = ErrorKind::Connection.message())]
    Connection(String),

    #[error("consumer stream closed by broker")]
    StreamClosed,

    #[error("consumer is not started")]
    NotConsuming,

    #[error("consumer is not connected")]
    NotConnected,

    #[error("{kind}: {0}", kind = ErrorKind::ReplyPublish.message())]
    Publish(String),

    #[error("acknowledgement failed: {0}")]
    Ack(String),
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_)
            | Self::StreamClosed
            | Self::NotConsuming
            | Self::NotConnected
            | Self::Ack(_) => ErrorKind::Connection,
            Self::Publish(_) => ErrorKind::ReplyPublish,
        }
    }
}

impl From<lapin::Error> for RpcError {
    fn from(e: lapin::Error) -> Self {
        Self::Connection(e.to_string())
    }
}

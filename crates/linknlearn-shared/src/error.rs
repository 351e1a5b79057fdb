use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(String),

    #[error("Invalid conversation id: {0}")]
    InvalidConversationId(String),

    #[error("Invalid link status: {0}")]
    InvalidStatus(String),

    #[error("Not an institutional email address")]
    InvalidEmail,
}

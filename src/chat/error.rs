use thiserror::Error;

/// Per-action failures, surfaced only to the acting connection as an `error`
/// event. None of these terminate the process or another session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Username already taken")]
    UsernameTaken,
    #[error("You must register a username first")]
    NotRegistered,
    #[error("Recipient not found")]
    RecipientNotFound,
}

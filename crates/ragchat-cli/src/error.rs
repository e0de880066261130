use thiserror::Error;

/// Invalid input at the prompt; reported to the user, never fatal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '/{0}'. Type /help for the list of commands")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("No conversation number {0}. Type /list to see them")]
    NoSuchRow(usize),
}

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] plaza_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No post content provided")]
    EmptyContent,
    #[error("No comment text provided")]
    EmptyComment,
    #[error("No email given. Pass --email or set `default_email` with `plaza config init`.")]
    MissingEmail,
    #[error("Not signed in. Run `plaza login` first.")]
    NotSignedIn,
    #[error("Configuration error: {0}")]
    Config(String),
}

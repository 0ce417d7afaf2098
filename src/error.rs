//! Error types for model building.

use thiserror::Error;

/// Errors that can occur while building a content model.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid qualified name format: '{0}'")]
    InvalidQualifiedName(String),

    #[error("field '{0}' occurs in non-consecutive runs")]
    DuplicateField(String),

    #[error("malformed markup: {0}")]
    Markup(String),

    #[error("binary registration failed for '{uri}': {reason}")]
    Binary { uri: String, reason: String },

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;

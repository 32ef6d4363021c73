//! Error types for enex2md operations.

use thiserror::Error;

/// Errors that can occur while decoding an export or converting a note.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to initialise stream reader: no en-export data found")]
    NoExportData,

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("decoding note {title}: {source}")]
    Content {
        title: String,
        #[source]
        source: Box<Error>,
    },

    #[error("decoding resource {filename}: {source}")]
    Recognition {
        filename: String,
        #[source]
        source: Box<Error>,
    },

    #[error("decoding resource payload {name}: {source}")]
    Payload {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("invalid tag template {0:?}: it must contain exactly one {{{{tag}}}} token")]
    TagTemplate(String),

    #[error("invalid front matter template: {0}")]
    FrontMatterTemplate(String),

    #[error("serializing note markup: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, Error>;

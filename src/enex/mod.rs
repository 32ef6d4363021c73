//! Decoder for Evernote `.enex` export documents.
//!
//! An export is an XML document with an `<en-export>` root holding one
//! `<note>` per exported note. Every note carries its body as a second,
//! embedded XML document (an `<en-note>` wrapped in CDATA), and every
//! attachment may carry a third one, the recognition index.
//!
//! Two entry points share the same lenient parsing rules:
//!
//! - [`decode`] buffers the whole input and returns an [`Export`].
//! - [`StreamDecoder`] yields one [`Note`] at a time and never holds more
//!   than the current note in memory (unless CDATA repair is required).
//!
//! ```
//! use enex2md::enex::StreamDecoder;
//!
//! let doc = r#"<en-export export-date="20090101T202020Z">
//!   <note><title>Hello</title><content><![CDATA[<en-note><div>hi</div></en-note>]]></content></note>
//! </en-export>"#;
//!
//! let mut notes = StreamDecoder::open(doc.as_bytes())?;
//! let note = notes.next().unwrap()?;
//! assert_eq!(note.title, "Hello");
//! assert_eq!(note.content, b"<div>hi</div>");
//! # Ok::<(), enex2md::Error>(())
//! ```

pub mod cdata;
mod content;
mod parser;
mod stream;

pub use content::{decode_content, decode_recognition};
pub use stream::StreamDecoder;

use std::io::Read;

use serde::Serialize;

use crate::error::Result;

/// Root of an export document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Export {
    /// `export-date` attribute of `<en-export>`, in source format.
    pub date: String,
    pub notes: Vec<Note>,
}

/// One exported note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
    pub title: String,
    /// Note body. After decoding this holds the markup found inside
    /// `<en-note>`, not yet normalized.
    pub content: Vec<u8>,
    /// Last update time, e.g. `20201220T223344Z`.
    pub updated: String,
    /// Creation time, e.g. `20121202T112233Z`.
    pub created: String,
    pub tags: Vec<String>,
    pub attributes: NoteAttributes,
    pub resources: Vec<Resource>,
}

/// Note metadata. Absent fields are empty strings.
///
/// Serializes with the element names used in exports (`source-url`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NoteAttributes {
    pub source: String,
    pub source_application: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub author: String,
    pub source_url: String,
}

/// A binary attachment embedded in a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    /// Identifier referenced by `<en-media hash="...">` markers.
    pub id: String,
    /// Coarse type from the recognition index, e.g. `image`.
    pub kind: String,
    pub data: Data,
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub attributes: ResourceAttributes,
    /// Raw recognition document, empty when the export has none.
    pub recognition: Vec<u8>,
}

/// Attributes of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceAttributes {
    pub timestamp: String,
    pub filename: String,
    pub source_url: String,
}

/// Encoded payload of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data {
    /// Declared encoding, `base64` or empty.
    pub encoding: String,
    pub content: Vec<u8>,
}

/// The part of a recognition index the converter cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub obj_id: String,
    pub obj_type: String,
}

/// Decode a complete export document.
///
/// The input is read to the end first; nested CDATA is repaired when the
/// leading bytes show signs of it. Any failing note aborts the whole decode.
pub fn decode<R: Read>(mut reader: R) -> Result<Export> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut stream = StreamDecoder::open(bytes.as_slice())?;
    let mut export = Export {
        date: stream.export_date().to_string(),
        notes: Vec::new(),
    };

    let mut note = Note::default();
    while stream.next_note(&mut note)? {
        export.notes.push(std::mem::take(&mut note));
    }

    Ok(export)
}

//! # enex2md
//!
//! Converts Evernote `.enex` exports into Markdown notes with their
//! attachments extracted next to them.
//!
//! ## Pipeline
//!
//! 1. [`enex`] decodes the export, in one go or note by note, repairing the
//!    nested CDATA some exporters produce.
//! 2. [`Converter`] turns each [`Note`](enex::Note) into a
//!    [`MarkdownNote`]: resources are decoded and named ([`namer`]), the
//!    note markup is rewritten into plain HTML ([`normalize`]) and rendered
//!    as markdown ([`markdown`]).
//! 3. [`NoteWriter`] saves the result to disk.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//!
//! use enex2md::enex::StreamDecoder;
//! use enex2md::{ConvertConfig, Converter, NoteWriter};
//!
//! let mut converter = Converter::new(ConvertConfig::default())?;
//! let writer = NoteWriter::new("notes");
//!
//! for note in StreamDecoder::open(File::open("export.enex")?)? {
//!     let mut note = note?;
//!     let markdown = converter.convert(&mut note)?;
//!     let name = converter.unique_note_name(&note.title);
//!     writer.save(&name, &markdown)?;
//! }
//! # Ok::<(), enex2md::Error>(())
//! ```

pub mod convert;
pub mod dom;
pub mod enex;
pub mod error;
pub mod markdown;
pub mod namer;
pub mod normalize;
pub mod output;
pub(crate) mod util;

pub use convert::{
    ConvertConfig, Converter, DEFAULT_TAG_TEMPLATE, MarkdownNote, MarkdownResource, ResourceType,
};
pub use error::{Error, Result};
pub use namer::NameLimits;
pub use output::{NoteWriter, WriterConfig};

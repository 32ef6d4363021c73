//! Pull-based, one-note-at-a-time decoding.

use std::io::{BufRead, BufReader, Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info};

use super::cdata::{detect_nested_cdata, remove_nested_cdata};
use super::content::{decode_content, decode_recognition};
use super::parser::{attribute, lenient_reader, read_note};
use super::Note;
use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding, local_name};

/// Cursor over the notes of an export document.
///
/// Each call to [`next_note`](Self::next_note) blocks on the underlying
/// reader until one full note is decoded. There is no read-ahead: stopping
/// early is simply not calling it again.
pub struct StreamDecoder<'r> {
    xml: Reader<Box<dyn BufRead + 'r>>,
    export_date: String,
    buf: Vec<u8>,
    finished: bool,
}

impl<'r> StreamDecoder<'r> {
    /// Open an export document and position the cursor inside `<en-export>`.
    ///
    /// Nested CDATA is detected on the first bytes of the input; only when
    /// it is found is the whole document buffered and repaired, otherwise
    /// the input keeps being read lazily.
    pub fn open<R: Read + 'r>(reader: R) -> Result<Self> {
        let (needs_fix, reader) = detect_nested_cdata(reader)?;

        let source: Box<dyn BufRead + 'r> = if needs_fix {
            let mut bytes = Vec::new();
            BufReader::new(reader).read_to_end(&mut bytes)?;
            let text = decode_text(&bytes, extract_xml_encoding(&bytes));
            info!("repairing nested CDATA sections");
            Box::new(Cursor::new(remove_nested_cdata(&text).into_bytes()))
        } else {
            Box::new(BufReader::new(reader))
        };

        let mut xml = lenient_reader(source);
        let mut buf = Vec::new();
        let export_date = loop {
            match xml.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"en-export" => {
                    break attribute(&e, b"export-date").unwrap_or_default();
                }
                Event::Eof => return Err(Error::NoExportData),
                _ => {}
            }
            buf.clear();
        };
        buf.clear();

        Ok(Self {
            xml,
            export_date,
            buf,
            finished: false,
        })
    }

    /// The `export-date` attribute of the document root.
    pub fn export_date(&self) -> &str {
        &self.export_date
    }

    /// Decode the next note into `note`.
    ///
    /// Returns `Ok(false)` once the document holds no further note, which is
    /// the normal end of the stream.
    pub fn next_note(&mut self, note: &mut Note) -> Result<bool> {
        loop {
            let found = match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(e) => local_name(e.name().as_ref()) == b"note",
                Event::Eof => return Ok(false),
                _ => false,
            };
            self.buf.clear();

            if found {
                *note = read_note(&mut self.xml)?;
                debug!(title = %note.title, resources = note.resources.len(), "decoded note");
                decode_content(note)?;
                decode_recognition(note)?;
                return Ok(true);
            }
        }
    }
}

impl Iterator for StreamDecoder<'_> {
    type Item = Result<Note>;

    /// Yields notes until the end of the document. Failures inside one note's
    /// embedded documents are yielded and iteration goes on; a broken outer
    /// document ends the iteration after its error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut note = Note::default();
        match self.next_note(&mut note) {
            Ok(true) => Some(Ok(note)),
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(err @ (Error::Content { .. } | Error::Recognition { .. })) => Some(Err(err)),
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

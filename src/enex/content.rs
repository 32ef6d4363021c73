//! Post-processing of the documents embedded in a note.
//!
//! `<content>` holds a full `<en-note>` document and `<recognition>` a full
//! `<recoIndex>` document. Both are parsed on their own after the outer
//! note has been read.

use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use tracing::debug;

use super::parser::attribute;
use super::{Note, Recognition};
use crate::error::{Error, Result};
use crate::util::{decode_text, extract_xml_encoding, local_name};

static RESOURCE_HASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9a-f]{32}\b").expect("RESOURCE_HASH: hardcoded regex is valid")
});

fn lenient_str_reader(text: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

/// Return the markup inside the root element of an embedded document.
///
/// `Ok(None)` means the document has no root element at all: either an
/// empty note body or a body that is plain text.
fn inner_markup(document: &str) -> Result<Option<String>> {
    let mut reader = lenient_str_reader(document);

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let end = e.to_end().into_owned();
                let inner = reader.read_text(end.name())?;
                return Ok(Some(inner.into_owned()));
            }
            Event::Empty(_) => return Ok(Some(String::new())),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Replace the note's content with the markup inside `<en-note>`.
///
/// A blank body decodes to empty content and a body without any root
/// element is kept as text. Every other failure is reported together with
/// the note title.
pub fn decode_content(note: &mut Note) -> Result<()> {
    let document = decode_text(&note.content, extract_xml_encoding(&note.content)).into_owned();

    match inner_markup(&document) {
        Ok(Some(markup)) => note.content = markup.into_bytes(),
        Ok(None) if document.trim().is_empty() => {
            debug!(title = %note.title, "note has no content");
            note.content.clear();
        }
        Ok(None) => {
            debug!(title = %note.title, "note content has no root element");
            note.content = document.into_bytes();
        }
        Err(source) => {
            return Err(Error::Content {
                title: note.title.clone(),
                source: Box::new(source),
            });
        }
    }

    Ok(())
}

fn parse_recognition(document: &str) -> Result<Recognition> {
    let mut reader = lenient_str_reader(document);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"recoIndex" => {
                return Ok(Recognition {
                    obj_id: attribute(&e, b"objID").unwrap_or_default(),
                    obj_type: attribute(&e, b"objType").unwrap_or_default(),
                });
            }
            Event::Eof => return Err(Error::MissingElement("recoIndex".to_string())),
            _ => {}
        }
    }
}

/// Fill in the identifier and type of every resource of `note`.
///
/// Resources with a recognition index take both from it. The others fall
/// back to the 32 digit hex hash that Evernote embeds in the source URL.
pub fn decode_recognition(note: &mut Note) -> Result<()> {
    for resource in &mut note.resources {
        let document = decode_text(
            &resource.recognition,
            extract_xml_encoding(&resource.recognition),
        );
        if document.trim().is_empty() {
            if let Some(hash) = RESOURCE_HASH.find(&resource.attributes.source_url) {
                resource.id = hash.as_str().to_string();
            }
            continue;
        }

        let recognition = parse_recognition(&document).map_err(|source| Error::Recognition {
            filename: resource.attributes.filename.clone(),
            source: Box::new(source),
        })?;
        resource.id = recognition.obj_id;
        resource.kind = recognition.obj_type;
    }

    Ok(())
}

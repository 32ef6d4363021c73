//! Event-level reading of `<note>` subtrees.
//!
//! The export dialect is not strict XML: closing tags do not always match,
//! bare ampersands appear in text, and after CDATA repair the note body shows
//! up as real elements inside `<content>`. The reader is configured to
//! tolerate all of that, and every field is read until the closing tag that
//! carries its own name.

use std::io::{self, BufRead};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Data, Note, NoteAttributes, Resource, ResourceAttributes};
use crate::error::Result;
use crate::util::{decode_text, local_name, resolve_entity};

/// Wrap `source` in a reader configured for the export dialect.
pub(crate) fn lenient_reader<R>(source: R) -> Reader<R> {
    let mut reader = Reader::from_reader(source);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

/// Read an attribute value from a start tag, unescaping entities.
pub(crate) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| unescape_lossy(&attr.value))
}

fn unescape_lossy(raw: &[u8]) -> String {
    let text = decode_text(raw, None);
    if !text.contains('&') {
        return text.into_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_ref();
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';').and_then(|semi| Some((semi, resolve_entity(&tail[..semi])?))) {
            Some((semi, resolved)) => {
                out.push_str(&resolved);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn unexpected_eof(element: &[u8]) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!(
            "unexpected end of input inside <{}>",
            String::from_utf8_lossy(element)
        ),
    )
}

/// How nested markup inside a field is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    /// Only character data is kept.
    Drop,
    /// Nested elements are written back verbatim (inner XML).
    Keep,
}

/// Read everything up to the closing tag named `end`.
///
/// Character data directly inside the field is unescaped, CDATA is taken
/// literally. With [`Markup::Keep`], nested elements and the text inside
/// them are reproduced as markup, so a body whose CDATA wrapper was
/// stripped still reads back as the same document.
fn read_field<R: BufRead>(reader: &mut Reader<R>, end: &[u8], markup: Markup) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut out = Vec::new();
    // Elements open inside the field, and how many of them share its name
    let mut depth = 0usize;
    let mut same_name = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if local_name(e.name().as_ref()) == end {
                    same_name += 1;
                }
                depth += 1;
                if markup == Markup::Keep {
                    out.push(b'<');
                    out.extend_from_slice(&e);
                    out.push(b'>');
                }
            }
            Event::Empty(e) => {
                if markup == Markup::Keep {
                    out.push(b'<');
                    out.extend_from_slice(&e);
                    out.extend_from_slice(b"/>");
                }
            }
            Event::End(e) => {
                let name = e.name();
                if local_name(name.as_ref()) == end {
                    if same_name == 0 {
                        return Ok(out);
                    }
                    same_name -= 1;
                }
                depth = depth.saturating_sub(1);
                if markup == Markup::Keep {
                    out.extend_from_slice(b"</");
                    out.extend_from_slice(name.as_ref());
                    out.push(b'>');
                }
            }
            Event::Text(e) => {
                if depth == 0 || markup == Markup::Keep {
                    out.extend_from_slice(&e);
                }
            }
            Event::CData(e) => {
                if depth == 0 || markup == Markup::Keep {
                    out.extend_from_slice(&e);
                }
            }
            Event::GeneralRef(e) => {
                if depth == 0 {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    match resolve_entity(&entity) {
                        Some(resolved) => out.extend_from_slice(resolved.as_bytes()),
                        None => {
                            out.push(b'&');
                            out.extend_from_slice(e.as_ref());
                            out.push(b';');
                        }
                    }
                } else if markup == Markup::Keep {
                    // Inside nested markup the reference belongs to that markup
                    out.push(b'&');
                    out.extend_from_slice(e.as_ref());
                    out.push(b';');
                }
            }
            Event::Eof => return Err(unexpected_eof(end).into()),
            _ => {}
        }
        buf.clear();
    }
}

fn read_string<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<String> {
    let bytes = read_field(reader, end, Markup::Drop)?;
    Ok(decode_text(&bytes, None).trim().to_string())
}

fn read_number<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<u32> {
    Ok(read_string(reader, end)?.parse().unwrap_or(0))
}

/// Skip an element the decoder has no use for.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<()> {
    read_field(reader, end, Markup::Drop).map(|_| ())
}

/// Read a `<note>` subtree. The reader must be positioned just past the
/// note's start tag.
pub(crate) fn read_note<R: BufRead>(reader: &mut Reader<R>) -> Result<Note> {
    let mut note = Note::default();
    let mut buf = Vec::new();

    loop {
        let name = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => Some(local_name(e.name().as_ref()).to_vec()),
            Event::End(e) if local_name(e.name().as_ref()) == b"note" => return Ok(note),
            Event::Eof => return Err(unexpected_eof(b"note").into()),
            _ => None,
        };
        buf.clear();
        let Some(name) = name else {
            continue;
        };

        match name.as_slice() {
            b"title" => note.title = read_string(reader, b"title")?,
            b"content" => note.content = read_field(reader, b"content", Markup::Keep)?,
            b"created" => note.created = read_string(reader, b"created")?,
            b"updated" => note.updated = read_string(reader, b"updated")?,
            b"tag" => note.tags.push(read_string(reader, b"tag")?),
            b"note-attributes" => note.attributes = read_note_attributes(reader)?,
            b"resource" => note.resources.push(read_resource(reader)?),
            other => skip_element(reader, other)?,
        }
    }
}

fn read_note_attributes<R: BufRead>(reader: &mut Reader<R>) -> Result<NoteAttributes> {
    let mut attributes = NoteAttributes::default();
    let mut buf = Vec::new();

    loop {
        let name = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => Some(local_name(e.name().as_ref()).to_vec()),
            Event::End(e) if local_name(e.name().as_ref()) == b"note-attributes" => {
                return Ok(attributes);
            }
            Event::Eof => return Err(unexpected_eof(b"note-attributes").into()),
            _ => None,
        };
        buf.clear();
        let Some(name) = name else {
            continue;
        };

        let value = read_string(reader, &name)?;
        match name.as_slice() {
            b"source" => attributes.source = value,
            b"source-application" => attributes.source_application = value,
            b"latitude" => attributes.latitude = value,
            b"longitude" => attributes.longitude = value,
            b"altitude" => attributes.altitude = value,
            b"author" => attributes.author = value,
            b"source-url" => attributes.source_url = value,
            _ => {}
        }
    }
}

fn read_resource<R: BufRead>(reader: &mut Reader<R>) -> Result<Resource> {
    let mut resource = Resource::default();
    let mut buf = Vec::new();

    loop {
        let start = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => Some((
                local_name(e.name().as_ref()).to_vec(),
                attribute(&e, b"encoding"),
            )),
            Event::End(e) if local_name(e.name().as_ref()) == b"resource" => return Ok(resource),
            Event::Eof => return Err(unexpected_eof(b"resource").into()),
            _ => None,
        };
        buf.clear();
        let Some((name, encoding)) = start else {
            continue;
        };

        match name.as_slice() {
            b"data" => {
                resource.data = Data {
                    encoding: encoding.unwrap_or_default(),
                    content: read_field(reader, b"data", Markup::Drop)?,
                }
            }
            b"mime" => resource.mime = read_string(reader, b"mime")?,
            b"width" => resource.width = read_number(reader, b"width")?,
            b"height" => resource.height = read_number(reader, b"height")?,
            b"resource-attributes" => resource.attributes = read_resource_attributes(reader)?,
            b"recognition" => {
                resource.recognition = read_field(reader, b"recognition", Markup::Keep)?
            }
            other => skip_element(reader, other)?,
        }
    }
}

fn read_resource_attributes<R: BufRead>(reader: &mut Reader<R>) -> Result<ResourceAttributes> {
    let mut attributes = ResourceAttributes::default();
    let mut buf = Vec::new();

    loop {
        let name = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => Some(local_name(e.name().as_ref()).to_vec()),
            Event::End(e) if local_name(e.name().as_ref()) == b"resource-attributes" => {
                return Ok(attributes);
            }
            Event::Eof => return Err(unexpected_eof(b"resource-attributes").into()),
            _ => None,
        };
        buf.clear();
        let Some(name) = name else {
            continue;
        };

        let value = read_string(reader, &name)?;
        match name.as_slice() {
            b"timestamp" => attributes.timestamp = value,
            b"file-name" => attributes.filename = value,
            b"source-url" => attributes.source_url = value,
            _ => {}
        }
    }
}

//! Decoding of export documents, batch and streaming.

use std::fs::File;

use enex2md::Error;
use enex2md::enex::{self, Note, StreamDecoder};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> File {
    File::open(format!("{FIXTURES_DIR}/{name}")).expect("fixture exists")
}

#[test]
fn test_decode_export() {
    let export = enex::decode(fixture("export.enex")).unwrap();
    assert_eq!(export.date, "20090101T202020Z");
    assert_eq!(export.notes.len(), 2);

    let note = &export.notes[0];
    assert_eq!(note.title, "Sample note");
    assert_eq!(
        note.content,
        br#"<div>text in the note<br/><b>bold text</b><br/></div><en-media type="image/gif" hash="09dde741f3b38c1a954358172cad4c06"/>"#
    );
    assert_eq!(note.created, "20090101T101010Z");
    assert_eq!(note.updated, "20090101T050505Z");
    assert_eq!(note.tags, vec!["tag1", "tag2"]);
    assert_eq!(note.attributes.source, "mobile.android");
    assert_eq!(note.attributes.latitude, "50.00000000000000");
    assert_eq!(note.attributes.longitude, "30.00000000000000");
    assert!(note.attributes.author.is_empty());

    let resource = &note.resources[0];
    assert_eq!(resource.id, "09dde741f3b38c1a954358172cad4c06");
    assert_eq!(resource.kind, "image");
    assert_eq!(resource.mime, "image/gif");
    assert_eq!((resource.width, resource.height), (16, 16));
    assert_eq!(resource.data.encoding, "base64");
    assert_eq!(resource.attributes.timestamp, "20120515T051032Z");
    assert_eq!(resource.attributes.filename, "1.jpg");
}

#[test]
fn test_resource_without_recognition_uses_source_url_hash() {
    let export = enex::decode(fixture("export.enex")).unwrap();
    let resource = &export.notes[1].resources[0];
    assert!(resource.recognition.is_empty());
    assert_eq!(resource.id, "084f886210557e19eafc72449154331e");
    assert!(resource.kind.is_empty());
}

#[test]
fn test_stream_matches_batch() {
    let batch = enex::decode(fixture("export.enex")).unwrap();
    let streamed: Vec<Note> = StreamDecoder::open(fixture("export.enex"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(streamed, batch.notes);
}

#[test]
fn test_stream_next_note_until_end() {
    let mut stream = StreamDecoder::open(fixture("export.enex")).unwrap();
    assert_eq!(stream.export_date(), "20090101T202020Z");

    let mut note = Note::default();
    assert!(stream.next_note(&mut note).unwrap());
    assert_eq!(note.title, "Sample note");
    assert!(stream.next_note(&mut note).unwrap());
    assert_eq!(note.title, "Weekly report");
    assert!(!stream.next_note(&mut note).unwrap());
}

#[test]
fn test_empty_note_is_not_an_error() {
    let export = enex::decode(fixture("empty.enex")).unwrap();
    assert_eq!(export.notes.len(), 1);
    assert!(export.notes[0].content.is_empty());

    let mut stream = StreamDecoder::open(fixture("empty.enex")).unwrap();
    let mut note = Note::default();
    assert!(stream.next_note(&mut note).unwrap());
    assert_eq!(note.title, "Empty note");
    assert!(note.content.is_empty());
}

#[test]
fn test_nested_cdata_is_repaired() {
    let export = enex::decode(fixture("cdata.enex")).unwrap();
    assert_eq!(export.notes.len(), 2);
    assert_eq!(export.notes[0].title, "Snippet");
    assert_eq!(export.notes[0].content, b"<div>before inner after</div>");
    assert_eq!(export.notes[1].content, b"<div>still here</div>");

    let streamed: Vec<Note> = StreamDecoder::open(fixture("cdata.enex"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(streamed, export.notes);
}

#[test]
fn test_not_an_export() {
    let result = StreamDecoder::open("Not an XML file".as_bytes());
    assert!(matches!(result, Err(Error::NoExportData)));
    assert!(matches!(
        enex::decode("Not an XML file".as_bytes()),
        Err(Error::NoExportData)
    ));
}

fn decode_both(document: &[u8]) -> Vec<Note> {
    let batch = enex::decode(document).unwrap().notes;
    let streamed: Vec<Note> = StreamDecoder::open(document)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(streamed, batch);
    batch
}

#[test]
fn test_nested_cdata_around_plain_text() {
    let notes = decode_both(
        b"<en-export><note><title>T</title>\
          <content><![CDATA[a<![CDATA[b]]>c]]></content></note></en-export>",
    );
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "T");
    assert_eq!(notes[0].content, b"abc");
}

#[test]
fn test_plain_text_content_is_kept() {
    let notes = decode_both(
        b"<en-export><note><title>Words</title><content>plain words</content></note></en-export>",
    );
    assert_eq!(notes[0].content, b"plain words");
}

#[test]
fn test_cp1252_export() {
    let notes = decode_both(
        b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>\
          <en-export><note><title>Caf\xE9</title>\
          <content><![CDATA[<en-note><div>caf\xE9</div></en-note>]]></content></note></en-export>",
    );
    assert_eq!(notes[0].title, "Café");
    assert_eq!(notes[0].content, "<div>café</div>".as_bytes());
}

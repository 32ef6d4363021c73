//! End-to-end conversion of decoded notes into markdown.

use std::fs::File;

use chrono::{TimeZone, Utc};

use enex2md::enex;
use enex2md::{ConvertConfig, Converter, ResourceType};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn notes(name: &str) -> Vec<enex::Note> {
    let file = File::open(format!("{FIXTURES_DIR}/{name}")).expect("fixture exists");
    enex::decode(file).unwrap().notes
}

#[test]
fn test_sample_note() {
    let converter = Converter::new(ConvertConfig::default()).unwrap();
    let mut note = notes("export.enex").remove(0);

    let md = converter.convert(&mut note).unwrap();
    assert_eq!(
        String::from_utf8(md.content).unwrap(),
        "# Sample note\n\n\
         `tag1` `tag2`\n\n\
         text in the note\n\
         **bold text**\n\
         ![1.jpg](image/1.jpg)\n"
    );

    let image = &md.media["09dde741f3b38c1a954358172cad4c06"];
    assert_eq!(image.name, "1.jpg");
    assert_eq!(image.kind, ResourceType::Image);
    assert!(image.content.starts_with(b"GIF89a"));

    assert_eq!(md.created, Utc.with_ymd_and_hms(2009, 1, 1, 10, 10, 10).unwrap());
    assert_eq!(md.updated, Utc.with_ymd_and_hms(2009, 1, 1, 5, 5, 5).unwrap());
}

#[test]
fn test_note_content_is_normalized_in_place() {
    let converter = Converter::new(ConvertConfig::default()).unwrap();
    let mut note = notes("export.enex").remove(0);
    converter.convert(&mut note).unwrap();

    let content = String::from_utf8(note.content).unwrap();
    assert!(content.contains(r#"<img src="image/1.jpg" alt="1.jpg">"#));
}

#[test]
fn test_todos_highlights_and_files() {
    let converter = Converter::new(ConvertConfig::default()).unwrap();
    let mut note = notes("export.enex").remove(1);

    let md = converter.convert(&mut note).unwrap();
    let text = String::from_utf8(md.content).unwrap();
    assert!(text.starts_with("# Weekly report\n\n`work`\n\n"));
    assert!(text.contains("[x] send the report\n"));
    assert!(text.contains("[ ] book a room\n"));
    assert!(text.contains("<span style=\"background-color: #ffaaaa\">important</span> and *quiet*"));
    assert!(text.contains("[report.pdf](./file/report.pdf)"));

    let file = &md.media["084f886210557e19eafc72449154331e"];
    assert_eq!(file.kind, ResourceType::File);
    assert!(file.content.starts_with(b"%PDF-1.4"));
}

#[test]
fn test_front_matter_with_attributes() {
    let config = ConvertConfig {
        front_matter: true,
        ..Default::default()
    };
    let converter = Converter::new(config).unwrap();
    let mut note = notes("export.enex").remove(1);

    let text = String::from_utf8(converter.convert(&mut note).unwrap().content).unwrap();
    assert!(text.starts_with(
        "---\n\
         title: \"Weekly report\"\n\
         date created: 2020-12-20T22:33:44Z\n\
         date modified: 2020-12-21T08:00:00Z\n\
         tags: [\"work\"]\n\
         author: \"Jane Doe\"\n\
         ---\n\n\
         # Weekly report\n"
    ));
}

#[test]
fn test_empty_note_converts() {
    let converter = Converter::new(ConvertConfig::default()).unwrap();
    let mut note = notes("empty.enex").remove(0);
    let md = converter.convert(&mut note).unwrap();
    assert_eq!(md.content, b"# Empty note\n");
    assert!(md.media.is_empty());
}

#[test]
fn test_repaired_note_converts() {
    let converter = Converter::new(ConvertConfig::default()).unwrap();
    let mut note = notes("cdata.enex").remove(0);
    let md = converter.convert(&mut note).unwrap();
    assert_eq!(md.content, b"# Snippet\n\nbefore inner after\n");
}

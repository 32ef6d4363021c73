//! Detection and repair of nested CDATA sections.
//!
//! Evernote occasionally writes literal `<![CDATA[` delimiters inside an
//! already open CDATA section. That is not well-formed XML and makes the
//! parser stop with an unexpected end of input, so such documents are
//! rewritten before decoding.

use std::io::{self, Cursor, Read};
use std::sync::LazyLock;

use memchr::memmem;
use regex::Regex;

const CDATA_OPEN: &[u8] = b"<![CDATA[";
const CDATA_CLOSE: &[u8] = b"]]>";

/// Number of leading bytes inspected by [`detect_nested_cdata`].
///
/// The broken sections always show up in the first note of an export.
pub const SCAN_SIZE: u64 = 8192;

static CDATA_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("CDATA_SECTION: hardcoded regex is valid")
});

/// Scan the first [`SCAN_SIZE`] bytes of `reader` for nested CDATA.
///
/// Returns whether the document needs [`remove_nested_cdata`], together with
/// a reader that replays the scanned prefix followed by the rest of the
/// input, so nothing is lost to the caller.
pub fn detect_nested_cdata<R: Read>(mut reader: R) -> io::Result<(bool, impl Read)> {
    let mut prefix = Vec::with_capacity(SCAN_SIZE as usize);
    reader.by_ref().take(SCAN_SIZE).read_to_end(&mut prefix)?;

    let needs_fix = has_nested_cdata(&prefix);
    Ok((needs_fix, Cursor::new(prefix).chain(reader)))
}

/// Check whether `input` holds unbalanced or nested CDATA sections.
///
/// Two signals are used: more than one opening marker with a different
/// number of closing markers, or a section whose body contains another
/// opening marker before its own closing one.
pub fn has_nested_cdata(input: &[u8]) -> bool {
    let opening = memmem::find_iter(input, CDATA_OPEN).count();
    let closing = memmem::find_iter(input, CDATA_CLOSE).count();
    if opening > 1 && opening != closing {
        return true;
    }

    let mut rest = input;
    while let Some(start) = memmem::find(rest, CDATA_OPEN) {
        let body = &rest[start + CDATA_OPEN.len()..];
        let Some(end) = memmem::find(body, CDATA_CLOSE) else {
            break;
        };
        if memmem::find(&body[..end], CDATA_OPEN).is_some() {
            return true;
        }
        rest = &body[end + CDATA_CLOSE.len()..];
    }

    false
}

/// Replace every CDATA section with its inner text until none is left.
///
/// The markers themselves are dropped, the text they wrapped is kept.
/// Applying the function twice yields the same result as applying it once.
pub fn remove_nested_cdata(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = CDATA_SECTION.replace_all(&current, "$1").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detects_nested_section() {
        assert!(has_nested_cdata(b"<c><![CDATA[a<![CDATA[b]]>c]]></c>"));
    }

    #[test]
    fn test_detects_unbalanced_markers() {
        assert!(has_nested_cdata(b"<![CDATA[a]]><![CDATA[b"));
    }

    #[test]
    fn test_single_unclosed_section_is_not_flagged() {
        // A lone opening marker is a truncated scan window, not corruption
        assert!(!has_nested_cdata(b"<content><![CDATA[<en-note>"));
    }

    #[test]
    fn test_well_formed_sections_pass() {
        assert!(!has_nested_cdata(b"<a><![CDATA[x]]></a><b><![CDATA[y]]></b>"));
        assert!(!has_nested_cdata(b"<a>plain</a>"));
    }

    #[test]
    fn test_detects_nesting_after_clean_section() {
        assert!(has_nested_cdata(
            b"<![CDATA[x]]><![CDATA[a<![CDATA[b]]>c]]>"
        ));
    }

    #[test]
    fn test_repair_nested() {
        assert_eq!(remove_nested_cdata("<![CDATA[a<![CDATA[b]]>c]]>"), "abc");
    }

    #[test]
    fn test_repair_keeps_multiline_text() {
        let input = "<content><![CDATA[<en-note>\n<div>hi</div>\n</en-note>]]></content>";
        assert_eq!(
            remove_nested_cdata(input),
            "<content><en-note>\n<div>hi</div>\n</en-note></content>"
        );
    }

    #[test]
    fn test_detect_replays_the_whole_stream() {
        let mut doc = b"<en-export><![CDATA[a<![CDATA[b]]>c]]>".to_vec();
        doc.extend(std::iter::repeat_n(b'x', 20_000));

        let (needs_fix, mut reader) = detect_nested_cdata(doc.as_slice()).unwrap();
        assert!(needs_fix);

        let mut replayed = Vec::new();
        reader.read_to_end(&mut replayed).unwrap();
        assert_eq!(replayed, doc);
    }

    #[test]
    fn test_detect_only_looks_at_the_prefix() {
        let mut doc = vec![b' '; SCAN_SIZE as usize];
        doc.extend_from_slice(b"<![CDATA[a<![CDATA[b]]>c]]>");

        let (needs_fix, _) = detect_nested_cdata(doc.as_slice()).unwrap();
        assert!(!needs_fix);
    }

    proptest! {
        #[test]
        fn prop_repair_is_idempotent(
            parts in prop::collection::vec(
                prop_oneof![
                    Just("<![CDATA[".to_string()),
                    Just("]]>".to_string()),
                    "[a-c<>\\] ]{0,4}",
                ],
                0..16,
            )
        ) {
            let s = parts.concat();
            let once = remove_nested_cdata(&s);
            prop_assert_eq!(remove_nested_cdata(&once), once.clone());

            // No complete section survives the repair
            if let Some(open) = once.find("<![CDATA[") {
                prop_assert!(!once[open..].contains("]]>"));
            }
        }

        #[test]
        fn prop_nested_sections_are_detected(
            head in "[a-z ]{0,16}",
            inner in "[a-z ]{0,16}",
            tail in "[a-z ]{0,16}",
        ) {
            let doc = format!("<x><![CDATA[{head}<![CDATA[{inner}]]>{tail}]]></x>");
            prop_assert!(has_nested_cdata(doc.as_bytes()));
        }
    }
}

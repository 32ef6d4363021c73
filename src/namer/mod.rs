//! File names for embedded resources.
//!
//! Every resource of a note ends up as a file next to the markdown text, so
//! its name has to be legal on the target filesystem, readable, and unique
//! within the note. Names are derived in three steps:
//!
//! 1. [`guess_name`] picks a candidate from the resource metadata.
//! 2. [`resource_name`] splits it into base and extension and sanitizes the
//!    base with [`base_name`].
//! 3. [`NameRegistry`] appends `-<n>` to repeated names.

mod mime;

pub use mime::{guess_ext, is_image};

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::enex::{Data, Resource};
use crate::error::{Error, Result};

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[./]").expect("SEPARATORS: hardcoded regex is valid"));

#[cfg(not(windows))]
const ILLEGAL_PATTERN: &str = r"[\s:]";
#[cfg(windows)]
const ILLEGAL_PATTERN: &str = r#"[\s\\|"'<>&_=+:?*]"#;

static ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ILLEGAL_PATTERN).expect("ILLEGAL: hardcoded regex is valid"));

static DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\-_]{2,}").expect("DASHES: hardcoded regex is valid"));

static NAME_AND_EXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(.*)(\.[0-9A-Za-z_]+)").expect("NAME_AND_EXT: hardcoded regex is valid")
});

/// Filesystem limits applied to sanitized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameLimits {
    /// Upper bound on the byte length of a sanitized base name.
    pub max_name_bytes: usize,
}

impl NameLimits {
    /// Windows path components stop at 255 bytes, minus room for `.md`.
    pub const WINDOWS: NameLimits = NameLimits { max_name_bytes: 245 };
    /// Empirical limit of macOS file names; Linux is laxer still.
    pub const UNIX: NameLimits = NameLimits { max_name_bytes: 704 };
}

impl Default for NameLimits {
    fn default() -> Self {
        if cfg!(windows) {
            Self::WINDOWS
        } else {
            Self::UNIX
        }
    }
}

/// Pick the raw name candidate for a resource.
///
/// Priority: file name attribute, basename of the source URL, resource
/// identifier, resource type. The first non-empty one wins.
pub fn guess_name(resource: &Resource) -> String {
    let attributes = &resource.attributes;
    if !attributes.filename.is_empty() {
        return attributes.filename.clone();
    }
    if !attributes.source_url.is_empty() {
        let base = url_basename(&attributes.source_url);
        if !base.is_empty() {
            return base;
        }
    }
    if !resource.id.is_empty() {
        return resource.id.clone();
    }
    resource.kind.clone()
}

/// Last path segment of a URL, without query or fragment, percent-decoded.
fn url_basename(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    percent_decode_str(segment)
        .decode_utf8_lossy()
        .trim()
        .to_string()
}

/// Split `name` into base and extension (with the dot).
///
/// The split happens at the last dot followed by word characters; `None`
/// when there is no such dot.
pub fn split_name(name: &str) -> Option<(&str, &str)> {
    let caps = NAME_AND_EXT.captures(name)?;
    let base = caps.get(1)?.as_str();
    let ext = caps.get(2)?.as_str();
    Some((base, ext))
}

/// Sanitize `name` into a safe file name.
///
/// Dots and slashes become dashes, surrounding spaces are trimmed,
/// characters the platform rejects become underscores, and runs of dashes
/// and underscores collapse into a single dash. The result is cut to
/// [`NameLimits::max_name_bytes`] on a character boundary.
pub fn base_name(name: &str, limits: &NameLimits) -> String {
    let name = SEPARATORS.replace_all(name, "-");
    let name = name.trim_matches(' ');
    let name = ILLEGAL.replace_all(name, "_");
    let name = DASHES.replace_all(&name, "-");
    truncate_bytes(&name, limits.max_name_bytes).to_string()
}

/// Longest prefix of `name` that fits in `max` bytes.
fn truncate_bytes(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Sanitized base name and extension of a resource.
///
/// When the candidate name carries no extension it is guessed from the
/// MIME type.
pub fn resource_name(resource: &Resource, limits: &NameLimits) -> (String, String) {
    let candidate = guess_name(resource);
    match split_name(&candidate) {
        Some((base, ext)) => (base_name(base, limits), ext.to_string()),
        None => (
            base_name(&candidate, limits),
            guess_ext(&resource.mime).to_string(),
        ),
    }
}

/// Per-note record of the names handed out so far.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    seen: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `base + ext`, or `base-<n> + ext` if that name was already used.
    ///
    /// Comparison is case-insensitive since common filesystems are. `n`
    /// counts the earlier collisions, so the second `photo.jpg` becomes
    /// `photo-1.jpg` and the third `photo-2.jpg`.
    pub fn unique(&mut self, base: &str, ext: &str) -> String {
        self.unique_within(base, ext, usize::MAX)
    }

    /// Like [`unique`](Self::unique), but a suffixed base is shortened so
    /// that it still fits in `max_base_bytes`.
    pub fn unique_within(&mut self, base: &str, ext: &str, max_base_bytes: usize) -> String {
        let name = format!("{base}{ext}");
        let key = name.to_lowercase();
        let Some(&first) = self.seen.get(&key) else {
            self.seen.insert(key, 1);
            return name;
        };

        // A suffixed name may be taken already, e.g. by a resource that is
        // literally called `photo-1.jpg`.
        let mut n = first;
        loop {
            let suffix = format!("-{n}");
            let room = max_base_bytes.saturating_sub(suffix.len());
            let candidate = format!("{}{suffix}{ext}", truncate_bytes(base, room));
            let candidate_key = candidate.to_lowercase();
            n += 1;
            if !self.seen.contains_key(&candidate_key) {
                self.seen.insert(key, n);
                self.seen.insert(candidate_key, 1);
                return candidate;
            }
        }
    }
}

/// Decode the binary payload of a resource.
///
/// Declared base64 is decoded with whitespace removed. Undeclared content
/// that looks like base64 is decoded as well, since some exporters drop the
/// `encoding` attribute; anything else is returned as is.
pub fn decode_payload(data: &Data, name: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = data
        .content
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if data.encoding.eq_ignore_ascii_case("base64") {
        return STANDARD.decode(&compact).map_err(|source| Error::Payload {
            name: name.to_string(),
            source,
        });
    }

    if data.encoding.is_empty()
        && looks_like_base64(&compact)
        && let Ok(decoded) = STANDARD.decode(&compact)
    {
        return Ok(decoded);
    }

    Ok(data.content.clone())
}

fn looks_like_base64(compact: &[u8]) -> bool {
    if compact.is_empty() || compact.len() % 4 != 0 {
        return false;
    }
    let body = compact
        .strip_suffix(b"==")
        .or_else(|| compact.strip_suffix(b"="))
        .unwrap_or(compact);
    body.iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enex::ResourceAttributes;
    use proptest::prelude::*;

    fn named(filename: &str) -> Resource {
        Resource {
            attributes: ResourceAttributes {
                filename: filename.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_guess_name_priority() {
        let mut resource = Resource {
            id: "abc".to_string(),
            kind: "image".to_string(),
            ..Default::default()
        };
        assert_eq!(guess_name(&resource), "abc");

        resource.attributes.source_url = "https://example.com/a/photo%20one.png?w=1#top".to_string();
        assert_eq!(guess_name(&resource), "photo one.png");

        resource.attributes.filename = "scan.pdf".to_string();
        assert_eq!(guess_name(&resource), "scan.pdf");

        let bare = Resource {
            kind: "image".to_string(),
            ..Default::default()
        };
        assert_eq!(guess_name(&bare), "image");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("1.jpg"), Some(("1", ".jpg")));
        assert_eq!(split_name("archive.tar.gz"), Some(("archive.tar", ".gz")));
        assert_eq!(split_name("README"), None);
    }

    #[test]
    fn test_base_name_sanitizes_url_like_names() {
        let limits = NameLimits::UNIX;
        let (base, ext) = split_name("complex?path=http://image.com/2.gif").unwrap();
        assert_eq!(base_name(base, &limits), "complex?path=http-image-com-2");
        assert_eq!(ext, ".gif");
    }

    #[test]
    fn test_base_name_windows_rules() {
        if cfg!(windows) {
            assert_eq!(base_name("a<b>c", &NameLimits::WINDOWS), "a_b_c");
        } else {
            assert_eq!(base_name("two words: here", &NameLimits::UNIX), "two_words-here");
        }
    }

    #[test]
    fn test_base_name_trims_spaces() {
        assert_eq!(base_name("  name  ", &NameLimits::default()), "name");
    }

    #[test]
    fn test_base_name_truncates_on_char_boundary() {
        let limits = NameLimits { max_name_bytes: 5 };
        // "é" is two bytes, the cut must not land inside one
        assert_eq!(base_name("aaéé", &limits), "aaé");
    }

    #[test]
    fn test_resource_name_uses_mime_without_extension() {
        let resource = Resource {
            id: "c9e6c70ea74388346ffa16ff8edbdf58".to_string(),
            mime: "image/png".to_string(),
            ..Default::default()
        };
        assert_eq!(
            resource_name(&resource, &NameLimits::default()),
            ("c9e6c70ea74388346ffa16ff8edbdf58".to_string(), ".png".to_string())
        );
    }

    #[test]
    fn test_registry_suffixes_in_order() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.unique("1", ".jpg"), "1.jpg");
        assert_eq!(registry.unique("1", ".jpg"), "1-1.jpg");
        assert_eq!(registry.unique("1", ".JPG"), "1-2.JPG");
        assert_eq!(registry.unique("2", ".jpg"), "2.jpg");
    }

    #[test]
    fn test_registry_skips_taken_suffix() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.unique("a-1", ".png"), "a-1.png");
        assert_eq!(registry.unique("a", ".png"), "a.png");
        assert_eq!(registry.unique("a", ".png"), "a-2.png");
    }

    #[test]
    fn test_registry_suffix_fits_the_limit() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.unique_within("abcdefgh", "", 8), "abcdefgh");
        assert_eq!(registry.unique_within("abcdefgh", "", 8), "abcdef-1");
        assert_eq!(registry.unique_within("abcdefgh", ".md", 8), "abcdefgh.md");
        assert_eq!(registry.unique_within("abcdefgh", "", 8), "abcdef-2");
    }

    #[test]
    fn test_decode_declared_base64_with_line_breaks() {
        let data = Data {
            encoding: "base64".to_string(),
            content: b"aGVs\nbG8=\n".to_vec(),
        };
        assert_eq!(decode_payload(&data, "x").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_invalid_base64_names_the_resource() {
        let data = Data {
            encoding: "base64".to_string(),
            content: b"***".to_vec(),
        };
        let err = decode_payload(&data, "broken.png").unwrap_err();
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn test_decode_sniffs_unlabelled_base64() {
        let data = Data {
            encoding: String::new(),
            content: b"aGVsbG8gd29ybGQ=".to_vec(),
        };
        assert_eq!(decode_payload(&data, "x").unwrap(), b"hello world");
    }

    #[test]
    fn test_decode_sniff_also_takes_base64_shaped_words() {
        // Raw text that happens to be valid base64 is decoded too
        let data = Data {
            encoding: String::new(),
            content: b"abcd".to_vec(),
        };
        assert_eq!(decode_payload(&data, "x").unwrap(), [0x69, 0xb7, 0x1d]);
    }

    #[test]
    fn test_decode_keeps_raw_content() {
        let data = Data {
            encoding: String::new(),
            content: b"plain text, not base64!".to_vec(),
        };
        assert_eq!(decode_payload(&data, "x").unwrap(), data.content);
    }

    #[test]
    fn test_named_resource() {
        let (base, ext) = resource_name(&named("1.jpg"), &NameLimits::default());
        assert_eq!((base.as_str(), ext.as_str()), ("1", ".jpg"));
    }

    proptest! {
        #[test]
        fn prop_registry_names_are_unique(count in 1usize..20, base in "[a-z]{1,8}") {
            let mut registry = NameRegistry::new();
            let names: Vec<_> = (0..count).map(|_| registry.unique(&base, ".jpg")).collect();

            let distinct: std::collections::HashSet<_> = names.iter().collect();
            prop_assert_eq!(distinct.len(), count);
            prop_assert_eq!(&names[0], &format!("{base}.jpg"));
            let suffixed = names.iter().filter(|n| n.as_str() != format!("{base}.jpg")).count();
            prop_assert_eq!(suffixed, count - 1);
        }

        #[test]
        fn prop_suffixed_names_respect_limit(count in 1usize..12, base in "[a-zé]{1,12}", max in 3usize..10) {
            let mut registry = NameRegistry::new();
            let base = truncate_bytes(&base, max).to_string();
            let names: Vec<_> = (0..count).map(|_| registry.unique_within(&base, "", max)).collect();

            let distinct: std::collections::HashSet<_> = names.iter().collect();
            prop_assert_eq!(distinct.len(), count);
            for name in &names {
                prop_assert!(name.len() <= max);
            }
        }

        #[test]
        fn prop_base_name_respects_limit(name in "\\PC{0,64}", max in 1usize..32) {
            let limits = NameLimits { max_name_bytes: max };
            prop_assert!(base_name(&name, &limits).len() <= max);
        }
    }
}

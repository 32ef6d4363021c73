//! Note-level conversion: from a decoded [`Note`] to markdown text plus the
//! media files it references.
//!
//! [`Converter::convert`] runs a fixed pipeline:
//!
//! 1. decode and name every resource
//! 2. normalize the note markup ([`crate::normalize`])
//! 3. render markdown ([`crate::markdown`])
//! 4. prepend the tag line and the title
//! 5. canonicalize whitespace
//! 6. parse the note dates
//! 7. prepend front matter, when enabled
//!
//! The first failing step ends the conversion of that note.
//!
//! ```
//! use enex2md::{ConvertConfig, Converter};
//! use enex2md::enex::Note;
//!
//! let converter = Converter::new(ConvertConfig::default())?;
//! let mut note = Note {
//!     title: "Sample note".to_string(),
//!     content: b"<div>hi</div>".to_vec(),
//!     ..Default::default()
//! };
//! let md = converter.convert(&mut note)?;
//! assert_eq!(md.content, b"# Sample note\n\nhi\n");
//! # Ok::<(), enex2md::Error>(())
//! ```

mod front_matter;

pub use front_matter::DEFAULT_FRONT_MATTER;

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};

use crate::enex::{Note, Resource};
use crate::error::{Error, Result};
use crate::markdown::{self, RenderOptions};
use crate::namer::{self, NameLimits, NameRegistry};
use crate::normalize::normalize_html;

use front_matter::FrontMatter;

/// Tag template used when none is configured. Tags may contain spaces.
pub const DEFAULT_TAG_TEMPLATE: &str = "`{{tag}}`";

const TAG_TOKEN: &str = "{{tag}}";

/// Format of note dates in exports, always UTC.
const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("NEWLINE_RUNS: hardcoded regex is valid"));

static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("SPACES: hardcoded regex is valid"));

/// How a resource is referenced from the markdown text, and the directory
/// it is saved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Image,
    File,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::File => "file",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded resource, ready to be written next to its note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownResource {
    /// File name, unique within the note.
    pub name: String,
    pub kind: ResourceType,
    pub content: Vec<u8>,
}

/// Result of converting one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownNote {
    /// Markdown text, ending with exactly one newline.
    pub content: Vec<u8>,
    /// Resources keyed by identifier, or by position when they have none.
    pub media: HashMap<String, MarkdownResource>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Configuration for [`Converter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Template for each tag of the tag line. Must contain `{{tag}}`
    /// exactly once; empty means [`DEFAULT_TAG_TEMPLATE`].
    pub tag_template: String,
    /// Keep highlighted text highlighted in the output.
    pub highlights: bool,
    /// Prepend a front matter block.
    pub front_matter: bool,
    /// Custom front matter template, see [`DEFAULT_FRONT_MATTER`].
    pub front_matter_template: Option<String>,
    /// Limits applied to resource and note file names.
    pub name_limits: NameLimits,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            tag_template: DEFAULT_TAG_TEMPLATE.to_string(),
            highlights: true,
            front_matter: false,
            front_matter_template: None,
            name_limits: NameLimits::default(),
        }
    }
}

/// Converts notes to markdown.
///
/// Holds the configuration and the names handed out to notes so far, so one
/// converter should be used per output directory.
#[derive(Debug)]
pub struct Converter {
    tag_template: String,
    render: RenderOptions,
    front_matter: Option<FrontMatter>,
    limits: NameLimits,
    note_names: NameRegistry,
}

impl Converter {
    /// Create a converter, validating the templates of `config`.
    pub fn new(config: ConvertConfig) -> Result<Self> {
        let tag_template = if config.tag_template.is_empty() {
            DEFAULT_TAG_TEMPLATE.to_string()
        } else {
            config.tag_template
        };
        if tag_template.matches(TAG_TOKEN).count() != 1 {
            return Err(Error::TagTemplate(tag_template));
        }

        let front_matter = if config.front_matter {
            Some(FrontMatter::new(config.front_matter_template.as_deref())?)
        } else {
            None
        };

        Ok(Self {
            tag_template,
            render: RenderOptions {
                highlights: config.highlights,
            },
            front_matter,
            limits: config.name_limits,
            note_names: NameRegistry::new(),
        })
    }

    /// Convert `note`.
    ///
    /// The note content is replaced by its normalized markup on the way.
    pub fn convert(&self, note: &mut Note) -> Result<MarkdownNote> {
        let media = self.map_resources(&note.resources)?;
        note.content = normalize_html(&note.content, &media)?;

        let mut content = String::new();
        if !note.title.is_empty() {
            content.push_str(&format!("# {}\n\n", markdown::escape_markdown(&note.title)));
        }
        if !note.tags.is_empty() {
            content.push_str(&self.tag_line(&note.tags));
            content.push_str("\n\n");
        }
        content.push_str(&markdown::convert(&note.content, &self.render));
        let mut content = canonicalize_whitespace(&content);

        let created = parse_date(&note.created);
        let updated = parse_date(&note.updated);

        if let Some(front_matter) = &self.front_matter {
            content = front_matter.render(note, created, updated)? + &content;
        }

        debug!(title = %note.title, resources = media.len(), "converted note");
        Ok(MarkdownNote {
            content: content.into_bytes(),
            media,
            created,
            updated,
        })
    }

    /// A file name for a note with this title, unique among the names this
    /// converter returned before.
    pub fn unique_note_name(&mut self, title: &str) -> String {
        let name = namer::base_name(title, &self.limits);
        let name = if name.is_empty() { "untitled" } else { name.as_str() };
        self.note_names.unique_within(name, "", self.limits.max_name_bytes)
    }

    fn map_resources(&self, resources: &[Resource]) -> Result<HashMap<String, MarkdownResource>> {
        let mut names = NameRegistry::new();
        resources
            .iter()
            .enumerate()
            .map(|(index, resource)| {
                let (base, ext) = namer::resource_name(resource, &self.limits);
                let name = names.unique_within(&base, &ext, self.limits.max_name_bytes);
                let content = namer::decode_payload(&resource.data, &name)?;
                let kind = if namer::is_image(&resource.mime) {
                    ResourceType::Image
                } else {
                    ResourceType::File
                };
                let key = if resource.id.is_empty() {
                    index.to_string()
                } else {
                    resource.id.clone()
                };
                debug!(%key, %name, %kind, bytes = content.len(), "mapped resource");
                Ok((key, MarkdownResource { name, kind, content }))
            })
            .collect()
    }

    fn tag_line(&self, tags: &[String]) -> String {
        let custom = self.tag_template != DEFAULT_TAG_TEMPLATE;
        tags.iter()
            .map(|tag| {
                let tag = if custom {
                    SPACES.replace_all(tag, "_")
                } else {
                    tag.into()
                };
                self.tag_template.replacen(TAG_TOKEN, &tag, 1)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Collapse runs of three or more newlines to two and end the text with
/// exactly one newline.
pub fn canonicalize_whitespace(content: &str) -> String {
    let collapsed = NEWLINE_RUNS.replace_all(content, "\n\n");
    let mut result = collapsed.trim_end_matches('\n').to_string();
    result.push('\n');
    result
}

/// Parse an export date, falling back to the current time.
pub fn parse_date(value: &str) -> DateTime<Utc> {
    match NaiveDateTime::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => date.and_utc(),
        Err(e) => {
            warn!(date = value, error = %e, "invalid note date, using current time");
            Utc::now()
        }
    }
}

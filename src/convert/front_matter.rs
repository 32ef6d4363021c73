use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Captures, Regex};
use serde_json::Value;

use crate::enex::Note;
use crate::error::{Error, Result};

/// Front matter used unless a custom template is configured.
///
/// Tokens: `{{title}}`, `{{created}}`, `{{updated}}`, `{{tags}}` (a whole
/// `tags:` line, or nothing) and `{{attributes}}` (one line per non-empty
/// note attribute).
pub const DEFAULT_FRONT_MATTER: &str = "---
title: {{title}}
date created: {{created}}
date modified: {{updated}}
{{tags}}{{attributes}}---
";

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("TOKEN: hardcoded regex is valid"));

#[derive(Debug, Clone)]
pub(super) struct FrontMatter {
    template: String,
}

impl FrontMatter {
    pub fn new(template: Option<&str>) -> Result<Self> {
        let template = template.unwrap_or(DEFAULT_FRONT_MATTER);
        if template.lines().next().map(str::trim_end) != Some("---") {
            return Err(Error::FrontMatterTemplate(
                "must start with a --- line".to_string(),
            ));
        }
        if !template.contains("{{title}}") {
            return Err(Error::FrontMatterTemplate(
                "must contain {{title}}".to_string(),
            ));
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Render the block for `note`, followed by a blank line.
    ///
    /// Strings are written as JSON strings, which YAML reads back verbatim.
    pub fn render(&self, note: &Note, created: DateTime<Utc>, updated: DateTime<Utc>) -> Result<String> {
        let title = quote(&note.title)?;
        let created = created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let updated = updated.to_rfc3339_opts(SecondsFormat::Secs, true);
        let tags = if note.tags.is_empty() {
            String::new()
        } else {
            let list = serde_json::to_string(&note.tags).map_err(|e| Error::Serialize(e.to_string()))?;
            format!("tags: {list}\n")
        };
        let attributes = attribute_lines(note)?;

        let block = TOKEN.replace_all(&self.template, |caps: &Captures<'_>| match &caps[1] {
            "title" => title.clone(),
            "created" => created.clone(),
            "updated" => updated.clone(),
            "tags" => tags.clone(),
            "attributes" => attributes.clone(),
            _ => caps[0].to_string(),
        });

        let mut block = block.into_owned();
        if !block.ends_with('\n') {
            block.push('\n');
        }
        block.push('\n');
        Ok(block)
    }
}

fn quote(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialize(e.to_string()))
}

/// `key: "value"` lines for the non-empty attributes, in key order.
fn attribute_lines(note: &Note) -> Result<String> {
    let value = serde_json::to_value(&note.attributes).map_err(|e| Error::Serialize(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Ok(String::new());
    };

    let mut lines = String::new();
    for (key, value) in fields {
        if value.as_str().is_some_and(|s| !s.is_empty()) {
            lines.push_str(&format!("{key}: {value}\n"));
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enex::NoteAttributes;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 12, 2, 11, 22, 33).unwrap()
    }

    #[test]
    fn test_default_front_matter() {
        let note = Note {
            title: "Say \"hi\"".to_string(),
            tags: vec!["one".to_string(), "two words".to_string()],
            attributes: NoteAttributes {
                author: "Jane".to_string(),
                source_url: "https://example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let block = FrontMatter::new(None).unwrap().render(&note, date(), date()).unwrap();
        assert_eq!(
            block,
            "---\n\
             title: \"Say \\\"hi\\\"\"\n\
             date created: 2012-12-02T11:22:33Z\n\
             date modified: 2012-12-02T11:22:33Z\n\
             tags: [\"one\",\"two words\"]\n\
             author: \"Jane\"\n\
             source-url: \"https://example.com\"\n\
             ---\n\n"
        );
    }

    #[test]
    fn test_no_tags_no_attributes() {
        let note = Note {
            title: "T".to_string(),
            ..Default::default()
        };
        let block = FrontMatter::new(None).unwrap().render(&note, date(), date()).unwrap();
        assert!(block.ends_with("date modified: 2012-12-02T11:22:33Z\n---\n\n"));
    }

    #[test]
    fn test_custom_template() {
        let template = "---\nname: {{title}}\nunknown: {{nope}}\n---";
        let note = Note {
            title: "{{created}}".to_string(),
            ..Default::default()
        };
        let block = FrontMatter::new(Some(template)).unwrap().render(&note, date(), date()).unwrap();
        assert_eq!(block, "---\nname: \"{{created}}\"\nunknown: {{nope}}\n---\n\n");
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            FrontMatter::new(Some("title: {{title}}\n---")),
            Err(Error::FrontMatterTemplate(_))
        ));
        assert!(matches!(
            FrontMatter::new(Some("---\ndate: {{created}}\n---")),
            Err(Error::FrontMatterTemplate(_))
        ));
    }
}

//! Markdown generation from normalized note markup.
//!
//! - [`escape`]: escaping of note text and fence sizing
//! - [`render`]: tree walk producing the markdown text
//!
//! The output targets GitHub Flavored Markdown:
//!
//! - Evernote lines (`<div>`) become lines, paragraphs and headings are
//!   separated by a blank line
//! - `<en-todo>` checkboxes become `[x] ` / `[ ] ` task markers
//! - highlighted text keeps its color through an inline HTML span, unless
//!   disabled in [`RenderOptions`]
//! - code blocks use the shortest backtick fence that does not clash with
//!   their content
//! - tables become pipe tables, the first row acting as header

mod escape;
mod render;

pub use escape::{code_fence, escape_markdown, inline_code_ticks};
pub use render::{HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN, RenderContext, RenderOptions, convert};

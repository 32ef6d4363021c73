//! Markdown escaping and fence sizing.

/// Escape characters that would otherwise turn plain note text into
/// markdown syntax.
///
/// Inline markers (`\`, `*`, `_`, `` ` ``, `[`, `]`, `|`, `<`) are always
/// escaped. Block markers are only escaped where they take effect: `#` and
/// `>` at the start of a line, `-` and `+` at the start of a line when a
/// space follows, `!` before `[` and `~` before another `~`.
///
/// ```
/// use enex2md::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("a - b"), "a - b");
/// assert_eq!(escape_markdown("- item"), "\\- item");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut chars = text.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        let escape = match c {
            '\\' | '*' | '_' | '`' | '[' | ']' | '|' | '<' => true,
            '#' | '>' => at_line_start,
            '-' | '+' => at_line_start && next == Some(' '),
            '!' => next == Some('['),
            '~' => next == Some('~'),
            _ => false,
        };
        if escape {
            result.push('\\');
        }
        result.push(c);
        at_line_start = c == '\n';
    }

    result
}

/// Length of the longest run of `ch` in `content`.
fn longest_run(content: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Backtick fence for a code block: at least three, and longer than any
/// backtick run inside `content`.
pub fn code_fence(content: &str) -> String {
    "`".repeat((longest_run(content, '`') + 1).max(3))
}

/// Backticks delimiting inline code, one more than the longest run inside.
pub fn inline_code_ticks(content: &str) -> String {
    "`".repeat(longest_run(content, '`') + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_inline_markers() {
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
        assert_eq!(escape_markdown("_x_"), "\\_x\\_");
        assert_eq!(escape_markdown("[link]"), "\\[link\\]");
        assert_eq!(escape_markdown("`code`"), "\\`code\\`");
        assert_eq!(escape_markdown("a | b"), "a \\| b");
        assert_eq!(escape_markdown("<tag>"), "\\<tag>");
    }

    #[test]
    fn test_escape_line_start_markers() {
        assert_eq!(escape_markdown("# heading"), "\\# heading");
        assert_eq!(escape_markdown("issue #5"), "issue #5");
        assert_eq!(escape_markdown("> quote"), "\\> quote");
        assert_eq!(escape_markdown("a > b"), "a > b");
        assert_eq!(escape_markdown("+ item\n- item"), "\\+ item\n\\- item");
        assert_eq!(escape_markdown("-5 degrees"), "-5 degrees");
    }

    #[test]
    fn test_escape_image_and_strike() {
        assert_eq!(escape_markdown("![alt]"), "\\!\\[alt\\]");
        assert_eq!(escape_markdown("wow!"), "wow!");
        assert_eq!(escape_markdown("~~x~~"), "\\~~x\\~~");
        assert_eq!(escape_markdown("~5"), "~5");
    }

    #[test]
    fn test_code_fence() {
        assert_eq!(code_fence("let x = 1;"), "```");
        assert_eq!(code_fence("``"), "```");
        assert_eq!(code_fence("```"), "````");
        assert_eq!(code_fence("`` and ````"), "`````");
    }

    #[test]
    fn test_inline_code_ticks() {
        assert_eq!(inline_code_ticks("code"), "`");
        assert_eq!(inline_code_ticks("a ` b"), "``");
    }
}

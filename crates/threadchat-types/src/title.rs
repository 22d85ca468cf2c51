/// Title every thread starts with until a reply names it.
pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// Maximum length of a derived title, in characters, including the ellipsis.
pub const TITLE_MAX_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

/// Derive a short thread title from an assistant reply.
///
/// Picks the first line that still has text once markdown decoration is
/// stripped. Code blocks and horizontal rules are skipped. The result is
/// whitespace-collapsed and cut to [`TITLE_MAX_CHARS`]. Returns `None` when
/// the reply has no usable line.
pub fn derive_title(reply: &str) -> Option<String> {
    let mut in_fence = false;

    for raw in reply.lines() {
        let line = raw.trim();

        if line.starts_with("```") || line.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || is_rule(line) {
            continue;
        }

        let text = strip_markup(line);
        if !text.is_empty() {
            return Some(truncate(&text, TITLE_MAX_CHARS));
        }
    }

    None
}

fn is_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.iter().all(|c| c == marker))
}

fn strip_markup(line: &str) -> String {
    let mut rest = line.trim_start_matches('#').trim_start();

    while let Some(stripped) = rest.strip_prefix('>') {
        rest = stripped.trim_start();
    }

    for bullet in ["- ", "* ", "+ "] {
        if let Some(stripped) = rest.strip_prefix(bullet) {
            rest = stripped;
            break;
        }
    }

    rest = strip_ordinal(rest);

    let cleaned: String = rest
        .replace("**", "")
        .replace("__", "")
        .chars()
        .filter(|c| *c != '*' && *c != '`')
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips `1. ` / `12) ` list numbering.
fn strip_ordinal(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    let after = &line[digits..];
    after
        .strip_prefix(". ")
        .or_else(|| after.strip_prefix(") "))
        .unwrap_or(line)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str(ELLIPSIS);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_first_line() {
        assert_eq!(
            derive_title("Rust ownership explained\nMore text").as_deref(),
            Some("Rust ownership explained")
        );
    }

    #[test]
    fn test_skips_blank_lines_and_heading_marks() {
        let reply = "\n\n## **Getting started** with `cargo`\n\nBody";
        assert_eq!(
            derive_title(reply).as_deref(),
            Some("Getting started with cargo")
        );
    }

    #[test]
    fn test_skips_code_blocks_and_rules() {
        let reply = "```rust\nfn main() {}\n```\n---\n> 1. Use the borrow checker";
        assert_eq!(
            derive_title(reply).as_deref(),
            Some("Use the borrow checker")
        );
    }

    #[test]
    fn test_keeps_single_underscores() {
        assert_eq!(
            derive_title("- call snake_case_fn").as_deref(),
            Some("call snake_case_fn")
        );
    }

    #[test]
    fn test_truncates_long_lines() {
        let reply = "word ".repeat(40);
        let title = derive_title(&reply).unwrap();

        assert!(title.chars().count() <= TITLE_MAX_CHARS);
        assert!(title.ends_with("..."));
        assert!(!title.contains("  "));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let reply = "é".repeat(60);
        let title = derive_title(&reply).unwrap();
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_no_usable_line() {
        assert_eq!(derive_title(""), None);
        assert_eq!(derive_title("   \n***\n```\ncode only\n```"), None);
    }
}

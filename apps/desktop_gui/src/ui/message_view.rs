//! Pure view-model for chat message rendering.
//!
//! The backend answers in a small markdown subset. Parsing and the
//! score/excerpt formatting live here, independent of egui, so the rules
//! stay unit-testable. Substitution order matters and is preserved: bold
//! spans are recognized first, then literal `---` lines become separators,
//! then blank lines split paragraphs, and remaining newlines become line
//! breaks.

/// Inline span within one rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
}

/// One visual line of a paragraph; empty for a blank line.
pub type Line = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBlock {
    /// Lines separated by single newlines within one paragraph.
    Paragraph(Vec<Line>),
    /// A line consisting of exactly `---`.
    Separator,
}

pub const EXCERPT_MAX_CHARS: usize = 150;
pub const MAX_RENDERED_SOURCES: usize = 3;

pub fn parse_markdown(text: &str) -> Vec<MessageBlock> {
    let mut blocks = Vec::new();
    for paragraph in text.split("\n\n") {
        let mut lines: Vec<Line> = Vec::new();
        for line in paragraph.split('\n') {
            if line == "---" {
                if !lines.is_empty() {
                    blocks.push(MessageBlock::Paragraph(std::mem::take(&mut lines)));
                }
                blocks.push(MessageBlock::Separator);
            } else {
                lines.push(parse_inline(line));
            }
        }
        if !lines.is_empty() {
            blocks.push(MessageBlock::Paragraph(lines));
        }
    }
    blocks
}

/// Splits one line into text and `**bold**` spans. A bold span needs at
/// least one character between its markers; unmatched markers stay literal.
/// Bold never crosses a newline because lines are split first.
fn parse_inline(line: &str) -> Line {
    let mut spans = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = find_closing_marker(after_open) else {
            break;
        };
        if open > 0 {
            spans.push(Inline::Text(rest[..open].to_string()));
        }
        spans.push(Inline::Bold(after_open[..close].to_string()));
        rest = &after_open[close + 2..];
    }
    if !rest.is_empty() {
        spans.push(Inline::Text(rest.to_string()));
    }
    spans
}

fn find_closing_marker(s: &str) -> Option<usize> {
    s.match_indices("**").map(|(i, _)| i).find(|&i| i >= 1)
}

/// Backend scores are distances (lower = more similar); the UI shows
/// `1 - score` to two decimals.
pub fn similarity_label(score: f64) -> String {
    format!("{:.2}", 1.0 - score)
}

/// Keyword scores display as whole hit counts.
pub fn keyword_label(keyword_score: f64) -> String {
    format!("{}", keyword_score.floor() as i64)
}

pub fn source_score_label(score: f64, keyword_score: Option<f64>) -> String {
    match keyword_score {
        Some(keyword_score) => format!(
            "(Similarity: {} | Keywords: {})",
            similarity_label(score),
            keyword_label(keyword_score)
        ),
        None => format!("(Similarity: {})", similarity_label(score)),
    }
}

pub fn truncate_excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_MAX_CHARS {
        content.to_string()
    } else {
        let head: String = content.chars().take(EXCERPT_MAX_CHARS).collect();
        format!("{head}...")
    }
}

/// Badge styling is keyed by the lower-cased confidence value; anything the
/// backend invents beyond high/medium/low renders as a neutral badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Other,
}

pub fn confidence_level(label: &str) -> ConfidenceLevel {
    match label.to_lowercase().as_str() {
        "high" => ConfidenceLevel::High,
        "medium" => ConfidenceLevel::Medium,
        "low" => ConfidenceLevel::Low,
        _ => ConfidenceLevel::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn bold(s: &str) -> Inline {
        Inline::Bold(s.to_string())
    }

    #[test]
    fn substitutions_apply_in_order() {
        // Bold, then a paragraph break, then a separator, then C on its own
        // line after the rule.
        let blocks = parse_markdown("**A**\n\nB\n---\nC");
        assert_eq!(
            blocks,
            vec![
                MessageBlock::Paragraph(vec![vec![bold("A")]]),
                MessageBlock::Paragraph(vec![vec![text("B")]]),
                MessageBlock::Separator,
                MessageBlock::Paragraph(vec![vec![text("C")]]),
            ]
        );
    }

    #[test]
    fn single_newlines_become_line_breaks_within_a_paragraph() {
        let blocks = parse_markdown("first\nsecond");
        assert_eq!(
            blocks,
            vec![MessageBlock::Paragraph(vec![
                vec![text("first")],
                vec![text("second")],
            ])]
        );
    }

    #[test]
    fn bold_spans_mix_with_plain_text() {
        assert_eq!(
            parse_inline("see **Article 12** and **Annex A**."),
            vec![
                text("see "),
                bold("Article 12"),
                text(" and "),
                bold("Annex A"),
                text("."),
            ]
        );
    }

    #[test]
    fn unmatched_or_empty_bold_markers_stay_literal() {
        assert_eq!(parse_inline("a ** b"), vec![text("a ** b")]);
        assert_eq!(parse_inline("****"), vec![text("****")]);
    }

    #[test]
    fn bold_does_not_cross_line_breaks() {
        let blocks = parse_markdown("**a\nb**");
        assert_eq!(
            blocks,
            vec![MessageBlock::Paragraph(vec![
                vec![text("**a")],
                vec![text("b**")],
            ])]
        );
    }

    #[test]
    fn dashes_inside_a_line_are_not_a_separator() {
        let blocks = parse_markdown("a --- b");
        assert_eq!(
            blocks,
            vec![MessageBlock::Paragraph(vec![vec![text("a --- b")]])]
        );
    }

    #[test]
    fn similarity_is_one_minus_score_to_two_decimals() {
        assert_eq!(similarity_label(0.12), "0.88");
        assert_eq!(similarity_label(0.0), "1.00");
    }

    #[test]
    fn keyword_score_is_floored() {
        assert_eq!(keyword_label(3.7), "3");
        assert_eq!(
            source_score_label(0.12, Some(3.7)),
            "(Similarity: 0.88 | Keywords: 3)"
        );
        assert_eq!(source_score_label(0.25, None), "(Similarity: 0.75)");
    }

    #[test]
    fn long_excerpts_are_truncated_with_an_ellipsis() {
        let long = "x".repeat(160);
        let truncated = truncate_excerpt(&long);
        assert_eq!(truncated.chars().count(), EXCERPT_MAX_CHARS + 3);
        assert!(truncated.ends_with("..."));

        let short = "y".repeat(150);
        assert_eq!(truncate_excerpt(&short), short);
    }

    #[test]
    fn confidence_badges_are_keyed_case_insensitively() {
        assert_eq!(confidence_level("High"), ConfidenceLevel::High);
        assert_eq!(confidence_level("MEDIUM"), ConfidenceLevel::Medium);
        assert_eq!(confidence_level("low"), ConfidenceLevel::Low);
        assert_eq!(confidence_level("Alta"), ConfidenceLevel::Other);
    }
}

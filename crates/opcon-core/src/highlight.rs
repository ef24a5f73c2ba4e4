//! Log annotation pipeline.
//!
//! One raw log line is tokenized into non-overlapping highlight spans over
//! the original text, then rendered as markup (or styled directly by the
//! caller from the span list). Candidates are claimed in a fixed precedence
//! order: timestamp, quoted string, severity level, numeric literal. A
//! candidate overlapping an already-claimed interval is dropped, so nested
//! or malformed markup cannot occur.
//!
//! The pipeline is pure and restartable: the same input always produces the
//! same output, and no state is carried between lines.

use regex::Regex;
use std::sync::OnceLock;

/// Log-line severity classification, matched case-sensitively as a whole
/// word only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }

    /// Fixed highlight color for this severity.
    pub fn color(self) -> &'static str {
        match self {
            Severity::Error => "red",
            Severity::Warning => "orange",
            Severity::Info => "green",
            Severity::Debug => "blue",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ERROR" => Some(Severity::Error),
            "WARNING" => Some(Severity::Warning),
            "INFO" => Some(Severity::Info),
            "DEBUG" => Some(Severity::Debug),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Timestamp,
    Quoted,
    Severity(Severity),
    Number,
}

/// A claimed highlight interval. `start`/`end` are byte offsets into the
/// original line, end-exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
    pub class: TokenClass,
}

impl TokenSpan {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}").expect("timestamp pattern")
    })
}

fn severity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(ERROR|WARNING|INFO|DEBUG)\b").expect("severity pattern"))
}

/// Tokenize one line (no embedded newlines) into non-overlapping spans,
/// sorted by start offset.
pub fn tokenize_line(line: &str) -> Vec<TokenSpan> {
    let mut spans: Vec<TokenSpan> = Vec::new();

    // Timestamp only ever matches at the very start of the line; everything
    // it claims is excluded from the remaining passes.
    let mut rest = 0;
    if let Some(m) = timestamp_re().find(line) {
        spans.push(TokenSpan {
            start: 0,
            end: m.end(),
            class: TokenClass::Timestamp,
        });
        rest = m.end();
    }

    for (start, end) in quoted_runs(line, rest) {
        if is_free(&spans, start, end) {
            spans.push(TokenSpan {
                start,
                end,
                class: TokenClass::Quoted,
            });
        }
    }

    for m in severity_re().find_iter(line) {
        if !is_free(&spans, m.start(), m.end()) {
            continue;
        }
        if let Some(sev) = Severity::from_token(m.as_str()) {
            spans.push(TokenSpan {
                start: m.start(),
                end: m.end(),
                class: TokenClass::Severity(sev),
            });
        }
    }

    for (start, end) in number_runs(line) {
        if is_free(&spans, start, end) {
            spans.push(TokenSpan {
                start,
                end,
                class: TokenClass::Number,
            });
        }
    }

    spans.sort_by_key(|s| s.start);
    spans
}

fn is_free(spans: &[TokenSpan], start: usize, end: usize) -> bool {
    spans.iter().all(|s| end <= s.start || start >= s.end)
}

/// Quoted substrings after byte offset `from`: a pair of matching single or
/// double quotes, shortest match, with backslash escapes recognized (an
/// escaped quote does not close the run). An unterminated quote claims
/// nothing.
fn quoted_runs(line: &str, from: usize) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() && chars[i].0 < from {
        i += 1;
    }
    while i < chars.len() {
        let (start, open) = chars[i];
        if open == '"' || open == '\'' {
            let mut j = i + 1;
            let mut close = None;
            while j < chars.len() {
                let c = chars[j].1;
                if c == '\\' {
                    j += 2;
                    continue;
                }
                if c == open {
                    close = Some(j);
                    break;
                }
                j += 1;
            }
            if let Some(cj) = close {
                let end = chars[cj].0 + chars[cj].1.len_utf8();
                runs.push((start, end));
                i = cj + 1;
                continue;
            }
        }
        i += 1;
    }
    runs
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Maximal digit runs with an optional single decimal point, under
/// word-boundary semantics: a run embedded in a larger identifier is not a
/// numeric literal.
fn number_runs(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let leading_ok = i == 0 || !is_word_byte(bytes[i - 1]);
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        let trailing_ok = i >= bytes.len() || !is_word_byte(bytes[i]);
        if leading_ok && trailing_ok {
            runs.push((start, i));
        }
    }
    runs
}

/// Render one line's spans as markup. Text outside any span passes through
/// unchanged; a line with no matches is returned as-is.
pub fn annotate_line(line: &str) -> String {
    let spans = tokenize_line(line);
    let mut out = String::with_capacity(line.len() + spans.len() * 40);
    let mut cursor = 0;
    for span in &spans {
        out.push_str(&line[cursor..span.start]);
        let text = span.text(line);
        match span.class {
            TokenClass::Timestamp => {
                out.push_str("<span style=\"color: green;\">");
                out.push_str(text);
                out.push_str("</span>");
            }
            TokenClass::Quoted => {
                out.push_str("<span style=\"color: red;\">");
                out.push_str(text);
                out.push_str("</span>");
            }
            TokenClass::Severity(sev) => {
                out.push_str("<span style=\"color: ");
                out.push_str(sev.color());
                out.push_str("; font-weight: bold;\">");
                out.push_str(text);
                out.push_str("</span>");
            }
            TokenClass::Number => {
                out.push_str("<span style=\"color: blue;\">");
                out.push_str(text);
                out.push_str("</span>");
            }
        }
        cursor = span.end;
    }
    out.push_str(&line[cursor..]);
    out
}

/// Full-document transform: split on `\n`, annotate each line
/// independently, join with an explicit line-break marker. Lines are never
/// merged or reordered.
pub fn annotate(text: &str) -> String {
    text.split('\n')
        .map(annotate_line)
        .collect::<Vec<_>>()
        .join("<br />")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(line: &str) -> Vec<TokenClass> {
        tokenize_line(line).into_iter().map(|s| s.class).collect()
    }

    #[test]
    fn timestamp_claimed_once_and_digits_not_rematched() {
        let line = "2024-01-01 10:00:00,123 started";
        let spans = tokenize_line(line);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].class, TokenClass::Timestamp);
        assert_eq!(spans[0].text(line), "2024-01-01 10:00:00,123");
    }

    #[test]
    fn line_without_timestamp_passes_through_step_one() {
        let spans = tokenize_line("plain text without any match");
        assert!(spans.is_empty());
        assert_eq!(
            annotate_line("plain text without any match"),
            "plain text without any match"
        );
    }

    #[test]
    fn timestamp_not_matched_mid_line() {
        let line = "at 2024-01-01 10:00:00,123 it happened";
        let spans = tokenize_line(line);
        assert!(spans.iter().all(|s| s.class != TokenClass::Timestamp));
    }

    #[test]
    fn quoted_span_includes_escaped_quote() {
        let line = r#"value was "a \"b\" c" today"#;
        let spans = tokenize_line(line);
        let quoted: Vec<_> = spans
            .iter()
            .filter(|s| s.class == TokenClass::Quoted)
            .collect();
        assert_eq!(quoted.len(), 1);
        assert_eq!(quoted[0].text(line), r#""a \"b\" c""#);
    }

    #[test]
    fn single_quotes_pair_too() {
        let line = "topic 'devices/plant1' ready";
        let spans = tokenize_line(line);
        assert_eq!(spans[0].class, TokenClass::Quoted);
        assert_eq!(spans[0].text(line), "'devices/plant1'");
    }

    #[test]
    fn unterminated_quote_claims_nothing() {
        let spans = tokenize_line("lonely \" quote");
        assert!(spans.iter().all(|s| s.class != TokenClass::Quoted));
    }

    #[test]
    fn severity_is_whole_word_and_case_sensitive() {
        assert_eq!(
            classes("ERROR here"),
            vec![TokenClass::Severity(Severity::Error)]
        );
        assert!(classes("ERRORS here").is_empty());
        assert!(classes("error here").is_empty());
    }

    #[test]
    fn severity_inside_quotes_is_not_doubly_claimed() {
        let line = "status 'ERROR' reported";
        let spans = tokenize_line(line);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].class, TokenClass::Quoted);
    }

    #[test]
    fn numbers_respect_word_boundaries() {
        assert!(classes("abc123").is_empty());
        assert!(classes("123abc").is_empty());
        assert_eq!(classes("port 8000"), vec![TokenClass::Number]);
    }

    #[test]
    fn decimal_number_is_one_span() {
        let line = "load 3.14 now";
        let spans = tokenize_line(line);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text(line), "3.14");
    }

    #[test]
    fn dotted_version_splits_after_first_decimal() {
        let line = "v is 1.2.3";
        let texts: Vec<_> = tokenize_line(line)
            .iter()
            .map(|s| s.text(line).to_string())
            .collect();
        assert_eq!(texts, vec!["1.2", "3"]);
    }

    #[test]
    fn numbers_inside_quoted_span_are_not_rematched() {
        let line = "send \"42 units\" now";
        let spans = tokenize_line(line);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].class, TokenClass::Quoted);
    }

    #[test]
    fn full_scenario_line_yields_four_disjoint_spans() {
        let line = "2024-01-01 10:00:00,123 ERROR \"bad value\" 42";
        let spans = tokenize_line(line);
        assert_eq!(
            spans.iter().map(|s| s.class).collect::<Vec<_>>(),
            vec![
                TokenClass::Timestamp,
                TokenClass::Severity(Severity::Error),
                TokenClass::Quoted,
                TokenClass::Number,
            ]
        );
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start, "spans overlap: {pair:?}");
        }
        let markup = annotate_line(line);
        assert!(markup.starts_with("<span style=\"color: green;\">2024-01-01 10:00:00,123</span>"));
        assert!(markup.contains("<span style=\"color: red; font-weight: bold;\">ERROR</span>"));
        assert!(markup.contains("<span style=\"color: red;\">\"bad value\"</span>"));
        assert!(markup.contains("<span style=\"color: blue;\">42</span>"));
    }

    #[test]
    fn severity_colors_are_fixed() {
        assert_eq!(Severity::Error.color(), "red");
        assert_eq!(Severity::Warning.color(), "orange");
        assert_eq!(Severity::Info.color(), "green");
        assert_eq!(Severity::Debug.color(), "blue");
    }

    #[test]
    fn document_lines_are_joined_with_break_marker() {
        let text = "INFO one\nplain\nDEBUG three";
        let markup = annotate(text);
        assert_eq!(markup.matches("<br />").count(), 2);
        assert!(markup.contains("plain"));
    }

    #[test]
    fn annotate_is_deterministic() {
        let text = "2024-01-01 10:00:00,123 WARNING 'x' 7\nDEBUG 1.5";
        assert_eq!(annotate(text), annotate(text));
    }
}

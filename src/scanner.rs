//! Balanced-parenthesis scanner for `(select ...)` subqueries.
//!
//! Regular expressions cannot count brackets, so subquery spans are found in
//! one pass over the text with a stack of open parentheses:
//!
//! ```text
//! '('  push (offset, opens a select?)
//! ')'  pop; a select opener closes a span and absorbs the spans inside it
//! end  openers still on the stack never closed; spans inside them stay
//! ```
//!
//! Only top-level spans are reported; subqueries nested inside a reported span
//! are part of it. Callers are expected to have hidden string literals first,
//! so parentheses inside quotes never reach the scanner.

use std::ops::Range;
use std::vec;

/// Iterator over the byte ranges of top-level subqueries in a text.
#[derive(Debug, Clone)]
pub struct SubqueryScanner {
    spans: vec::IntoIter<Range<usize>>,
}

impl SubqueryScanner {
    pub fn new(text: &str) -> Self {
        Self {
            spans: top_level_spans(text).into_iter(),
        }
    }
}

impl Iterator for SubqueryScanner {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        self.spans.next()
    }
}

fn top_level_spans(text: &str) -> Vec<Range<usize>> {
    let mut open: Vec<(usize, bool)> = Vec::new();
    let mut spans: Vec<Range<usize>> = Vec::new();

    for (i, b) in text.bytes().enumerate() {
        match b {
            b'(' => open.push((i, opens_select(text, i))),
            b')' => {
                if let Some((start, true)) = open.pop() {
                    while spans.last().is_some_and(|span| span.start > start) {
                        spans.pop();
                    }
                    spans.push(start..i + 1);
                }
            }
            _ => {}
        }
    }
    spans
}

/// True when the `(` at `open` is followed by optional whitespace and the
/// `select` keyword.
fn opens_select(text: &str, open: usize) -> bool {
    let rest = text[open + 1..].trim_start();
    let bytes = rest.as_bytes();
    if bytes.len() < 6 || !bytes[..6].eq_ignore_ascii_case(b"select") {
        return false;
    }
    match bytes.get(6) {
        Some(b) => !(b.is_ascii_alphanumeric() || *b == b'_'),
        None => true,
    }
}

/// All top-level subquery spans, as text slices, in order of appearance.
pub fn find_subqueries(text: &str) -> Vec<&str> {
    SubqueryScanner::new(text).map(|span| &text[span]).collect()
}

/// True when `text` contains at least one `(select ...)` span.
pub fn has_subquery(text: &str) -> bool {
    SubqueryScanner::new(text).next().is_some()
}

/// `text` with every top-level subquery blanked out by spaces. Byte offsets
/// into the result are valid offsets into `text`.
pub fn mask_subqueries(text: &str) -> String {
    let mut masked = String::with_capacity(text.len());
    let mut last = 0;
    for span in SubqueryScanner::new(text) {
        masked.push_str(&text[last..span.start]);
        masked.extend(std::iter::repeat_n(' ', span.len()));
        last = span.end;
    }
    masked.push_str(&text[last..]);
    masked
}

/// Strip exactly one pair of enclosing parentheses, if present.
pub fn strip_outer_parens(span: &str) -> &str {
    let trimmed = span.trim();
    match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => inner,
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_single_subquery() {
        let text = "where t.id in (select id from s.t2 where x = 1)";
        assert_eq!(
            find_subqueries(text),
            vec!["(select id from s.t2 where x = 1)"]
        );
    }

    #[test]
    fn test_nested_is_part_of_top_level() {
        let text = "a = (select max(b) from (select b from t where c in (select c from u))) and d = 1";
        assert_eq!(
            find_subqueries(text),
            vec!["(select max(b) from (select b from t where c in (select c from u)))"]
        );
    }

    #[test]
    fn test_multiple_and_case_insensitive() {
        let text = "x in ( SELECT a from b) or y in (Select c from d)";
        assert_eq!(
            find_subqueries(text),
            vec!["( SELECT a from b)", "(Select c from d)"]
        );
    }

    #[test]
    fn test_plain_parens_are_skipped() {
        let text = "nvl(a, (select b from c)) = 1 and d in (1, 2)";
        assert_eq!(find_subqueries(text), vec!["(select b from c)"]);
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        assert!(!has_subquery("x in (selected_values)"));
    }

    #[test]
    fn test_unbalanced_open_is_skipped() {
        let text = "((select a from b where c = 1";
        assert!(find_subqueries(text).is_empty());

        let text = "(select broken (select ok from t)";
        assert_eq!(find_subqueries(text), vec!["(select ok from t)"]);
    }

    #[test]
    fn test_many_unclosed_openers_scan_in_linear_time() {
        let openers = "(select x ".repeat(10_000);
        let started = Instant::now();

        assert!(find_subqueries(&format!("b in {};", openers)).is_empty());
        assert_eq!(
            find_subqueries(&format!("b in {});", openers)),
            vec!["(select x )"]
        );
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn test_mask_keeps_offsets() {
        let text = "select (select max(b) from x where k = a) m from s where c = 1";
        let masked = mask_subqueries(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(masked.find("where"), text.rfind("where"));
        assert!(masked.starts_with("select  "));
    }

    #[test]
    fn test_strip_outer_parens() {
        assert_eq!(strip_outer_parens(" (select a from (b)) "), "select a from (b)");
        assert_eq!(strip_outer_parens("select a"), "select a");
    }
}

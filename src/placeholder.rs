//! Reversible placeholder substitution.
//!
//! A [`PlaceholderText`] is a working copy of one statement in which every
//! string literal and every top-level `(select ...)` subquery has been swapped
//! for a short token. Pattern rules then operate on text whose quotes and
//! parentheses can no longer confuse them, and [`PlaceholderText::revert`]
//! puts the original spans back.
//!
//! Literals are held first: a subquery's bracket scan must never see a `(`
//! or `)` that lives inside quotes.
//!
//! Token prefixes are lengthened until they do not occur in the statement,
//! so text that already looks like a token is never touched by reversion.
//! Reversion is one left-to-right pass that takes the longest held key at
//! each token (`STR_12` over `STR_1`) and never rescans restored text.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crate::patterns::{Patterns, PlaceholderFormat};
use crate::scanner::SubqueryScanner;

#[derive(Debug, Clone)]
pub struct PlaceholderText {
    text: String,
    literals: BTreeMap<String, String>,
    subqueries: BTreeMap<String, String>,
    literal_format: PlaceholderFormat,
    subquery_format: PlaceholderFormat,
}

impl PlaceholderText {
    /// Hold the literals, then the subqueries, of `raw`.
    pub fn new(raw: &str, patterns: &Patterns) -> Self {
        let cleaned = clean_line_breaks(raw);

        let literal_format = patterns.literal_format.avoiding(&cleaned);
        let literal_spans: Vec<Range<usize>> =
            patterns.literal.find_iter(&cleaned).map(|m| m.range()).collect();
        let mut literals = BTreeMap::new();
        let text = hold_spans(&cleaned, literal_spans, &literal_format, &mut literals);

        let subquery_format = patterns.subquery_format.avoiding(&text);
        let subquery_spans: Vec<Range<usize>> = SubqueryScanner::new(&text).collect();
        let mut subqueries = BTreeMap::new();
        let text = hold_spans(&text, subquery_spans, &subquery_format, &mut subqueries);

        Self {
            text,
            literals,
            subqueries,
            literal_format,
            subquery_format,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn literals(&self) -> &BTreeMap<String, String> {
        &self.literals
    }

    pub fn subqueries(&self) -> &BTreeMap<String, String> {
        &self.subqueries
    }

    /// Original text of a held subquery, parentheses included.
    pub fn subquery(&self, token: &str) -> Option<&str> {
        self.subqueries.get(token).map(String::as_str)
    }

    /// Hold an extra literal (quotes included) and return its token. A value
    /// that is already held keeps its existing token.
    pub fn hold_literal(&mut self, literal: &str) -> String {
        if let Some((token, _)) = self.literals.iter().find(|(_, v)| v.as_str() == literal) {
            return token.clone();
        }
        let token = self.literal_format.token(self.literals.len() + 1);
        self.literals.insert(token.clone(), literal.to_string());
        token
    }

    /// Put subqueries back into `fragment`, leaving literals held.
    pub fn revert_subqueries_only(&self, fragment: &str) -> String {
        revert_map(fragment, &self.subquery_format, &self.subqueries)
    }

    /// Put literals back into `fragment`, leaving subqueries held.
    pub fn revert_literals_only(&self, fragment: &str) -> String {
        revert_map(fragment, &self.literal_format, &self.literals)
    }

    /// The working text with every held span restored. Subqueries go first
    /// because their stored text still carries literal tokens.
    pub fn revert(&self) -> String {
        self.revert_literals_only(&self.revert_subqueries_only(&self.text))
    }
}

/// Line breaks become single spaces; surrounding spaces are dropped.
pub fn clean_line_breaks(raw: &str) -> String {
    raw.replace(['\r', '\n'], " ").trim_matches(' ').to_string()
}

/// Replace each span of `text` with the token of its value. Equal values share
/// one token, numbered by first occurrence.
fn hold_spans(
    text: &str,
    spans: Vec<Range<usize>>,
    format: &PlaceholderFormat,
    held: &mut BTreeMap<String, String>,
) -> String {
    if spans.is_empty() {
        return text.to_string();
    }

    let mut tokens: HashMap<&str, String> = HashMap::new();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for span in spans {
        let value = &text[span.clone()];
        let token = tokens.entry(value).or_insert_with(|| {
            let token = format.token(held.len() + 1);
            held.insert(token.clone(), value.to_string());
            token
        });
        out.push_str(&text[last..span.start]);
        out.push_str(token.as_str());
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

fn revert_map(fragment: &str, format: &PlaceholderFormat, held: &BTreeMap<String, String>) -> String {
    if held.is_empty() {
        return fragment.to_string();
    }

    let prefix = format.prefix();
    let mut out = String::with_capacity(fragment.len());
    let mut rest = fragment;

    while let Some(at) = rest.find(prefix) {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        match longest_token(tail, format, held) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &tail[token.len()..];
            }
            None => {
                out.push_str(prefix);
                rest = &tail[prefix.len()..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Longest held token at the start of `tail`, with its value.
fn longest_token<'m>(
    tail: &str,
    format: &PlaceholderFormat,
    held: &'m BTreeMap<String, String>,
) -> Option<(&'m str, &'m str)> {
    let digits_at = format.prefix().len();
    let digits = tail[digits_at..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    (1..=digits).rev().find_map(|n| {
        let end = digits_at + n;
        if !tail[end..].starts_with(format.suffix()) {
            return None;
        }
        held.get_key_value(&tail[..end + format.suffix().len()])
            .map(|(token, value)| (token.as_str(), value.as_str()))
    })
}

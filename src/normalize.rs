//! Text normalizations applied to every rewritten statement.
//!
//! The steps run on the held text, before placeholders are reverted, in this
//! order:
//!
//! 1. drop stray `using` keywords
//! 2. drop the temporary-table prefix (`tmp_`)
//! 3. inject the identifier into `toentityid('...')` and `:entityid`
//! 4. put `from`, `join`, `and`, `where` and `or` on their own lines
//! 5. collapse runs of spaces

use regex::{Captures, NoExpand};
use std::collections::BTreeMap;

use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;

/// Apply every normalization step to `held`.
pub fn normalize(held: &mut PlaceholderText, patterns: &Patterns, identifier: &str) {
    let text = strip_using(held.text(), patterns);
    let text = strip_temp_prefix(&text, patterns);

    // the identifier is held like any other literal so reversion restores it
    let literal = quote_literal(identifier);
    let token = held.hold_literal(&literal);
    let text = inject_identifier(&text, patterns, &token, held.literals());

    let text = break_connectives(&text, patterns);
    let text = collapse_spaces(&text, patterns);
    held.set_text(text);
}

fn strip_using(text: &str, patterns: &Patterns) -> String {
    patterns.using_token.replace_all(text, "").into_owned()
}

fn strip_temp_prefix(text: &str, patterns: &Patterns) -> String {
    patterns.temp_prefix.replace_all(text, "").into_owned()
}

/// Entity calls are only rewritten when their argument is a held literal.
fn inject_identifier(
    text: &str,
    patterns: &Patterns,
    token: &str,
    literals: &BTreeMap<String, String>,
) -> String {
    let call = format!("{}({})", patterns.entity_function, token);
    let text = patterns.entity_call.replace_all(text, |caps: &Captures| {
        if literals.contains_key(&caps["arg"]) {
            call.clone()
        } else {
            caps[0].to_string()
        }
    });
    patterns
        .entity_token
        .replace_all(&text, NoExpand(&call))
        .into_owned()
}

fn break_connectives(text: &str, patterns: &Patterns) -> String {
    patterns
        .connective_break
        .replace_all(text, "\n${1} ")
        .into_owned()
}

fn collapse_spaces(text: &str, patterns: &Patterns) -> String {
    patterns.space_run.replace_all(text, " ").into_owned()
}

/// Single-quote `value`, doubling embedded quotes.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

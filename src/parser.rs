//! Statement splitting and classification using nom.
//!
//! A batch is a run of statements, each ending with the terminator:
//!
//! ```text
//! update s.t set a = 'x;y' where b = 1;  delete from s.u where c = 2;
//! ──────────────────┬─────────────────  ─────────────┬──────────────
//!                   │                                └── Delete
//!                   └── Update (the ';' inside quotes does not split)
//! ```
//!
//! Each piece keeps its terminator, has surrounding whitespace and quote noise
//! trimmed, and is tagged by its leading keyword.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::recognize,
    multi::many0,
    sequence::{delimited, pair},
    IResult,
};

use crate::statement::{Statement, StatementKind};

/// Characters trimmed from both ends of every statement.
const NOISE: [char; 9] = [' ', '.', '\'', '"', '\n', '\r', '\t', '\u{0B}', '\u{0C}'];

/// Split `batch` into classified statements, in input order.
pub fn classify(batch: &str, terminator: char) -> Vec<Statement> {
    let (pieces, rest) = split_statements(batch, terminator);
    if !rest.trim().is_empty() {
        tracing::warn!(
            "Ignoring {} characters after the last '{}'",
            rest.trim().len(),
            terminator
        );
    }

    pieces
        .into_iter()
        .filter_map(|piece| {
            let sql = piece.trim_matches(NOISE);
            if sql.trim_end_matches(terminator).trim().is_empty() {
                tracing::debug!("Skipping empty statement");
                return None;
            }
            Some(classify_statement(sql))
        })
        .collect()
}

/// Tag one trimmed statement by its leading keyword.
pub fn classify_statement(sql: &str) -> Statement {
    let keyword = match parse_keyword(sql) {
        Ok((_, word)) => word,
        Err(_) => sql.split_whitespace().next().unwrap_or_default(),
    };
    Statement {
        kind: StatementKind::from_keyword(keyword),
        keyword: keyword.to_string(),
        sql: sql.to_string(),
    }
}

/// Split `batch` into terminator-ended pieces (terminator included). The
/// second value is whatever follows the last terminator.
pub fn split_statements(batch: &str, terminator: char) -> (Vec<&str>, &str) {
    let mut pieces = Vec::new();
    let mut rest = batch;
    while let Ok((next, piece)) = parse_statement(rest, terminator) {
        pieces.push(piece);
        rest = next;
    }
    (pieces, rest)
}

/// Parse one statement up to and including its terminator.
fn parse_statement(input: &str, terminator: char) -> IResult<&str, &str> {
    recognize(pair(
        many0(alt((
            parse_quoted,
            take_while1(|c: char| c != '\'' && c != terminator),
            // an unclosed quote is ordinary text
            recognize(char('\'')),
        ))),
        char(terminator),
    ))(input)
}

/// Parse a single-quoted literal, quotes included.
fn parse_quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('\''),
        take_while(|c: char| c != '\''),
        char('\''),
    ))(input)
}

/// Parse the leading word of a statement.
fn parse_keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

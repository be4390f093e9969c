//! Per-kind statement rules.
//!
//! Every convertible statement kind has a rule implementing [`DmlRule`]:
//! a header check that also extracts the predicate-bearing "query
//! parameters", and an in-place rewrite that turns the held text into a
//! SELECT. [`StatementRule`] is the closed set of rules, with an explicit
//! variant for statements that cannot be converted.

mod delete;
mod merge;
mod update;

use std::fmt;
use std::ops::Range;

pub use delete::DeleteRule;
pub use merge::MergeRule;
pub use update::UpdateRule;

use crate::budget::MatchBudget;
use crate::error::{ConvertError, ConvertResult};
use crate::messages::MessageKey;
use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;

/// Kind of a statement, decided by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Update,
    Delete,
    Merge,
    Unknown,
}

impl StatementKind {
    pub fn from_keyword(keyword: &str) -> Self {
        if keyword.eq_ignore_ascii_case("update") {
            StatementKind::Update
        } else if keyword.eq_ignore_ascii_case("delete") {
            StatementKind::Delete
        } else if keyword.eq_ignore_ascii_case("merge") {
            StatementKind::Merge
        } else {
            StatementKind::Unknown
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Update => "Update",
            StatementKind::Delete => "Delete",
            StatementKind::Merge => "Merge",
            StatementKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One classified statement of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Leading word as written.
    pub keyword: String,
    /// Trimmed statement text, terminator included.
    pub sql: String,
}

/// Result of a single header check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCheck {
    pub passed: bool,
    pub key: MessageKey,
}

impl HeaderCheck {
    pub fn new(passed: bool, key: MessageKey) -> Self {
        Self { passed, key }
    }
}

/// Header checks in evaluation order, plus the extracted query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub checks: Vec<HeaderCheck>,
    /// Predicate-bearing text, placeholders still held.
    pub query_parameters: String,
}

impl ValidationOutcome {
    /// Message of the first failed check.
    pub fn first_failure(&self) -> Option<MessageKey> {
        self.checks.iter().find(|check| !check.passed).map(|check| check.key)
    }

    pub fn passed(&self) -> bool {
        self.first_failure().is_none()
    }
}

/// Validation and rewrite for one convertible statement kind.
pub trait DmlRule {
    fn kind(&self) -> StatementKind;

    /// Check the statement skeleton and extract its query parameters.
    fn header_validate(
        &self,
        held: &PlaceholderText,
        patterns: &Patterns,
        budget: &MatchBudget,
    ) -> ConvertResult<ValidationOutcome>;

    /// Rewrite the held text into a SELECT. Only called after
    /// [`DmlRule::header_validate`] passed.
    fn rewrite(
        &self,
        held: &mut PlaceholderText,
        patterns: &Patterns,
        budget: &MatchBudget,
    ) -> ConvertResult<()>;
}

/// The rule for a statement, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementRule {
    Update(UpdateRule),
    Delete(DeleteRule),
    Merge(MergeRule),
    Unsupported { keyword: String },
}

impl StatementRule {
    pub fn for_statement(statement: &Statement) -> Self {
        match statement.kind {
            StatementKind::Update => StatementRule::Update(UpdateRule),
            StatementKind::Delete => StatementRule::Delete(DeleteRule),
            StatementKind::Merge => StatementRule::Merge(MergeRule),
            StatementKind::Unknown => StatementRule::Unsupported {
                keyword: statement.keyword.clone(),
            },
        }
    }

    /// The convertible rule, or [`ConvertError::Unsupported`].
    pub fn as_dml(&self) -> ConvertResult<&dyn DmlRule> {
        match self {
            StatementRule::Update(rule) => Ok(rule as &dyn DmlRule),
            StatementRule::Delete(rule) => Ok(rule as &dyn DmlRule),
            StatementRule::Merge(rule) => Ok(rule as &dyn DmlRule),
            StatementRule::Unsupported { keyword } => Err(ConvertError::Unsupported {
                keyword: keyword.clone(),
            }),
        }
    }
}

/// Replace `range` of `text` with `replacement`.
pub(crate) fn splice(text: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    out
}

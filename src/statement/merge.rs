//! MERGE rule.
//!
//! The preview of a MERGE is the body of its USING subquery. The header match
//! captures the subquery's placeholder, which is then looked up in the held
//! subqueries.

use super::{DmlRule, HeaderCheck, StatementKind, ValidationOutcome};
use crate::budget::MatchBudget;
use crate::error::{ConvertError, ConvertResult};
use crate::messages::MessageKey;
use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;
use crate::scanner::{mask_subqueries, strip_outer_parens};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeRule;

impl MergeRule {
    /// Body of the USING subquery, one pair of parentheses removed.
    fn source_body<'h>(
        &self,
        held: &'h PlaceholderText,
        patterns: &Patterns,
        budget: &MatchBudget,
    ) -> ConvertResult<Option<&'h str>> {
        let caps = budget.captures(&patterns.merge_header, held.text())?;
        let body = caps
            .and_then(|caps| caps.name("source"))
            .and_then(|source| held.subquery(source.as_str()))
            .map(|subquery| strip_outer_parens(subquery).trim());
        Ok(body)
    }
}

/// The source body from its own `where` onward. A `where` inside a nested
/// subquery of the select list belongs to that subquery.
fn source_parameters(body: &str, patterns: &Patterns) -> String {
    let masked = mask_subqueries(body);
    let start = patterns
        .select_prefix
        .captures(&masked)
        .and_then(|caps| caps.name("where"))
        .map(|m| m.start());
    start.map(|start| body[start..].to_string()).unwrap_or_default()
}

impl DmlRule for MergeRule {
    fn kind(&self) -> StatementKind {
        StatementKind::Merge
    }

    fn header_validate(
        &self,
        held: &PlaceholderText,
        patterns: &Patterns,
        budget: &MatchBudget,
    ) -> ConvertResult<ValidationOutcome> {
        let body = self.source_body(held, patterns, budget)?;
        let matched = budget.is_match(&patterns.merge_matched, held.text())?;

        // no WHERE in the source means no predicates to check
        let query_parameters = body
            .map(|body| source_parameters(body, patterns))
            .unwrap_or_default();

        Ok(ValidationOutcome {
            checks: vec![
                HeaderCheck::new(body.is_some(), MessageKey::MergeInvalid),
                HeaderCheck::new(matched, MessageKey::MergeInvalidMatchedClause),
            ],
            query_parameters,
        })
    }

    fn rewrite(
        &self,
        held: &mut PlaceholderText,
        patterns: &Patterns,
        budget: &MatchBudget,
    ) -> ConvertResult<()> {
        let body = self
            .source_body(held, patterns, budget)?
            .map(str::to_string)
            .ok_or_else(|| ConvertError::header(self.kind(), MessageKey::MergeInvalid))?;
        held.set_text(body);
        Ok(())
    }
}

//! Predicate clause validation.
//!
//! Query parameters are checked in two stages. Decomposition walks nested
//! `(select ...)` subqueries with an explicit stack of [`WorkItem`]s, turning
//! each level into a clause whose own subqueries are replaced by a resolved
//! marker. Each clause is then split on `where`/`and`/`or` and every fragment
//! must match one of the [`PredicateForm`]s.
//!
//! Fragments come from user input, so every classification match runs under
//! the [`MatchBudget`]. A timeout marks the fragment as offending.

use std::fmt;

use crate::budget::{Deadline, MatchBudget};
use crate::error::{ConvertResult, MatchTimeout};
use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;
use crate::scanner::{strip_outer_parens, SubqueryScanner};

/// Accepted shapes of an atomic predicate, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateForm {
    RegexpLike,
    RegexpExtractCompare,
    RegexpPositionCompare,
    Comparison,
    NullTest,
    Like,
    InList,
}

impl PredicateForm {
    pub const ALL: [PredicateForm; 7] = [
        PredicateForm::RegexpLike,
        PredicateForm::RegexpExtractCompare,
        PredicateForm::RegexpPositionCompare,
        PredicateForm::Comparison,
        PredicateForm::NullTest,
        PredicateForm::Like,
        PredicateForm::InList,
    ];

    pub fn pattern(self) -> &'static str {
        match self {
            PredicateForm::RegexpLike => {
                r"(?is)\s*(?:not\s+)?regexp_like\s*\(.+?,\s*'.+?'(?:,\s*'[cinmx]'\s*)?\s*\)"
            }
            PredicateForm::RegexpExtractCompare => {
                r"(?is)\s*regexp_(?:substr|replace)\s*\(.+?,\s*'.+?'(?:,\s*\d\s*)?(?:,\s*\d+\s*)?(?:,\s*'[cinmx]'\s*)?\s*\)\s*(?:=\s*\(?.+\)?|in\s*\((?:.+,.+)+\))"
            }
            PredicateForm::RegexpPositionCompare => {
                r"(?is)\s*regexp_instr\s*\(.+?,\s*'.+?'(?:,\s*\d\s*)?(?:,\s*\d+\s*)?(?:,\s*\d+\s*)?(?:,\s*'[cinmx]'\s*)?\s*\)\s*(?:=\s*\(?.+\)?|in\s*\((?:.+,.+)+\))"
            }
            PredicateForm::Comparison => r"(?is)^.+?(?:[<>]?=|!=|>|<)\s*\S+",
            PredicateForm::NullTest => r"(?is)^.+?\s+is(?:\s+not)?\s+null",
            PredicateForm::Like => {
                r"(?is)^.+?(?:\s+not)?\s+like\s+(?:\(\s*)?'%?.+%?'(?:\s*\)\s*)?"
            }
            PredicateForm::InList => r"(?is)^.+?(?:\s+not)?\s+in\s+\(\s*(?:'.+',?|.+)+\s*\)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PredicateForm::RegexpLike => "[NOT] REGEXP_LIKE(expr, 'pattern'[, 'flags'])",
            PredicateForm::RegexpExtractCompare => {
                "REGEXP_SUBSTR|REGEXP_REPLACE(expr, 'pattern', ...) = value | IN (a, b, ...)"
            }
            PredicateForm::RegexpPositionCompare => {
                "REGEXP_INSTR(expr, 'pattern', ...) = value | IN (a, b, ...)"
            }
            PredicateForm::Comparison => "expr = | != | < | > | <= | >= value",
            PredicateForm::NullTest => "expr IS [NOT] NULL",
            PredicateForm::Like => "expr [NOT] LIKE 'pattern'",
            PredicateForm::InList => "expr [NOT] IN (a, b, ...)",
        }
    }
}

impl fmt::Display for PredicateForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of validating one statement's query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterFindings {
    pub valid: bool,
    /// Failing fragments with their literals restored, in discovery order.
    pub offending_fragments: Vec<String>,
}

impl Default for ParameterFindings {
    fn default() -> Self {
        Self {
            valid: true,
            offending_fragments: Vec::new(),
        }
    }
}

impl ParameterFindings {
    fn reject(&mut self, fragment: impl Into<String>) {
        self.valid = false;
        self.offending_fragments.push(fragment.into());
    }
}

/// Unit of decomposition work.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WorkItem {
    /// Text that may still contain subqueries.
    Span { text: String, nested: bool },
    /// Text whose subqueries were replaced by the resolved marker.
    Clause { text: String, nested: bool },
}

pub struct ClauseValidator<'a> {
    patterns: &'a Patterns,
    budget: &'a MatchBudget,
}

impl<'a> ClauseValidator<'a> {
    pub fn new(patterns: &'a Patterns, budget: &'a MatchBudget) -> Self {
        Self { patterns, budget }
    }

    /// Validate `query_parameters` and every subquery nested in them.
    ///
    /// Returns [`ConvertError::Timeout`](crate::error::ConvertError::Timeout)
    /// when decomposition as a whole outlives the budget.
    pub fn validate_parameters(
        &self,
        query_parameters: &str,
        held: &PlaceholderText,
    ) -> ConvertResult<ParameterFindings> {
        let mut findings = ParameterFindings::default();
        let deadline = self.budget.deadline();

        let mut stack = vec![WorkItem::Span {
            text: held.revert_subqueries_only(query_parameters),
            nested: false,
        }];

        while let Some(item) = stack.pop() {
            deadline.check()?;
            match item {
                WorkItem::Span { text, nested } => {
                    self.decompose(&text, nested, &mut stack, &deadline)?;
                }
                WorkItem::Clause { text, nested } => {
                    let predicates = if nested {
                        self.strip_select_prefix(&text)
                    } else {
                        text.as_str()
                    };
                    self.validate_atomic_predicates(predicates, held, &mut findings);
                }
            }
        }

        Ok(findings)
    }

    /// Replace the subqueries of `text` with the resolved marker. The marked
    /// text is pushed as a clause and each subquery body as a new span.
    fn decompose(
        &self,
        text: &str,
        nested: bool,
        stack: &mut Vec<WorkItem>,
        deadline: &Deadline,
    ) -> Result<(), MatchTimeout> {
        let marker = &self.patterns.resolved_placeholder;
        let mut clause = String::with_capacity(text.len());
        let mut children = Vec::new();
        let mut last = 0;

        for span in SubqueryScanner::new(text) {
            deadline.check()?;
            clause.push_str(&text[last..span.start]);
            clause.push_str(marker);
            children.push(WorkItem::Span {
                text: strip_outer_parens(&text[span.clone()]).to_string(),
                nested: true,
            });
            last = span.end;
        }
        clause.push_str(&text[last..]);

        // children pop in order of appearance, after the enclosing clause
        stack.extend(children.into_iter().rev());
        stack.push(WorkItem::Clause {
            text: clause,
            nested,
        });
        Ok(())
    }

    /// Predicates of a nested `select ... where ...` clause, from its `where`
    /// onward. A clause without one is returned whole and classified as is.
    fn strip_select_prefix<'t>(&self, text: &'t str) -> &'t str {
        self.patterns
            .select_prefix
            .captures(text)
            .and_then(|caps| caps.name("where"))
            .map_or(text, |m| &text[m.start()..])
    }

    /// Check one clause: at most one `where`, and every fragment between
    /// boundary keywords must classify.
    pub fn validate_atomic_predicates(
        &self,
        text: &str,
        held: &PlaceholderText,
        findings: &mut ParameterFindings,
    ) {
        let wheres: Vec<&str> = self
            .patterns
            .where_keyword
            .find_iter(text)
            .map(|m| m.as_str())
            .collect();
        if wheres.len() > 1 {
            tracing::debug!("Clause has {} WHERE keywords", wheres.len());
            for keyword in wheres {
                findings.reject(keyword);
            }
        }

        for fragment in self.patterns.boundary_keywords.split(text) {
            if fragment.trim_matches([' ', ';', '\t']).trim().is_empty() {
                continue;
            }
            let fragment = held.revert_literals_only(fragment.trim_matches([' ', ';']));
            if fragment.trim().is_empty() {
                continue;
            }

            match self.classify(&fragment) {
                Ok(Some(form)) => tracing::trace!("{:?}: {}", form, fragment),
                Ok(None) => {
                    tracing::debug!("Unrecognized predicate: {}", fragment);
                    findings.reject(fragment);
                }
                Err(timeout) => {
                    tracing::warn!("{} while classifying: {}", timeout, fragment);
                    findings.reject(fragment);
                }
            }
        }
    }

    /// First predicate form matching `fragment`.
    pub fn classify(&self, fragment: &str) -> Result<Option<PredicateForm>, MatchTimeout> {
        for (form, pattern) in &self.patterns.predicate_forms {
            if self.budget.is_match(pattern, fragment)? {
                return Ok(Some(*form));
            }
        }
        Ok(None)
    }
}

//! UPDATE rule.
//!
//! `update s.t x set x.a = 1, (x.b, x.c) = (SUB_1) where ...` becomes
//! `select a, b, c from s.t x where ...`.

use super::{splice, DmlRule, HeaderCheck, StatementKind, ValidationOutcome};
use crate::budget::MatchBudget;
use crate::error::{ConvertError, ConvertResult};
use crate::messages::MessageKey;
use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;
use crate::scanner::strip_outer_parens;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateRule;

impl UpdateRule {
    /// Assigned field names, alias qualifiers removed, in order.
    pub fn assigned_fields(&self, text: &str, patterns: &Patterns) -> Vec<String> {
        let Some(caps) = patterns.update_set.captures(text) else {
            return Vec::new();
        };
        let Some(assignments) = caps.name("assignments") else {
            return Vec::new();
        };

        split_top_level(assignments.as_str(), ',')
            .into_iter()
            .filter_map(|assignment| assignment.split_once('=').map(|(lhs, _)| lhs))
            .flat_map(|lhs| strip_outer_parens(lhs).split(','))
            .filter_map(|target| {
                patterns
                    .assignment_target
                    .captures(target)
                    .and_then(|caps| caps.name("field"))
                    .map(|m| m.as_str().to_string())
            })
            .collect()
    }
}

impl DmlRule for UpdateRule {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn header_validate(
        &self,
        held: &PlaceholderText,
        patterns: &Patterns,
        _budget: &MatchBudget,
    ) -> ConvertResult<ValidationOutcome> {
        let text = held.text();
        let query_parameters = patterns
            .update_span
            .captures(text)
            .and_then(|caps| caps.name("where"))
            .map(|m| text[m.start()..].to_string())
            .unwrap_or_default();

        Ok(ValidationOutcome {
            checks: vec![
                HeaderCheck::new(
                    patterns.update_header.is_match(text),
                    MessageKey::UpdateInvalidUpdate,
                ),
                HeaderCheck::new(
                    patterns.update_set.is_match(text),
                    MessageKey::UpdateInvalidSet,
                ),
            ],
            query_parameters,
        })
    }

    fn rewrite(
        &self,
        held: &mut PlaceholderText,
        patterns: &Patterns,
        _budget: &MatchBudget,
    ) -> ConvertResult<()> {
        let rewritten = {
            let text = held.text();
            let fields = self.assigned_fields(text, patterns);
            if fields.is_empty() {
                return Err(ConvertError::header(self.kind(), MessageKey::UpdateInvalidSet));
            }

            let caps = patterns
                .update_span
                .captures(text)
                .ok_or_else(|| ConvertError::header(self.kind(), MessageKey::UpdateInvalidUpdate))?;
            let (Some(whole), Some(target), Some(where_kw)) =
                (caps.get(0), caps.name("target"), caps.name("where"))
            else {
                return Err(ConvertError::header(self.kind(), MessageKey::UpdateInvalidUpdate));
            };

            let target = patterns.temp_prefix.replace_all(target.as_str(), "");
            let select = format!("select {}\nfrom {}\n", fields.join(", "), target.trim());
            splice(text, whole.start()..where_kw.start(), &select)
        };
        held.set_text(rewritten);
        Ok(())
    }
}

/// Split on `separator` where it is not inside parentheses.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;

    fn patterns() -> Patterns {
        Patterns::compile(&ConverterConfig::default()).unwrap()
    }

    #[test]
    fn test_assigned_fields() {
        let p = patterns();
        let fields = UpdateRule.assigned_fields(
            "update s.t x set x.a = nvl(b, c), (x.d, e) = (SUB_1), f=2 where x.id = 1;",
            &p,
        );
        assert_eq!(fields, vec!["a", "d", "e", "f"]);
    }

    #[test]
    fn test_update_header_checks() {
        let p = patterns();
        let budget = p.budget();

        let held = PlaceholderText::new("update tbl set a = 1 where b = 2;", &p);
        let outcome = UpdateRule.header_validate(&held, &p, &budget).unwrap();
        assert_eq!(outcome.first_failure(), Some(MessageKey::UpdateInvalidUpdate));

        let held = PlaceholderText::new("update s.tbl set a = 1;", &p);
        let outcome = UpdateRule.header_validate(&held, &p, &budget).unwrap();
        assert_eq!(outcome.first_failure(), Some(MessageKey::UpdateInvalidSet));

        let held = PlaceholderText::new("update s.tbl t set t.a = 'v' where t.b = 2;", &p);
        let outcome = UpdateRule.header_validate(&held, &p, &budget).unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.query_parameters, "where t.b = 2;");
    }

    #[test]
    fn test_update_rewrite_strips_temp_prefix() {
        let p = patterns();
        let mut held =
            PlaceholderText::new("update tmp_schema.tbl t set t.a = 1, t.b = 2 where t.id = 1;", &p);
        UpdateRule.rewrite(&mut held, &p, &p.budget()).unwrap();
        assert_eq!(held.text(), "select a, b\nfrom schema.tbl t\nwhere t.id = 1;");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a = f(1, 2), b = 3", ','), vec!["a = f(1, 2)", " b = 3"]);
    }
}

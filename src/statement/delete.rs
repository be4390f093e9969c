//! DELETE rule.

use super::{splice, DmlRule, HeaderCheck, StatementKind, ValidationOutcome};
use crate::budget::MatchBudget;
use crate::error::{ConvertError, ConvertResult};
use crate::messages::MessageKey;
use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;

/// `DELETE FROM <schema>.<table> [alias] WHERE ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteRule;

impl DmlRule for DeleteRule {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn header_validate(
        &self,
        held: &PlaceholderText,
        patterns: &Patterns,
        _budget: &MatchBudget,
    ) -> ConvertResult<ValidationOutcome> {
        let text = held.text();
        let caps = patterns.delete_header.captures(text);

        let query_parameters = caps
            .as_ref()
            .and_then(|caps| caps.name("where"))
            .map(|m| text[m.start()..].to_string())
            .unwrap_or_default();

        Ok(ValidationOutcome {
            checks: vec![HeaderCheck::new(caps.is_some(), MessageKey::DeleteInvalid)],
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
            let caps = patterns
                .delete_header
                .captures(text)
                .ok_or_else(|| ConvertError::header(self.kind(), MessageKey::DeleteInvalid))?;
            let (Some(whole), Some(where_kw)) = (caps.get(0), caps.name("where")) else {
                return Err(ConvertError::header(self.kind(), MessageKey::DeleteInvalid));
            };

            let select = format!("select *\nfrom {}\n", &caps["table"]);
            splice(text, whole.start()..where_kw.start(), &select)
        };
        held.set_text(rewritten);
        Ok(())
    }
}

//! Batch conversion.
//!
//! [`Converter`] owns one batch of SQL and the identifier to inject. It checks
//! the batch-level preconditions, then drives every statement through:
//!
//! ```text
//! hold placeholders -> header check -> parameter check -> rewrite
//!     -> normalize -> revert -> final shape check
//! ```
//!
//! Any failure after the preconditions becomes a failed [`ConversionRecord`]
//! for that statement only; the other statements of the batch are unaffected.

use crate::error::{ConvertError, ConvertResult, PreconditionFailure};
use crate::messages::{MessageCatalog, MessageKey};
use crate::normalize::normalize;
use crate::output::ConversionRecord;
use crate::parser;
use crate::patterns::Patterns;
use crate::placeholder::PlaceholderText;
use crate::statement::{Statement, StatementKind, StatementRule};
use crate::validator::ClauseValidator;

/// Converts one batch of DML statements into SELECT previews.
pub struct Converter<'a, C: MessageCatalog> {
    patterns: &'a Patterns,
    catalog: &'a C,
    sql: String,
    identifier: String,
}

impl<'a, C: MessageCatalog> Converter<'a, C> {
    /// The identifier is trimmed and upper-cased.
    pub fn new(patterns: &'a Patterns, catalog: &'a C, sql: impl Into<String>, identifier: &str) -> Self {
        Self {
            patterns,
            catalog,
            sql: sql.into(),
            identifier: identifier.trim().to_uppercase(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// First failing precondition, checked in a fixed order.
    pub fn precondition_failure(&self) -> Option<PreconditionFailure> {
        let no_sql = self.sql.trim().is_empty();
        let no_id = self.identifier.is_empty();

        if no_sql && no_id {
            Some(PreconditionFailure::MissingSqlAndId)
        } else if no_sql {
            Some(PreconditionFailure::MissingSql)
        } else if no_id {
            Some(PreconditionFailure::MissingId)
        } else if self.sql.contains(self.patterns.disallowed_quotes.as_slice()) {
            Some(PreconditionFailure::SmartQuote)
        } else if !self.sql.contains(self.patterns.terminator) {
            Some(PreconditionFailure::NoTerminator)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.precondition_failure().is_none()
    }

    /// Message for the failing precondition, if any.
    pub fn validation_error_message(&self) -> Option<String> {
        self.precondition_failure()
            .map(|failure| self.catalog.resolve(failure.message_key(), &[]))
    }

    /// Convert every statement of the batch, in input order.
    pub fn convert(&self) -> ConvertResult<Vec<ConversionRecord>> {
        if let Some(failure) = self.precondition_failure() {
            tracing::debug!("Batch rejected: {}", failure);
            return Err(ConvertError::Precondition(failure));
        }

        let statements = parser::classify(&self.sql, self.patterns.terminator);
        tracing::info!("Converting {} statement(s)", statements.len());

        Ok(statements
            .iter()
            .map(|statement| self.convert_statement(statement))
            .collect())
    }

    /// Kinds of the statements in this batch, without converting them.
    pub fn statement_kinds(&self) -> Vec<StatementKind> {
        parser::classify(&self.sql, self.patterns.terminator)
            .into_iter()
            .map(|statement| statement.kind)
            .collect()
    }

    /// Convert a single classified statement.
    pub fn convert_statement(&self, statement: &Statement) -> ConversionRecord {
        match self.run(statement) {
            Ok(sql) => {
                tracing::debug!("{} statement converted", statement.kind);
                let kind = statement.kind.to_string();
                ConversionRecord::converted(
                    sql,
                    self.catalog.resolve(MessageKey::SuccessfullyConverted, &[kind.as_str()]),
                )
            }
            Err(err) => {
                tracing::debug!("{} statement failed: {}", statement.kind, err);
                self.failure_record(statement, err)
            }
        }
    }

    fn run(&self, statement: &Statement) -> ConvertResult<String> {
        let rule = StatementRule::for_statement(statement);
        let dml = rule.as_dml()?;
        let kind = dml.kind();
        let budget = self.patterns.budget();

        let mut held = PlaceholderText::new(&statement.sql, self.patterns);

        let outcome = dml.header_validate(&held, self.patterns, &budget)?;
        if let Some(key) = outcome.first_failure() {
            return Err(ConvertError::header(kind, key));
        }

        let findings = ClauseValidator::new(self.patterns, &budget)
            .validate_parameters(&outcome.query_parameters, &held)?;
        if !findings.valid {
            return Err(ConvertError::ParameterGrammar {
                kind,
                fragments: findings.offending_fragments,
            });
        }

        dml.rewrite(&mut held, self.patterns, &budget)?;
        normalize(&mut held, self.patterns, &self.identifier);

        let sql = held.revert();
        if !self.patterns.final_shape.is_match(sql.trim_start()) {
            return Err(ConvertError::FinalShape { kind, sql });
        }
        Ok(sql)
    }

    fn failure_record(&self, statement: &Statement, err: ConvertError) -> ConversionRecord {
        let kind = statement.kind.to_string();
        let not_converted = || self.catalog.resolve(MessageKey::NotConverted, &[kind.as_str()]);

        match err {
            ConvertError::HeaderShape { key, .. } => {
                ConversionRecord::failed(&statement.sql, self.catalog.resolve(key, &[]))
            }
            ConvertError::ParameterGrammar { fragments, .. } => {
                ConversionRecord::failed(self.annotate(&statement.sql, &fragments), not_converted())
            }
            ConvertError::Timeout(timeout) => {
                tracing::warn!("{} statement abandoned: {}", statement.kind, timeout);
                ConversionRecord::failed(&statement.sql, self.catalog.resolve(MessageKey::Timeout, &[]))
            }
            ConvertError::Unsupported { keyword } => ConversionRecord::failed(
                &statement.sql,
                self.catalog
                    .resolve(MessageKey::UnsupportedStatement, &[keyword.as_str()]),
            ),
            ConvertError::FinalShape { sql, .. } => ConversionRecord::failed(sql, not_converted()),
            other => {
                tracing::warn!("{} statement failed unexpectedly: {}", statement.kind, other);
                ConversionRecord::failed(&statement.sql, not_converted())
            }
        }
    }

    /// Prefix every occurrence of each offending fragment with the error
    /// marker. Fragments not present verbatim are skipped.
    fn annotate(&self, sql: &str, fragments: &[String]) -> String {
        let marker = &self.patterns.error_marker;
        let mut seen: Vec<&str> = Vec::new();
        let mut annotated = sql.to_string();

        for fragment in fragments {
            if seen.contains(&fragment.as_str()) {
                continue;
            }
            seen.push(fragment);

            if annotated.contains(fragment.as_str()) {
                annotated = annotated.replace(fragment.as_str(), &format!("{}{}", marker, fragment));
            } else {
                tracing::warn!("Offending fragment not found in statement: {}", fragment);
            }
        }
        annotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::messages::DefaultCatalog;

    fn patterns() -> Patterns {
        Patterns::compile(&ConverterConfig::default()).unwrap()
    }

    #[test]
    fn test_preconditions_in_order() {
        let p = patterns();
        let catalog = DefaultCatalog::new();
        let cases = [
            ("", " ", PreconditionFailure::MissingSqlAndId),
            ("  ", "abc", PreconditionFailure::MissingSql),
            ("delete from s.t where a = 1;", "", PreconditionFailure::MissingId),
            ("delete from s.t where a = ’x’;", "abc", PreconditionFailure::SmartQuote),
            ("delete from s.t where a = 1", "abc", PreconditionFailure::NoTerminator),
        ];
        for (sql, id, expected) in cases {
            let converter = Converter::new(&p, &catalog, sql, id);
            assert_eq!(converter.precondition_failure(), Some(expected));
            assert!(!converter.is_valid());
            assert!(matches!(
                converter.convert(),
                Err(ConvertError::Precondition(failure)) if failure == expected
            ));
        }
    }

    #[test]
    fn test_identifier_is_normalized() {
        let p = patterns();
        let catalog = DefaultCatalog::new();
        let converter = Converter::new(&p, &catalog, "x;", "  abc ");
        assert_eq!(converter.identifier(), "ABC");
        assert!(converter.is_valid());
        assert_eq!(converter.validation_error_message(), None);
    }

    #[test]
    fn test_validation_error_message() {
        let p = patterns();
        let catalog = DefaultCatalog::new();
        let converter = Converter::new(&p, &catalog, "delete from s.t where a = 1;", "");
        assert_eq!(
            converter.validation_error_message().as_deref(),
            Some("An identifier is required.")
        );
    }

    #[test]
    fn test_annotation_marks_every_occurrence_once() {
        let p = patterns();
        let catalog = DefaultCatalog::new();
        let converter = Converter::new(&p, &catalog, "x;", "id");
        let annotated = converter.annotate(
            "a ~~ 1 and b = 2 or a ~~ 1;",
            &["a ~~ 1".to_string(), "a ~~ 1".to_string(), "missing".to_string()],
        );
        assert_eq!(annotated, "[PARAMERROR]a ~~ 1 and b = 2 or [PARAMERROR]a ~~ 1;");
    }

    #[test]
    fn test_final_shape_failure_keeps_converted_sql() {
        let p = patterns();
        let catalog = DefaultCatalog::new();
        let converter = Converter::new(&p, &catalog, "x;", "id");
        let statement = parser::classify_statement("merge into s.t;");
        let record = converter.failure_record(
            &statement,
            ConvertError::FinalShape {
                kind: StatementKind::Merge,
                sql: "values (1)".to_string(),
            },
        );
        assert_eq!(
            record,
            ConversionRecord::failed("values (1)", "Merge statement was not converted.")
        );
    }

    #[test]
    fn test_statement_kinds() {
        let p = patterns();
        let catalog = DefaultCatalog::new();
        let converter = Converter::new(
            &p,
            &catalog,
            "delete from s.t where a = 1; select 1;",
            "id",
        );
        assert_eq!(
            converter.statement_kinds(),
            vec![StatementKind::Delete, StatementKind::Unknown]
        );
    }
}

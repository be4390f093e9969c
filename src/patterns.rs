//! Compiled patterns shared by every stage of the pipeline.
//!
//! [`Patterns::compile`] turns a [`ConverterConfig`] into one immutable value
//! holding every regex and placeholder format. It is built once per converter
//! and handed to each component by reference.

use regex::Regex;
use std::time::Duration;

use crate::budget::MatchBudget;
use crate::config::ConverterConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::validator::PredicateForm;

/// A placeholder template such as `STR_{n}`, split around its sequence slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderFormat {
    prefix: String,
    suffix: String,
}

impl PlaceholderFormat {
    pub fn parse(format: &str) -> ConvertResult<Self> {
        let (prefix, suffix) = format.split_once("{n}").ok_or_else(|| {
            ConvertError::config(format!("placeholder '{}' has no {{n}} slot", format))
        })?;
        if prefix.is_empty() && suffix.is_empty() {
            return Err(ConvertError::config("placeholder is only a sequence slot"));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Token for sequence number `n` (1-based).
    pub fn token(&self, n: usize) -> String {
        format!("{}{}{}", self.prefix, n, self.suffix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// This format with `_` appended to the prefix until the prefix is
    /// non-empty and absent from `text`.
    pub fn avoiding(&self, text: &str) -> Self {
        let mut prefix = self.prefix.clone();
        while prefix.is_empty() || text.contains(prefix.as_str()) {
            prefix.push('_');
        }
        Self {
            prefix,
            suffix: self.suffix.clone(),
        }
    }
}

/// Every compiled pattern used during conversion.
#[derive(Debug, Clone)]
pub struct Patterns {
    // placeholders
    pub literal: Regex,
    pub literal_format: PlaceholderFormat,
    pub subquery_format: PlaceholderFormat,
    pub resolved_placeholder: String,

    // statement headers
    pub delete_header: Regex,
    pub update_header: Regex,
    pub update_set: Regex,
    pub update_span: Regex,
    pub assignment_target: Regex,
    pub merge_header: Regex,
    pub merge_matched: Regex,
    pub select_prefix: Regex,

    // predicate clauses
    pub where_keyword: Regex,
    pub boundary_keywords: Regex,
    pub predicate_forms: Vec<(PredicateForm, Regex)>,

    // global normalizations
    pub using_token: Regex,
    pub temp_prefix: Regex,
    pub entity_call: Regex,
    pub entity_token: Regex,
    pub connective_break: Regex,
    pub space_run: Regex,
    pub final_shape: Regex,

    pub entity_function: String,
    pub error_marker: String,
    pub terminator: char,
    pub disallowed_quotes: Vec<char>,
    pub match_timeout: Duration,
}

impl Patterns {
    pub fn compile(config: &ConverterConfig) -> ConvertResult<Self> {
        config.check()?;

        let literal_format = PlaceholderFormat::parse(&config.literal_placeholder)?;
        let subquery_format = PlaceholderFormat::parse(&config.subquery_placeholder)?;

        let entity_token = regex::escape(&config.entity_token);
        let entity_token = if config.entity_token.ends_with(is_word_char) {
            format!(r"(?i){}\b", entity_token)
        } else {
            format!(r"(?i){}", entity_token)
        };

        let predicate_forms = PredicateForm::ALL
            .into_iter()
            .map(|form| -> ConvertResult<(PredicateForm, Regex)> {
                Ok((form, compile(form.pattern())?))
            })
            .collect::<ConvertResult<Vec<_>>>()?;

        Ok(Self {
            literal: compile(r"'[^']*'")?,
            resolved_placeholder: config.resolved_placeholder.clone(),

            delete_header: compile(
                r"(?is)\bdelete\s+from\s+(?P<table>\w+\.\w+)\s+(?:\w+\s+)?(?P<where>where)\b",
            )?,
            update_header: compile(r"(?is)\bupdate\s+\w+\.\w+\s+(?:\w+\s+)?set\b")?,
            update_set: compile(r"(?is)\bset\b\s*(?P<assignments>.+?=.+?)\s*\bwhere\b")?,
            update_span: compile(r"(?is)\bupdate\s+(?P<target>.+?)\s+set\b.*?(?P<where>\bwhere\b)")?,
            assignment_target: compile(r"^\s*\(?\s*(?:\w+\.)?(?P<field>\w+)\s*\)?\s*$")?,
            merge_header: compile(
                r"(?is)\bmerge\s+into\s+\w+\.\w+(?:@\w+)?\s+(?:\w+\s+)?using\s*(?P<source>\(.+?\))\s*(?:\w+\s+)?on\b",
            )?,
            merge_matched: compile(
                r"(?is)\bwhen\s+(?:not\s+)?matched\s+then\s+(?:update|insert|delete)\b",
            )?,
            select_prefix: compile(r"(?is)^\s*select\b.*?(?P<where>\bwhere\b)")?,

            where_keyword: compile(r"(?i)\bwhere\b")?,
            boundary_keywords: compile(r"(?i)(?:^|\s)(?:where|and|or)\s")?,
            predicate_forms,

            using_token: compile(r"(?i)\busing\b")?,
            temp_prefix: compile(&format!(r"(?i)\b{}", regex::escape(&config.temp_prefix)))?,
            entity_call: compile(&format!(
                r"(?i)\b{}\s*\(\s*(?P<arg>[^()\s]+)\s*\)",
                regex::escape(&config.entity_function)
            ))?,
            entity_token: compile(&entity_token)?,
            connective_break: compile(r"(?i)[ \n]+(from|join|and|where|or)[ \n]+")?,
            space_run: compile(r"[ ]{2,}")?,
            final_shape: compile(r"(?i)^(?:select|with)\b")?,

            literal_format,
            subquery_format,
            entity_function: config.entity_function.clone(),
            error_marker: config.error_marker.clone(),
            terminator: config.terminator,
            disallowed_quotes: config.disallowed_quotes.clone(),
            match_timeout: config.match_timeout(),
        })
    }

    pub fn budget(&self) -> MatchBudget {
        MatchBudget::new(self.match_timeout)
    }
}

fn compile(source: &str) -> ConvertResult<Regex> {
    Regex::new(source).map_err(|e| ConvertError::config(format!("bad pattern '{}': {}", source, e)))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

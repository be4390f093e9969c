//! User-facing message catalog.
//!
//! Every message shown to a caller is looked up by [`MessageKey`] and
//! formatted with positional `{0}`, `{1}`, ... arguments. The converter only
//! depends on the [`MessageCatalog`] trait, so callers can plug in their own
//! localized text.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Every message the converter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    DefaultRequirements,
    SqlRequired,
    IdRequired,
    InvalidSingleQuote,
    NoTerminator,
    DeleteInvalid,
    UpdateInvalidUpdate,
    UpdateInvalidSet,
    MergeInvalid,
    MergeInvalidMatchedClause,
    /// `{0}` = statement kind
    NotConverted,
    /// `{0}` = statement kind
    SuccessfullyConverted,
    Timeout,
    /// `{0}` = leading keyword
    UnsupportedStatement,
}

impl MessageKey {
    pub const ALL: [MessageKey; 14] = [
        MessageKey::DefaultRequirements,
        MessageKey::SqlRequired,
        MessageKey::IdRequired,
        MessageKey::InvalidSingleQuote,
        MessageKey::NoTerminator,
        MessageKey::DeleteInvalid,
        MessageKey::UpdateInvalidUpdate,
        MessageKey::UpdateInvalidSet,
        MessageKey::MergeInvalid,
        MessageKey::MergeInvalidMatchedClause,
        MessageKey::NotConverted,
        MessageKey::SuccessfullyConverted,
        MessageKey::Timeout,
        MessageKey::UnsupportedStatement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::DefaultRequirements => "default-requirements",
            MessageKey::SqlRequired => "sql-required",
            MessageKey::IdRequired => "id-required",
            MessageKey::InvalidSingleQuote => "invalid-single-quote",
            MessageKey::NoTerminator => "no-terminator",
            MessageKey::DeleteInvalid => "delete-invalid",
            MessageKey::UpdateInvalidUpdate => "update-invalid-update",
            MessageKey::UpdateInvalidSet => "update-invalid-set",
            MessageKey::MergeInvalid => "merge-invalid",
            MessageKey::MergeInvalidMatchedClause => "merge-invalid-matched-clause",
            MessageKey::NotConverted => "not-converted",
            MessageKey::SuccessfullyConverted => "successfully-converted",
            MessageKey::Timeout => "timeout",
            MessageKey::UnsupportedStatement => "unsupported-statement",
        }
    }

    /// Built-in English template.
    pub fn default_template(self) -> &'static str {
        match self {
            MessageKey::DefaultRequirements => "SQL and an identifier are required.",
            MessageKey::SqlRequired => "SQL is required.",
            MessageKey::IdRequired => "An identifier is required.",
            MessageKey::InvalidSingleQuote => {
                "SQL contains an invalid single quote (’). Use a plain single quote (') instead."
            }
            MessageKey::NoTerminator => "Every statement must end with a semicolon (;).",
            MessageKey::DeleteInvalid => {
                "Delete statement is invalid. Expected: DELETE FROM <schema>.<table> [alias] WHERE ..."
            }
            MessageKey::UpdateInvalidUpdate => {
                "Update statement is invalid. Expected: UPDATE <schema>.<table> [alias] SET ..."
            }
            MessageKey::UpdateInvalidSet => {
                "Update SET clause is invalid. Expected: SET <field> = <value>[, ...] WHERE ..."
            }
            MessageKey::MergeInvalid => {
                "Merge statement is invalid. Expected: MERGE INTO <schema>.<table> [alias] USING (<select>) [alias] ON ..."
            }
            MessageKey::MergeInvalidMatchedClause => {
                "Merge statement needs a WHEN [NOT] MATCHED THEN UPDATE|INSERT|DELETE clause."
            }
            MessageKey::NotConverted => "{0} statement was not converted.",
            MessageKey::SuccessfullyConverted => "{0} statement converted successfully.",
            MessageKey::Timeout => "Statement took too long to validate and was not converted.",
            MessageKey::UnsupportedStatement => {
                "Unsupported statement '{0}'. Only UPDATE, DELETE and MERGE can be converted."
            }
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown message key '{}'", s))
    }
}

/// Keyed lookup of user-facing text.
pub trait MessageCatalog {
    /// Resolve `key` and substitute positional arguments.
    fn resolve(&self, key: MessageKey, args: &[&str]) -> String;
}

/// Built-in English catalog with optional per-key overrides.
#[derive(Debug, Clone, Default)]
pub struct DefaultCatalog {
    overrides: HashMap<MessageKey, String>,
}

impl DefaultCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog whose templates are replaced by `overrides` where present.
    pub fn with_overrides(overrides: HashMap<MessageKey, String>) -> Self {
        Self { overrides }
    }

    pub fn template(&self, key: MessageKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_template())
    }
}

impl MessageCatalog for DefaultCatalog {
    fn resolve(&self, key: MessageKey, args: &[&str]) -> String {
        format_template(self.template(key), args)
    }
}

/// Replace `{0}`, `{1}`, ... with the matching argument. Unknown indexes are
/// left as written.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", i), arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_args() {
        let catalog = DefaultCatalog::new();
        assert_eq!(
            catalog.resolve(MessageKey::NotConverted, &["Delete"]),
            "Delete statement was not converted."
        );
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = HashMap::new();
        overrides.insert(MessageKey::Timeout, "zu langsam ({0})".to_string());
        let catalog = DefaultCatalog::with_overrides(overrides);

        assert_eq!(catalog.resolve(MessageKey::Timeout, &["x"]), "zu langsam (x)");
        assert_eq!(
            catalog.resolve(MessageKey::SqlRequired, &[]),
            "SQL is required."
        );
    }

    #[test]
    fn test_unknown_index_is_kept() {
        assert_eq!(format_template("{0} and {1}", &["a"]), "a and {1}");
    }

    #[test]
    fn test_keys_round_trip_through_str() {
        for key in MessageKey::ALL {
            assert_eq!(key.as_str().parse::<MessageKey>(), Ok(key));
        }
        assert!("delete_invalid".parse::<MessageKey>().is_err());
    }
}

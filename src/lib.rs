//! # dml-preview
//!
//! Rewrites UPDATE, DELETE and MERGE statements into read-only SELECTs, so the
//! rows a mutation would touch can be previewed before it runs.
//!
//! ## Quick Example
//!
//! ```
//! let records = dml_preview::convert(
//!     "delete from sales.orders o where o.status = 'X';",
//!     "abc",
//! )?;
//!
//! assert!(!records[0].is_error);
//! assert!(records[0].sql.starts_with("select *\nfrom sales.orders"));
//! # Ok::<(), dml_preview::ConvertError>(())
//! ```
//!
//! ## Statements
//!
//! | Input                                    | Preview                           |
//! |------------------------------------------|-----------------------------------|
//! | `DELETE FROM s.t [a] WHERE ...`          | `SELECT * FROM s.t WHERE ...`     |
//! | `UPDATE s.t [a] SET a.x = .. WHERE ...`  | `SELECT x FROM s.t [a] WHERE ...` |
//! | `MERGE INTO s.t USING (SELECT ..) ON ..` | the USING subquery                |
//!
//! Every predicate in the WHERE clause, including those of nested
//! subqueries, must match one of the forms in [`validator::PredicateForm`].

pub mod budget;
pub mod config;
pub mod converter;
pub mod error;
pub mod messages;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod patterns;
pub mod placeholder;
pub mod scanner;
pub mod statement;
pub mod validator;

pub use error::{ConvertError, ConvertResult};

pub mod prelude {
    pub use crate::config::ConverterConfig;
    pub use crate::converter::Converter;
    pub use crate::error::*;
    pub use crate::messages::{DefaultCatalog, MessageCatalog, MessageKey};
    pub use crate::output::{to_wire_format, ConversionRecord};
    pub use crate::patterns::Patterns;
    pub use crate::statement::{Statement, StatementKind};
    pub use crate::validator::PredicateForm;
}

/// Convert a batch with the default configuration and English messages.
pub fn convert(sql: &str, identifier: &str) -> ConvertResult<Vec<output::ConversionRecord>> {
    let config = config::ConverterConfig::default();
    let patterns = patterns::Patterns::compile(&config)?;
    let catalog = messages::DefaultCatalog::new();
    converter::Converter::new(&patterns, &catalog, sql, identifier).convert()
}

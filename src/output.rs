//! Conversion records and their wire format.

use serde::{Deserialize, Serialize};

use crate::error::ConvertResult;

/// Outcome for one input statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub sql: String,
    pub is_error: bool,
    pub message: String,
}

impl ConversionRecord {
    pub fn converted(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            is_error: false,
            message: message.into(),
        }
    }

    pub fn failed(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            is_error: true,
            message: message.into(),
        }
    }
}

/// Serialize records, in order, as a compact JSON array.
pub fn to_wire_format(records: &[ConversionRecord]) -> ConvertResult<Vec<u8>> {
    Ok(serde_json::to_vec(records)?)
}

/// Indented JSON, for terminals.
pub fn to_pretty_json(records: &[ConversionRecord]) -> ConvertResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parse records previously produced by [`to_wire_format`].
pub fn from_wire_format(bytes: &[u8]) -> ConvertResult<Vec<ConversionRecord>> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_uses_camel_case() {
        let records = vec![
            ConversionRecord::converted("select 1", "ok"),
            ConversionRecord::failed("delete from t;", "bad"),
        ];
        let bytes = to_wire_format(&records).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"sql":"select 1","isError":false,"message":"ok"},{"sql":"delete from t;","isError":true,"message":"bad"}]"#
        );
    }

    #[test]
    fn test_wire_format_is_readable_back() {
        let records = vec![ConversionRecord::failed("x\n'y'", "line\nbreak")];
        let bytes = to_wire_format(&records).unwrap();
        assert_eq!(from_wire_format(&bytes).unwrap(), records);
    }
}

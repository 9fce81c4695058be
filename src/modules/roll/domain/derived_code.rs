use crate::shared::errors::{AppError, AppResult};
use std::fmt;

pub const DERIVED_CODE_LEN: usize = 18;
pub const UNIT_ID_LEN: usize = 23;

/// Suffix reserved for synthetic aggregate records. Real units never carry it.
pub const AGGREGATE_SUFFIX: &str = "9999";

/// The roll's 18-character unit code (MAT18).
///
/// Three mandatory segments followed by three optional ones that default to
/// zero padding: `A(4) B(2) C(4) D(1, "0") E(3, "000") F(4, "0000")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedCode(String);

#[derive(Debug, Clone, Default)]
pub struct CodeSegments<'a> {
    pub a: Option<&'a str>,
    pub b: Option<&'a str>,
    pub c: Option<&'a str>,
    pub d: Option<&'a str>,
    pub e: Option<&'a str>,
    pub f: Option<&'a str>,
}

impl DerivedCode {
    pub fn from_segments(segments: &CodeSegments<'_>) -> AppResult<Self> {
        let mandatory = |value: Option<_>, name: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::ParseError(format!("missing code segment {}", name)))
        };
        let optional = |value: Option<&str>, default: &'static str| -> String {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let code = [
            mandatory(segments.a, "A")?.to_string(),
            mandatory(segments.b, "B")?.to_string(),
            mandatory(segments.c, "C")?.to_string(),
            optional(segments.d, "0"),
            optional(segments.e, "000"),
            optional(segments.f, "0000"),
        ]
        .concat();

        Self::parse(&code)
    }

    pub fn parse(code: &str) -> AppResult<Self> {
        if code.chars().count() != DERIVED_CODE_LEN {
            return Err(AppError::ParseError(format!(
                "derived code '{}' must be {} characters",
                code, DERIVED_CODE_LEN
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_aggregate(&self) -> bool {
        self.0.ends_with(AGGREGATE_SUFFIX)
    }

    /// Composite primary key: municipality code followed by this code.
    pub fn unit_id(&self, muni_code: &str) -> AppResult<String> {
        let id = format!("{}{}", muni_code.trim(), self.0);
        if id.chars().count() != UNIT_ID_LEN {
            return Err(AppError::ParseError(format!(
                "unit id '{}' must be {} characters",
                id, UNIT_ID_LEN
            )));
        }
        Ok(id)
    }
}

impl fmt::Display for DerivedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace the last four characters with the aggregate sentinel.
pub fn aggregate_key(key: &str) -> String {
    let keep = key.char_indices().rev().nth(3).map(|(i, _)| i).unwrap_or(0);
    format!("{}{}", &key[..keep], AGGREGATE_SUFFIX)
}

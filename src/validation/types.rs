//! Best-effort type categories
//!
//! Declared column types are bucketed into coarse categories; only clear mismatches
//! between categories are reported. Anything unrecognised is `Other` and compatible
//! with everything.

use sqlparser::ast::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Numeric,
    Text,
    Boolean,
    Temporal,
    Other,
}

const NUMERIC_TYPES: &[&str] = &[
    "int", "int2", "int4", "int8", "integer", "smallint", "bigint", "tinyint", "mediumint",
    "serial", "serial4", "serial8", "smallserial", "bigserial", "numeric", "decimal", "real",
    "float", "float4", "float8", "money", "number",
];

const TEXT_TYPES: &[&str] = &[
    "text", "varchar", "char", "bpchar", "string", "citext", "name", "nvarchar", "nchar",
    "clob", "tinytext", "mediumtext", "longtext",
];

const BOOLEAN_WORDS: &[&str] = &["t", "f", "true", "false", "yes", "no", "y", "n", "on", "off", "1", "0"];

impl TypeCategory {
    pub fn of(declared_type: &str) -> Self {
        let lowered = declared_type.trim().to_lowercase();
        if lowered.ends_with("[]") || lowered.starts_with('_') {
            return TypeCategory::Other;
        }
        let base = lowered.split('(').next().unwrap_or_default().trim();
        let base = base.trim_end_matches(" unsigned");

        if NUMERIC_TYPES.contains(&base) || base.starts_with("double") {
            TypeCategory::Numeric
        } else if TEXT_TYPES.contains(&base) || base.starts_with("character") {
            TypeCategory::Text
        } else if base == "bool" || base == "boolean" {
            TypeCategory::Boolean
        } else if base == "date" || base == "datetime" || base.starts_with("time") || base.starts_with("interval") {
            TypeCategory::Temporal
        } else {
            TypeCategory::Other
        }
    }

    pub fn accepts(self, literal: &Literal) -> bool {
        match (self, literal) {
            (_, Literal::Null) | (TypeCategory::Other, _) => true,
            (TypeCategory::Numeric, Literal::Number(_)) => true,
            // Quoted numbers are coerced by the database.
            (TypeCategory::Numeric, Literal::Text(s)) => s.trim().parse::<f64>().is_ok(),
            (TypeCategory::Text, Literal::Text(_)) | (TypeCategory::Temporal, Literal::Text(_)) => true,
            (TypeCategory::Boolean, Literal::Boolean(_)) => true,
            (TypeCategory::Boolean, Literal::Text(s)) => {
                BOOLEAN_WORDS.contains(&s.trim().to_lowercase().as_str())
            }
            _ => false,
        }
    }

    pub fn compatible_with(self, other: TypeCategory) -> bool {
        self == TypeCategory::Other || other == TypeCategory::Other || self == other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(String),
    Text(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n, _) => Some(Literal::Number(n.clone())),
            Value::SingleQuotedString(s)
            | Value::EscapedStringLiteral(s)
            | Value::NationalStringLiteral(s) => Some(Literal::Text(s.clone())),
            Value::Boolean(b) => Some(Literal::Boolean(*b)),
            Value::Null => Some(Literal::Null),
            _ => None,
        }
    }

    pub(crate) fn negated(self) -> Self {
        match self {
            Literal::Number(n) => Literal::Number(format!("-{}", n)),
            other => other,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Literal::Number(n) => format!("numeric literal {}", n),
            Literal::Text(s) => format!("string literal '{}'", s),
            Literal::Boolean(b) => format!("boolean literal {}", b),
            Literal::Null => "NULL".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorises_common_declared_types() {
        assert_eq!(TypeCategory::of("INTEGER"), TypeCategory::Numeric);
        assert_eq!(TypeCategory::of("numeric(10,2)"), TypeCategory::Numeric);
        assert_eq!(TypeCategory::of("double precision"), TypeCategory::Numeric);
        assert_eq!(TypeCategory::of("character varying"), TypeCategory::Text);
        assert_eq!(TypeCategory::of("varchar(255)"), TypeCategory::Text);
        assert_eq!(TypeCategory::of("timestamp with time zone"), TypeCategory::Temporal);
        assert_eq!(TypeCategory::of("date"), TypeCategory::Temporal);
        assert_eq!(TypeCategory::of("boolean"), TypeCategory::Boolean);
        assert_eq!(TypeCategory::of("point"), TypeCategory::Other);
        assert_eq!(TypeCategory::of("_int4"), TypeCategory::Other);
        assert_eq!(TypeCategory::of("jsonb"), TypeCategory::Other);
    }

    #[test]
    fn literal_compatibility() {
        let numeric = TypeCategory::Numeric;
        assert!(numeric.accepts(&Literal::Number("5".into())));
        assert!(numeric.accepts(&Literal::Text("5".into())));
        assert!(!numeric.accepts(&Literal::Text("five".into())));
        assert!(!TypeCategory::Text.accepts(&Literal::Number("5".into())));
        assert!(TypeCategory::Temporal.accepts(&Literal::Text("2024-01-01".into())));
        assert!(TypeCategory::Boolean.accepts(&Literal::Text("t".into())));
        assert!(TypeCategory::Text.accepts(&Literal::Null));
        assert!(TypeCategory::Other.accepts(&Literal::Boolean(true)));
        assert!(!TypeCategory::Numeric.compatible_with(TypeCategory::Text));
        assert!(TypeCategory::Numeric.compatible_with(TypeCategory::Other));
    }
}

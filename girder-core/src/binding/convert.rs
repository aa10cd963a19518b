// Scalar conversion table used by the binder

use super::descriptor::{ScalarType, TemporalType};
use super::value::Value;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Date formats tried in order for [`TemporalType::Date`]; first success wins.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%m/%d/%Y"];

/// Conversion failure. The binder logs these and substitutes a default.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("cannot convert '{value}' to {target}: {reason}")]
    Invalid {
        value: String,
        target: String,
        reason: String,
    },

    #[error("no converter registered for {0}")]
    Unsupported(String),
}

impl ConversionError {
    pub fn invalid(value: &str, target: &str, reason: impl fmt::Display) -> Self {
        ConversionError::Invalid {
            value: value.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A string-to-value converter.
pub type Converter = Arc<dyn Fn(&str) -> Result<Value, ConversionError> + Send + Sync>;

/// Pluggable scalar conversions keyed by [`ScalarType`].
///
/// [`ConversionTable::new`] installs the built-in primitives; applications
/// register converters for their own [`ScalarType::Custom`] types or override
/// a built-in one.
#[derive(Clone)]
pub struct ConversionTable {
    converters: HashMap<ScalarType, Converter>,
}

impl fmt::Debug for ConversionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.converters.keys().map(ScalarType::name).collect();
        names.sort_unstable();
        f.debug_struct("ConversionTable")
            .field("converters", &names)
            .finish()
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionTable {
    /// Table with the built-in primitive conversions
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.register(ScalarType::Str, |raw| Ok(Value::Str(raw.to_string())));
        table.register(ScalarType::Bool, |raw| {
            Ok(Value::Bool(raw.eq_ignore_ascii_case("true")))
        });
        table.register(ScalarType::Byte, |raw| parse_number(raw, "i8").map(Value::Byte));
        table.register(ScalarType::Short, |raw| parse_number(raw, "i16").map(Value::Short));
        table.register(ScalarType::Int, |raw| parse_number(raw, "i32").map(Value::Int));
        table.register(ScalarType::Long, |raw| parse_number(raw, "i64").map(Value::Long));
        table.register(ScalarType::Float, |raw| parse_number(raw.trim(), "f32").map(Value::Float));
        table.register(ScalarType::Double, |raw| {
            parse_number(raw.trim(), "f64").map(Value::Double)
        });
        table.register(ScalarType::Char, |raw| {
            Ok(Value::Char(raw.chars().next().unwrap_or('\0')))
        });
        table
    }

    /// Table with no converters at all
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Install or replace the converter for a scalar type.
    pub fn register<F>(&mut self, ty: ScalarType, converter: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.converters.insert(ty, Arc::new(converter));
        self
    }

    pub fn supports(&self, ty: &ScalarType) -> bool {
        self.converters.contains_key(ty)
    }

    /// Convert a non-blank raw value.
    pub fn convert(&self, ty: &ScalarType, raw: &str) -> Result<Value, ConversionError> {
        let converter = self
            .converters
            .get(ty)
            .ok_or_else(|| ConversionError::Unsupported(ty.name().to_string()))?;
        converter(raw)
    }

    /// Value used for blank, missing or unconvertible input.
    pub fn zero_value(ty: &ScalarType) -> Value {
        match ty {
            ScalarType::Bool => Value::Bool(false),
            ScalarType::Byte => Value::Byte(0),
            ScalarType::Short => Value::Short(0),
            ScalarType::Int => Value::Int(0),
            ScalarType::Long => Value::Long(0),
            ScalarType::Float => Value::Float(0.0),
            ScalarType::Double => Value::Double(0.0),
            ScalarType::Char => Value::Char('\0'),
            ScalarType::Str | ScalarType::Custom(_) => Value::Null,
        }
    }
}

fn parse_number<T>(raw: &str, target: &str) -> Result<T, ConversionError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConversionError::invalid(raw, target, e))
}

/// Convert a date or arbitrary-precision number.
pub fn convert_temporal(ty: TemporalType, raw: &str) -> Result<Value, ConversionError> {
    match ty {
        TemporalType::Date => DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .map(Value::Date)
            .ok_or_else(|| ConversionError::invalid(raw, "Date", "no matching date format")),
        TemporalType::LocalDate => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| ConversionError::invalid(raw, "LocalDate", e)),
        TemporalType::LocalDateTime => raw
            .parse::<NaiveDateTime>()
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map(Value::DateTime)
            .map_err(|e| ConversionError::invalid(raw, "LocalDateTime", e)),
        TemporalType::BigDecimal => Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map(Value::Decimal)
            .map_err(|e| ConversionError::invalid(raw, "BigDecimal", e)),
        TemporalType::BigInteger => parse_number::<i128>(raw, "BigInteger").map(Value::BigInteger),
    }
}

/// Match an enum constant: exact case first, then case-insensitive.
pub fn convert_enum(constants: &[String], raw: &str) -> Option<Value> {
    constants
        .iter()
        .find(|constant| constant.as_str() == raw)
        .or_else(|| {
            constants
                .iter()
                .find(|constant| constant.eq_ignore_ascii_case(raw))
        })
        .map(|constant| Value::Enum(constant.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_numbers() {
        let table = ConversionTable::new();
        assert_eq!(table.convert(&ScalarType::Int, "42"), Ok(Value::Int(42)));
        assert_eq!(table.convert(&ScalarType::Long, "-7"), Ok(Value::Long(-7)));
        assert_eq!(table.convert(&ScalarType::Double, "2.5"), Ok(Value::Double(2.5)));
        assert!(table.convert(&ScalarType::Int, "abc").is_err());
        assert!(table.convert(&ScalarType::Byte, "300").is_err());
    }

    #[test]
    fn test_bool_accepts_only_true() {
        let table = ConversionTable::new();
        assert_eq!(table.convert(&ScalarType::Bool, "TRUE"), Ok(Value::Bool(true)));
        assert_eq!(table.convert(&ScalarType::Bool, "yes"), Ok(Value::Bool(false)));
        assert_eq!(table.convert(&ScalarType::Bool, "1"), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_char_takes_first() {
        let table = ConversionTable::new();
        assert_eq!(table.convert(&ScalarType::Char, "xyz"), Ok(Value::Char('x')));
    }

    #[test]
    fn test_custom_converter() {
        let mut table = ConversionTable::new();
        let money = ScalarType::Custom("Money".to_string());
        assert!(matches!(
            table.convert(&money, "5"),
            Err(ConversionError::Unsupported(_))
        ));

        table.register(money.clone(), |raw| {
            raw.strip_prefix('$')
                .and_then(|n| n.parse::<i64>().ok())
                .map(|cents| Value::Long(cents * 100))
                .ok_or_else(|| ConversionError::invalid(raw, "Money", "expected $N"))
        });
        assert_eq!(table.convert(&money, "$3"), Ok(Value::Long(300)));
        assert_eq!(ConversionTable::zero_value(&money), Value::Null);
    }

    #[test]
    fn test_date_formats_in_order() {
        let date = |y, m, d| Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(convert_temporal(TemporalType::Date, "2024-03-12"), Ok(date(2024, 3, 12)));
        // dd/MM/yyyy is tried before MM/dd/yyyy
        assert_eq!(convert_temporal(TemporalType::Date, "05/03/2024"), Ok(date(2024, 3, 5)));
        assert_eq!(convert_temporal(TemporalType::Date, "2024/03/12"), Ok(date(2024, 3, 12)));
        assert_eq!(convert_temporal(TemporalType::Date, "03/25/2024"), Ok(date(2024, 3, 25)));
    }

    #[test]
    fn test_date_is_strict() {
        assert!(convert_temporal(TemporalType::Date, "2024-02-30").is_err());
        assert!(convert_temporal(TemporalType::Date, "yesterday").is_err());
    }

    #[test]
    fn test_iso_temporals() {
        assert!(convert_temporal(TemporalType::LocalDate, "2024-01-05").is_ok());
        assert!(convert_temporal(TemporalType::LocalDate, "05/01/2024").is_err());
        assert!(convert_temporal(TemporalType::LocalDateTime, "2024-01-05T10:30:00").is_ok());
        assert!(convert_temporal(TemporalType::LocalDateTime, "2024-01-05T10:30").is_ok());
    }

    #[test]
    fn test_big_numbers() {
        assert_eq!(
            convert_temporal(TemporalType::BigDecimal, "123.45"),
            Ok(Value::Decimal(Decimal::new(12345, 2)))
        );
        assert_eq!(
            convert_temporal(TemporalType::BigInteger, "170141183460469231731687303715884105727"),
            Ok(Value::BigInteger(i128::MAX))
        );
        assert!(convert_temporal(TemporalType::BigDecimal, "12..3").is_err());
        assert!(convert_temporal(TemporalType::BigInteger, "1.5").is_err());
    }

    #[test]
    fn test_big_integer_outside_i128_is_rejected() {
        assert_eq!(
            convert_temporal(TemporalType::BigInteger, "-170141183460469231731687303715884105728"),
            Ok(Value::BigInteger(i128::MIN))
        );
        let forty_digits = "1234567890123456789012345678901234567890";
        let err = convert_temporal(TemporalType::BigInteger, forty_digits).unwrap_err();
        assert!(err.to_string().contains("BigInteger"), "{}", err);
        assert!(convert_temporal(TemporalType::BigInteger, "170141183460469231731687303715884105728").is_err());
    }

    #[test]
    fn test_enum_exact_wins_over_case_insensitive() {
        let constants = vec!["ACTIVE".to_string(), "active".to_string(), "Closed".to_string()];
        assert_eq!(convert_enum(&constants, "active"), Some(Value::Enum("active".into())));
        assert_eq!(convert_enum(&constants, "ACTIVE"), Some(Value::Enum("ACTIVE".into())));
        assert_eq!(convert_enum(&constants, "closed"), Some(Value::Enum("Closed".into())));
        assert_eq!(convert_enum(&constants, "gone"), None);
    }
}

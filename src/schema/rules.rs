use std::fmt;

use crate::domain::Value;
use crate::error::FieldError;

/// Constraint attached to a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    NonEmpty,
    MaxLen(usize),
    Positive,
    NonNegative,
    Integer,
    /// 0 < x < 1
    OpenUnit,
    /// 0 <= x < 1
    HalfOpenUnit,
    AtLeast(f64),
    OneOf(&'static [&'static str]),
    EachOneOf(&'static [&'static str]),
    /// HH:MM on a 24h clock, applied to both ends of a time range
    ClockTime,
    /// YYYY-MM-DD, empty allowed
    IsoDate,
}

impl Rule {
    pub fn check(&self, field: &str, value: &Value) -> Result<(), FieldError> {
        match (self, value) {
            (Rule::NonEmpty, Value::Text(s)) if s.trim().is_empty() => Err(
                FieldError::constraint(field, format!("{} cannot be empty", field)),
            ),
            (Rule::MaxLen(max), Value::Text(s)) if s.chars().count() > *max => {
                Err(FieldError::constraint(
                    field,
                    format!("{} must be at most {} characters", field, max),
                ))
            }
            (Rule::Positive, Value::Number(n)) if *n <= 0.0 => Err(FieldError::constraint(
                field,
                format!("{} must be greater than 0: {}", field, n),
            )),
            (Rule::NonNegative, Value::Number(n)) if *n < 0.0 => Err(FieldError::constraint(
                field,
                format!("{} cannot be negative: {}", field, n),
            )),
            (Rule::Integer, Value::Number(n)) if n.fract() != 0.0 => Err(
                FieldError::constraint(field, format!("{} must be a whole number: {}", field, n)),
            ),
            (Rule::OpenUnit, Value::Number(n)) if *n <= 0.0 || *n >= 1.0 => {
                Err(FieldError::constraint(
                    field,
                    format!("{} must be between 0 and 1 (exclusive): {}", field, n),
                ))
            }
            (Rule::HalfOpenUnit, Value::Number(n)) if *n < 0.0 || *n >= 1.0 => {
                Err(FieldError::constraint(
                    field,
                    format!("{} must be at least 0 and below 1: {}", field, n),
                ))
            }
            (Rule::AtLeast(min), Value::Number(n)) if n < min => Err(FieldError::constraint(
                field,
                format!("{} must be at least {}: {}", field, min, n),
            )),
            (Rule::OneOf(allowed), Value::Text(s)) if !allowed.contains(&s.as_str()) => {
                Err(FieldError::constraint(
                    field,
                    format!("{} must be one of {}: '{}'", field, allowed.join("|"), s),
                ))
            }
            (Rule::EachOneOf(allowed), Value::StringList(items)) => {
                match items.iter().find(|item| !allowed.contains(&item.as_str())) {
                    Some(bad) => Err(FieldError::constraint(
                        field,
                        format!("{} entries must be one of {}: '{}'", field, allowed.join("|"), bad),
                    )),
                    None => Ok(()),
                }
            }
            (Rule::ClockTime, Value::TimeRange(range)) => {
                for end in [&range.start, &range.end] {
                    if !is_clock_time(end) {
                        return Err(FieldError::constraint(
                            field,
                            format!("{} must use HH:MM times: '{}'", field, end),
                        ));
                    }
                }
                Ok(())
            }
            (Rule::IsoDate, Value::Text(s)) if !s.is_empty() && !is_iso_date(s) => Err(
                FieldError::constraint(field, format!("{} must be YYYY-MM-DD: '{}'", field, s)),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::NonEmpty => write!(f, "non-empty"),
            Rule::MaxLen(max) => write!(f, "len<={}", max),
            Rule::Positive => write!(f, ">0"),
            Rule::NonNegative => write!(f, ">=0"),
            Rule::Integer => write!(f, "integer"),
            Rule::OpenUnit => write!(f, "(0,1)"),
            Rule::HalfOpenUnit => write!(f, "[0,1)"),
            Rule::AtLeast(min) => write!(f, ">={}", min),
            Rule::OneOf(allowed) | Rule::EachOneOf(allowed) => write!(f, "{}", allowed.join("|")),
            Rule::ClockTime => write!(f, "HH:MM"),
            Rule::IsoDate => write!(f, "YYYY-MM-DD"),
        }
    }
}

pub(super) fn parse_clock_time(raw: &str) -> Option<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

fn is_clock_time(raw: &str) -> bool {
    parse_clock_time(raw).is_some()
}

fn is_iso_date(raw: &str) -> bool {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

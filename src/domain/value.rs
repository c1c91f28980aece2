use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Number,
    Text,
    Boolean,
    TimeRange,
    StringList,
    ParameterMap,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::TimeRange => "time range",
            Self::StringList => "string list",
            Self::ParameterMap => "parameter map",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Entry of a strategy or model parameter map
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Self::Number(n) => number_json(*n),
            Self::Text(s) => Json::String(s.clone()),
        }
    }

    fn from_json(raw: &Json) -> Option<Self> {
        match raw {
            Json::Number(n) => n.as_f64().map(Self::Number),
            Json::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Operator input: numeric text becomes a number
    pub fn parse_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    TimeRange(TimeRange),
    StringList(Vec<String>),
    ParameterMap(BTreeMap<String, ParamValue>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Number(_) => ValueType::Number,
            Self::Text(_) => ValueType::Text,
            Self::Boolean(_) => ValueType::Boolean,
            Self::TimeRange(_) => ValueType::TimeRange,
            Self::StringList(_) => ValueType::StringList,
            Self::ParameterMap(_) => ValueType::ParameterMap,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_params(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            Self::ParameterMap(map) => Some(map),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::Number(n) => number_json(*n),
            Self::Text(s) => Json::String(s.clone()),
            Self::Boolean(b) => Json::Bool(*b),
            Self::TimeRange(range) => json!({ "start": range.start, "end": range.end }),
            Self::StringList(items) => {
                Json::Array(items.iter().cloned().map(Json::String).collect())
            }
            Self::ParameterMap(map) => {
                let obj: Map<String, Json> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                Json::Object(obj)
            }
        }
    }

    /// Decode JSON as the declared type.
    ///
    /// Numeric strings are accepted for numbers and "true"/"false" for booleans,
    /// since form-backed servers often echo input fields back as text.
    pub fn from_json(ty: ValueType, raw: &Json) -> Option<Self> {
        match (ty, raw) {
            (ValueType::Number, Json::Number(n)) => n.as_f64().map(Self::Number),
            (ValueType::Number, Json::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number),
            (ValueType::Text, Json::String(s)) => Some(Self::Text(s.clone())),
            (ValueType::Boolean, Json::Bool(b)) => Some(Self::Boolean(*b)),
            (ValueType::Boolean, Json::String(s)) => match s.trim() {
                "true" => Some(Self::Boolean(true)),
                "false" => Some(Self::Boolean(false)),
                _ => None,
            },
            (ValueType::TimeRange, Json::Object(obj)) => {
                let start = obj.get("start")?.as_str()?;
                let end = obj.get("end")?.as_str()?;
                Some(Self::TimeRange(TimeRange::new(start, end)))
            }
            (ValueType::StringList, Json::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(ToString::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::StringList),
            (ValueType::StringList, Json::String(s)) => Some(Self::StringList(split_list(s))),
            (ValueType::ParameterMap, Json::Object(obj)) => obj
                .iter()
                .map(|(k, v)| ParamValue::from_json(v).map(|p| (k.clone(), p)))
                .collect::<Option<BTreeMap<_, _>>>()
                .map(Self::ParameterMap),
            _ => None,
        }
    }

    /// Best-effort typing of JSON whose field is not declared by any schema
    pub fn infer(raw: &Json) -> Option<Self> {
        match raw {
            Json::Number(n) => n.as_f64().map(Self::Number),
            Json::String(s) => Some(Self::Text(s.clone())),
            Json::Bool(b) => Some(Self::Boolean(*b)),
            Json::Array(_) => Self::from_json(ValueType::StringList, raw),
            Json::Object(obj) => {
                let is_range = obj.len() == 2
                    && obj.get("start").is_some_and(Json::is_string)
                    && obj.get("end").is_some_and(Json::is_string);
                if is_range {
                    Self::from_json(ValueType::TimeRange, raw)
                } else {
                    Self::from_json(ValueType::ParameterMap, raw)
                }
            }
            Json::Null => None,
        }
    }

    /// Parse operator text input as the declared type
    pub fn parse_input(ty: ValueType, raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        match ty {
            ValueType::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number)
                .ok_or_else(|| format!("'{}' is not a number", trimmed)),
            ValueType::Text => Ok(Self::Text(trimmed.to_string())),
            ValueType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Self::Boolean(true)),
                "false" | "no" | "0" | "off" => Ok(Self::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", trimmed)),
            },
            ValueType::TimeRange => trimmed
                .split_once('-')
                .map(|(start, end)| Self::TimeRange(TimeRange::new(start.trim(), end.trim())))
                .ok_or_else(|| format!("'{}' is not a range, expected HH:MM-HH:MM", trimmed)),
            ValueType::StringList => Ok(Self::StringList(split_list(trimmed))),
            ValueType::ParameterMap => {
                let mut map = BTreeMap::new();
                for pair in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let (name, value) = pair
                        .split_once('=')
                        .or_else(|| pair.split_once(':'))
                        .ok_or_else(|| format!("'{}' is not a name=value pair", pair))?;
                    map.insert(name.trim().to_string(), ParamValue::parse_input(value));
                }
                Ok(Self::ParameterMap(map))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::TimeRange(range) => write!(f, "{}-{}", range.start, range.end),
            Self::StringList(items) => write!(f, "{}", items.join(",")),
            Self::ParameterMap(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{}", pairs.join(","))
            }
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Whole numbers serialize as JSON integers so servers with integer columns accept them
fn number_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

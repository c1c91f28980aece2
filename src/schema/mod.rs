//! Entity schema registry
//!
//! One immutable [`AttributeSchema`] per [`ConfigEntityKind`], built on first use.
//! Everything that needs to know what a valid record looks like (the stores,
//! the CLI editor, the reference service) goes through this module:
//! - [`schema_for`] - field table for a kind
//! - [`validate`] - full check of an attribute set, collecting every failure
//! - [`with_defaults`] - draft population for new records
//! - [`decode_record`] - lenient, schema-directed decoding of server JSON

pub mod kinds;
pub mod rules;

use serde_json::{Map, Value as Json};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::domain::{Attributes, ConfigEntityKind, ConfigRecord, ParamValue, Value, ValueType};
use crate::error::{FieldError, ValidationErrors};

pub use rules::Rule;

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub value_type: ValueType,
    pub required: bool,
    pub default: Option<Value>,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn required(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: true,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn optional(name: &'static str, default: Value) -> Self {
        Self {
            name,
            value_type: default.value_type(),
            required: false,
            default: Some(default),
            rules: Vec::new(),
        }
    }

    pub fn rules<const N: usize>(mut self, rules: [Rule; N]) -> Self {
        self.rules.extend(rules);
        self
    }

    /// snake_case spelling, as stored by the platform's database layer
    pub fn snake_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 4);
        for ch in self.name.chars() {
            if ch.is_ascii_uppercase() {
                out.push('_');
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub value_type: ValueType,
}

impl ParamSpec {
    pub fn number(name: &'static str) -> Self {
        Self {
            name,
            value_type: ValueType::Number,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self {
            name,
            value_type: ValueType::Text,
        }
    }
}

/// Extra parameters required when the discriminator takes a given value
#[derive(Debug, Clone)]
pub struct Variant {
    pub value: &'static str,
    pub params: Vec<ParamSpec>,
}

impl Variant {
    pub fn new(value: &'static str, params: Vec<ParamSpec>) -> Self {
        Self { value, params }
    }
}

#[derive(Debug, Clone)]
pub struct Discriminator {
    /// Text field selecting the variant (`type`, `modelType`)
    pub field: &'static str,
    /// Parameter map field the variant's parameters live in
    pub params_field: &'static str,
    pub variants: Vec<Variant>,
}

impl Discriminator {
    pub fn variant(&self, value: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

type CrossCheck = fn(&Attributes) -> Vec<FieldError>;

#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub kind: ConfigEntityKind,
    pub fields: Vec<FieldSpec>,
    pub discriminator: Option<Discriminator>,
    cross_check: Option<CrossCheck>,
}

impl AttributeSchema {
    fn new(kind: ConfigEntityKind, fields: Vec<FieldSpec>) -> Self {
        Self {
            kind,
            fields,
            discriminator: None,
            cross_check: None,
        }
    }

    fn discriminated_by(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    fn cross_check(mut self, check: CrossCheck) -> Self {
        self.cross_check = Some(check);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field matching a wire name, accepting the snake_case spelling
    pub fn field_for_wire(&self, wire: &str) -> Option<&FieldSpec> {
        self.field(wire)
            .or_else(|| self.fields.iter().find(|f| f.snake_name() == wire))
    }

    pub fn defaults(&self) -> Attributes {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.to_string(), d)))
            .collect()
    }

    /// Variant selected by the current discriminator value, if any is declared
    pub fn variant_for(&self, attrs: &Attributes) -> Option<&Variant> {
        let disc = self.discriminator.as_ref()?;
        let value = attrs.get(disc.field)?.as_text()?;
        disc.variant(value)
    }

    /// Key of the record these attributes describe
    pub fn key_of(&self, attrs: &Attributes) -> Option<String> {
        match self.kind.key_field() {
            Some(field) => attrs
                .get(field)
                .and_then(Value::as_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            None => self.kind.singleton_key().map(ToString::to_string),
        }
    }
}

static REGISTRY: OnceLock<Vec<AttributeSchema>> = OnceLock::new();

fn registry() -> &'static [AttributeSchema] {
    REGISTRY.get_or_init(|| ConfigEntityKind::ALL.iter().map(|k| kinds::build(*k)).collect())
}

/// Schema for a kind. Total over the enumeration.
pub fn schema_for(kind: ConfigEntityKind) -> &'static AttributeSchema {
    &registry()[kind.index()]
}

/// Attributes that passed [`validate`], with the key they resolve to
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub kind: ConfigEntityKind,
    pub key: String,
    pub attributes: Attributes,
}

impl ValidatedRecord {
    pub fn into_record(self, is_active: bool) -> ConfigRecord {
        ConfigRecord {
            kind: self.kind,
            key: self.key,
            is_active,
            attributes: self.attributes,
            extra: Map::new(),
        }
    }
}

/// Default-populated draft attributes for a kind
pub fn defaults(kind: ConfigEntityKind) -> Attributes {
    schema_for(kind).defaults()
}

/// Wire form of a record: attributes, unmodeled server fields, and `isActive`
pub fn encode_record(record: &ConfigRecord) -> Json {
    record.to_json()
}

/// Overlay operator-supplied attributes on the schema defaults
pub fn with_defaults(kind: ConfigEntityKind, attrs: &Attributes) -> Attributes {
    let mut merged = defaults(kind);
    for (name, value) in attrs {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Check an attribute set against its kind's schema.
///
/// Unknown discriminator values are accepted with no extra parameter
/// requirements.
pub fn validate(
    kind: ConfigEntityKind,
    attrs: &Attributes,
) -> Result<ValidatedRecord, ValidationErrors> {
    let schema = schema_for(kind);
    let mut errors = Vec::new();

    for name in attrs.keys() {
        if schema.field(name).is_none() {
            errors.push(FieldError::unknown(name.clone()));
        }
    }

    for field in &schema.fields {
        match attrs.get(field.name) {
            None if field.required => errors.push(FieldError::missing(field.name)),
            None => {}
            Some(value) if value.value_type() != field.value_type => {
                errors.push(FieldError::wrong_type(field.name, field.value_type.as_str()));
            }
            Some(value) => {
                errors.extend(
                    field
                        .rules
                        .iter()
                        .filter_map(|rule| rule.check(field.name, value).err()),
                );
            }
        }
    }

    if let Some(disc) = &schema.discriminator {
        errors.extend(check_variant_params(disc, attrs));
    }

    if errors.is_empty() {
        if let Some(check) = schema.cross_check {
            errors.extend(check(attrs));
        }
    }

    if !errors.is_empty() {
        return Err(ValidationErrors::new(kind, errors));
    }

    let key = schema.key_of(attrs).ok_or_else(|| {
        let field = kind.key_field().unwrap_or("key");
        ValidationErrors::single(kind, FieldError::missing(field))
    })?;

    Ok(ValidatedRecord {
        kind,
        key,
        attributes: attrs.clone(),
    })
}

fn check_variant_params(disc: &Discriminator, attrs: &Attributes) -> Vec<FieldError> {
    let Some(selected) = attrs.get(disc.field).and_then(Value::as_text) else {
        return Vec::new();
    };
    let Some(variant) = disc.variant(selected) else {
        debug!(
            discriminator = disc.field,
            value = selected,
            "no parameter schema for discriminator value, accepting as-is"
        );
        return Vec::new();
    };

    let empty = Default::default();
    let params = attrs
        .get(disc.params_field)
        .and_then(Value::as_params)
        .unwrap_or(&empty);

    variant
        .params
        .iter()
        .filter_map(|spec| match params.get(spec.name) {
            None => Some(FieldError::missing(spec.name)),
            Some(ParamValue::Number(_)) if spec.value_type == ValueType::Number => None,
            Some(ParamValue::Text(s)) if spec.value_type == ValueType::Text => {
                if s.trim().is_empty() {
                    Some(FieldError::missing(spec.name))
                } else {
                    None
                }
            }
            Some(_) => Some(FieldError::wrong_type(spec.name, spec.value_type.as_str())),
        })
        .collect()
}

/// Type a JSON object of operator input against the schema.
///
/// Declared fields are decoded as their declared type where possible; anything
/// else is inferred so [`validate`] can report it precisely.
pub fn attributes_from_json(kind: ConfigEntityKind, obj: &Map<String, Json>) -> Attributes {
    let schema = schema_for(kind);
    let mut attrs = Attributes::new();
    for (name, raw) in obj {
        if name == "isActive" || name == "is_active" || raw.is_null() {
            continue;
        }
        let typed = schema
            .field(name)
            .and_then(|field| Value::from_json(field.value_type, raw))
            .or_else(|| Value::infer(raw));
        if let Some(value) = typed {
            attrs.insert(name.clone(), value);
        }
    }
    attrs
}

/// Active flag carried by a JSON payload, if any
pub fn active_flag(obj: &Map<String, Json>) -> Option<bool> {
    obj.get("isActive")
        .or_else(|| obj.get("is_active"))
        .and_then(Json::as_bool)
}

pub fn active_flag_of(raw: &Json) -> Option<bool> {
    raw.as_object().and_then(active_flag)
}

/// Decode one server record.
///
/// The server is authoritative, so nothing here rejects a record for failing
/// validation. Fields that do not fit the schema are kept in `extra`.
pub fn decode_record(kind: ConfigEntityKind, raw: &Json) -> Result<ConfigRecord, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| format!("{} record is not a JSON object", kind))?;
    let schema = schema_for(kind);

    let mut attributes = Attributes::new();
    let mut extra = Map::new();
    for (wire, value) in obj {
        if wire == "isActive" || wire == "is_active" {
            continue;
        }
        let Some(field) = schema.field_for_wire(wire) else {
            extra.insert(wire.clone(), value.clone());
            continue;
        };
        if value.is_null() {
            continue;
        }
        match Value::from_json(field.value_type, value) {
            Some(typed) => {
                attributes.insert(field.name.to_string(), typed);
            }
            None => {
                warn!(
                    kind = %kind,
                    field = field.name,
                    expected = field.value_type.as_str(),
                    "server value does not match schema, keeping it untyped"
                );
                extra.insert(wire.clone(), value.clone());
            }
        }
    }

    let key = schema.key_of(&attributes).ok_or_else(|| {
        format!(
            "{} record has no '{}'",
            kind,
            kind.key_field().unwrap_or("key")
        )
    })?;

    Ok(ConfigRecord {
        kind,
        key,
        is_active: active_flag(obj).unwrap_or(true),
        attributes,
        extra,
    })
}

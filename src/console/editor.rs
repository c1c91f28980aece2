//! One record editor for every kind, driven by the kind's attribute schema.
//!
//! Operator input arrives as `field=value` assignments (`--set`) or a JSON
//! object (`--data`). The draft only types the input; validation happens in
//! the store when the draft is committed.

use serde_json::{Map, Value as Json};

use crate::domain::{Attributes, ConfigEntityKind, ConfigRecord, ParamValue, RecordPatch, Value, ValueType};
use crate::error::{ConsoleError, Result};
use crate::schema::{self, schema_for};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    kind: ConfigEntityKind,
    attributes: Attributes,
    is_active: bool,
}

impl RecordDraft {
    /// Blank form: schema defaults, active
    pub fn new(kind: ConfigEntityKind) -> Self {
        Self {
            kind,
            attributes: schema::defaults(kind),
            is_active: true,
        }
    }

    /// Form pre-filled from an existing record
    pub fn from_record(record: &ConfigRecord) -> Self {
        Self {
            kind: record.kind,
            attributes: record.attributes.clone(),
            is_active: record.is_active,
        }
    }

    pub fn kind(&self) -> ConfigEntityKind {
        self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    /// Apply one `name=value` assignment.
    ///
    /// `parameters.lookback_period=20` sets a single entry of a parameter map.
    /// Names the schema does not declare are kept as text so validation can
    /// report them.
    pub fn assign(&mut self, assignment: &str) -> Result<()> {
        let (name, raw) = assignment.split_once('=').ok_or_else(|| {
            ConsoleError::InvalidInput(format!("expected name=value, got '{}'", assignment))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConsoleError::InvalidInput(format!(
                "missing field name in '{}'",
                assignment
            )));
        }

        if name == "isActive" || name == "is_active" {
            let value = Value::parse_input(ValueType::Boolean, raw)
                .map_err(|e| ConsoleError::InvalidInput(format!("{}: {}", name, e)))?;
            self.is_active = value.as_bool().unwrap_or(self.is_active);
            return Ok(());
        }

        if let Some((map_field, param)) = name.split_once('.') {
            return self.assign_param(map_field.trim(), param.trim(), raw);
        }

        let schema = schema_for(self.kind);
        match schema.field_for_wire(name) {
            Some(field) => {
                let value = Value::parse_input(field.value_type, raw)
                    .map_err(|e| ConsoleError::InvalidInput(format!("{}: {}", field.name, e)))?;
                self.attributes.insert(field.name.to_string(), value);
            }
            None => {
                self.attributes
                    .insert(name.to_string(), Value::text(raw.trim()));
            }
        }
        Ok(())
    }

    fn assign_param(&mut self, map_field: &str, param: &str, raw: &str) -> Result<()> {
        let schema = schema_for(self.kind);
        let field = schema
            .field_for_wire(map_field)
            .filter(|f| f.value_type == ValueType::ParameterMap)
            .ok_or_else(|| {
                ConsoleError::InvalidInput(format!(
                    "{} has no parameter map named '{}'",
                    self.kind, map_field
                ))
            })?;
        if param.is_empty() {
            return Err(ConsoleError::InvalidInput(format!(
                "missing parameter name after '{}.'",
                map_field
            )));
        }

        // Parameters the selected variant declares as text stay text even if numeric
        let declared_text = schema
            .variant_for(&self.attributes)
            .and_then(|v| v.params.iter().find(|p| p.name == param))
            .is_some_and(|p| p.value_type == ValueType::Text);
        let value = if declared_text {
            ParamValue::Text(raw.trim().to_string())
        } else {
            ParamValue::parse_input(raw)
        };

        let entry = self
            .attributes
            .entry(field.name.to_string())
            .or_insert_with(|| Value::ParameterMap(Default::default()));
        match entry {
            Value::ParameterMap(map) => {
                map.insert(param.to_string(), value);
            }
            other => {
                let mut map = std::collections::BTreeMap::new();
                map.insert(param.to_string(), value);
                *other = Value::ParameterMap(map);
            }
        }
        Ok(())
    }

    /// Overlay a JSON object on the draft
    pub fn merge_json(&mut self, raw: &str) -> Result<()> {
        let parsed: Json = serde_json::from_str(raw)?;
        let obj: Map<String, Json> = match parsed {
            Json::Object(obj) => obj,
            other => {
                return Err(ConsoleError::InvalidInput(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };
        if let Some(flag) = schema::active_flag(&obj) {
            self.is_active = flag;
        }
        self.attributes
            .extend(schema::attributes_from_json(self.kind, &obj));
        Ok(())
    }

    /// Changes relative to `original`, for an update
    pub fn changes_from(&self, original: &ConfigRecord) -> RecordPatch {
        let mut patch = RecordPatch::new();
        for (name, value) in &self.attributes {
            if original.attributes.get(name) != Some(value) {
                patch = patch.set(name.clone(), value.clone());
            }
        }
        if self.is_active != original.is_active {
            patch = patch.active(self.is_active);
        }
        patch
    }

    pub fn into_parts(self) -> (Attributes, bool) {
        (self.attributes, self.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeRange;

    #[test]
    fn blank_draft_starts_from_defaults() {
        let draft = RecordDraft::new(ConfigEntityKind::Instrument);
        assert!(draft.is_active());
        assert_eq!(
            draft.attributes().get("tradingHours"),
            Some(&Value::TimeRange(TimeRange::new("09:30", "16:00")))
        );
        assert!(draft.attributes().get("symbol").is_none());
    }

    #[test]
    fn assignments_are_typed_by_the_schema() {
        let mut draft = RecordDraft::new(ConfigEntityKind::Instrument);
        draft.assign("symbol=AAPL").expect("text");
        draft.assign("max_position_size=100").expect("snake_case name");
        draft.assign("tradingHours=10:00-15:00").expect("range");
        draft.assign("isActive=false").expect("flag");

        assert_eq!(draft.attributes().get("symbol"), Some(&Value::text("AAPL")));
        assert_eq!(
            draft.attributes().get("maxPositionSize"),
            Some(&Value::Number(100.0))
        );
        assert!(!draft.is_active());

        let err = draft.assign("riskFactor=high").expect_err("not a number");
        assert!(err.to_string().contains("riskFactor"));
        assert!(draft.assign("no-equals-sign").is_err());
    }

    #[test]
    fn parameter_entries_merge_into_the_map() {
        let mut draft = RecordDraft::new(ConfigEntityKind::Strategy);
        draft.assign("name=mom").expect("name");
        draft.assign("type=momentum").expect("type");
        draft.assign("parameters.lookback_period=20").expect("param");
        draft.assign("parameters.threshold=0.02").expect("param");

        let params = draft
            .attributes()
            .get("parameters")
            .and_then(Value::as_params)
            .expect("map");
        assert_eq!(params.get("lookback_period"), Some(&ParamValue::Number(20.0)));
        assert_eq!(params.len(), 2);
        assert!(schema::validate(ConfigEntityKind::Strategy, draft.attributes()).is_ok());

        assert!(draft.assign("name.x=1").is_err());
    }

    #[test]
    fn text_parameters_stay_text() {
        let mut draft = RecordDraft::new(ConfigEntityKind::Strategy);
        draft.assign("type=ai_driven").expect("type");
        draft.assign("parameters.ai_model=42").expect("param");
        let params = draft
            .attributes()
            .get("parameters")
            .and_then(Value::as_params)
            .expect("map");
        assert_eq!(params.get("ai_model"), Some(&ParamValue::Text("42".into())));
    }

    #[test]
    fn unknown_names_are_left_for_validation() {
        let mut draft = RecordDraft::new(ConfigEntityKind::Broker);
        draft.assign("colour=blue").expect("kept");
        let err = schema::validate(ConfigEntityKind::Broker, draft.attributes())
            .expect_err("unknown field");
        assert!(err.has("colour", crate::error::FieldErrorCode::UnknownField));
    }

    #[test]
    fn json_input_and_patch_diff() {
        let original = ConfigRecord::new(ConfigEntityKind::Broker, "ibkr", true)
            .with_attribute("name", Value::text("ibkr"))
            .with_attribute("maxOrderSize", Value::Number(10.0));

        let mut draft = RecordDraft::from_record(&original);
        draft
            .merge_json(r#"{"maxOrderSize": 25, "isActive": false}"#)
            .expect("json");
        let patch = draft.changes_from(&original);
        assert_eq!(patch.attributes.len(), 1);
        assert_eq!(patch.attributes.get("maxOrderSize"), Some(&Value::Number(25.0)));
        assert_eq!(patch.is_active, Some(false));

        assert!(draft.merge_json("[1, 2]").is_err());
        assert!(draft.merge_json("{not json").is_err());
    }
}

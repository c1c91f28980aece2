//! Field tables for every entity kind.

use crate::domain::{Attributes, ConfigEntityKind, TimeRange, Value, ValueType};
use crate::error::FieldError;

use super::rules::{parse_clock_time, Rule};
use super::{AttributeSchema, Discriminator, FieldSpec, ParamSpec, Variant};

const DATA_TYPES: &[&str] = &["market", "fundamental", "news"];
const ORDER_TYPES: &[&str] = &["MARKET", "LIMIT", "STOP", "STOP_LIMIT"];
const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

pub(super) fn build(kind: ConfigEntityKind) -> AttributeSchema {
    match kind {
        ConfigEntityKind::Instrument => instrument(),
        ConfigEntityKind::DataProvider => data_provider(),
        ConfigEntityKind::Broker => broker(),
        ConfigEntityKind::AiModel => ai_model(),
        ConfigEntityKind::Strategy => strategy(),
        ConfigEntityKind::RiskPolicy => risk_policy(),
        ConfigEntityKind::SystemSettings => system_settings(),
        ConfigEntityKind::DecisionEngineParams => decision_engine(),
    }
}

fn name_field() -> FieldSpec {
    FieldSpec::required("name", ValueType::Text).rules([Rule::NonEmpty, Rule::MaxLen(50)])
}

fn secret_field(name: &'static str) -> FieldSpec {
    FieldSpec::required(name, ValueType::Text).rules([Rule::NonEmpty])
}

fn instrument() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::Instrument,
        vec![
            FieldSpec::required("symbol", ValueType::Text)
                .rules([Rule::NonEmpty, Rule::MaxLen(10)]),
            FieldSpec::required("maxPositionSize", ValueType::Number)
                .rules([Rule::Positive, Rule::Integer]),
            FieldSpec::required("riskFactor", ValueType::Number).rules([Rule::OpenUnit]),
            FieldSpec::optional(
                "tradingHours",
                Value::TimeRange(TimeRange::new("09:30", "16:00")),
            )
            .rules([Rule::ClockTime]),
            FieldSpec::optional("minimumVolume", Value::Number(0.0))
                .rules([Rule::NonNegative, Rule::Integer]),
        ],
    )
    .cross_check(trading_hours_ordered)
}

fn data_provider() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::DataProvider,
        vec![
            name_field(),
            secret_field("apiKey"),
            FieldSpec::optional("baseUrl", Value::text("")),
            FieldSpec::optional("dataType", Value::text("market")).rules([Rule::OneOf(DATA_TYPES)]),
            FieldSpec::optional("updateInterval", Value::Number(60.0))
                .rules([Rule::Positive, Rule::Integer]),
            FieldSpec::optional("maxRequestsPerMinute", Value::Number(60.0))
                .rules([Rule::Positive, Rule::Integer]),
        ],
    )
}

fn broker() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::Broker,
        vec![
            name_field(),
            secret_field("apiKey"),
            secret_field("apiSecret"),
            FieldSpec::optional("baseUrl", Value::text("")),
            FieldSpec::optional("orderTypes", Value::StringList(Vec::new()))
                .rules([Rule::EachOneOf(ORDER_TYPES)]),
            FieldSpec::required("maxOrderSize", ValueType::Number).rules([Rule::Positive]),
            FieldSpec::optional("commissionRate", Value::Number(0.0)).rules([Rule::HalfOpenUnit]),
        ],
    )
}

fn ai_model() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::AiModel,
        vec![
            name_field(),
            FieldSpec::required("provider", ValueType::Text).rules([Rule::NonEmpty]),
            secret_field("apiKey"),
            FieldSpec::required("modelType", ValueType::Text).rules([Rule::NonEmpty]),
            FieldSpec::optional("parameters", Value::ParameterMap(Default::default())),
        ],
    )
    .discriminated_by(Discriminator {
        field: "modelType",
        params_field: "parameters",
        variants: vec![
            Variant::new("sentiment", vec![ParamSpec::number("threshold")]),
            Variant::new("prediction", vec![ParamSpec::number("horizon")]),
            Variant::new("classification", vec![ParamSpec::text("classes")]),
        ],
    })
}

fn strategy() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::Strategy,
        vec![
            name_field(),
            FieldSpec::required("type", ValueType::Text).rules([Rule::NonEmpty]),
            FieldSpec::optional("parameters", Value::ParameterMap(Default::default())),
        ],
    )
    .discriminated_by(Discriminator {
        field: "type",
        params_field: "parameters",
        variants: vec![
            Variant::new(
                "momentum",
                vec![
                    ParamSpec::number("lookback_period"),
                    ParamSpec::number("threshold"),
                ],
            ),
            Variant::new(
                "mean_reversion",
                vec![ParamSpec::number("ma_period"), ParamSpec::number("std_dev")],
            ),
            Variant::new(
                "breakout",
                vec![
                    ParamSpec::number("breakout_period"),
                    ParamSpec::number("channel_width"),
                ],
            ),
            Variant::new("ai_driven", vec![ParamSpec::text("ai_model")]),
        ],
    })
}

fn risk_policy() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::RiskPolicy,
        vec![
            FieldSpec::required("maxLeverage", ValueType::Number).rules([Rule::AtLeast(1.0)]),
            FieldSpec::required("riskPerTrade", ValueType::Number).rules([Rule::OpenUnit]),
            FieldSpec::optional("maxDrawdown", Value::Number(0.2)).rules([Rule::OpenUnit]),
            FieldSpec::optional("maxPositionSize", Value::Number(0.1)).rules([Rule::OpenUnit]),
            FieldSpec::optional("stopLossPercentage", Value::Number(0.05)).rules([Rule::OpenUnit]),
            FieldSpec::optional("takeProfitPercentage", Value::Number(0.1))
                .rules([Rule::Positive]),
        ],
    )
}

fn system_settings() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::SystemSettings,
        vec![
            FieldSpec::optional("tradingInterval", Value::Number(60.0))
                .rules([Rule::Positive, Rule::Integer]),
            FieldSpec::optional("backtestingStartDate", Value::text("")).rules([Rule::IsoDate]),
            FieldSpec::optional("backtestingEndDate", Value::text("")).rules([Rule::IsoDate]),
            FieldSpec::optional("paperTrading", Value::Boolean(false)),
            FieldSpec::optional("logLevel", Value::text("INFO")).rules([Rule::OneOf(LOG_LEVELS)]),
            FieldSpec::optional("maxConcurrentTrades", Value::Number(0.0))
                .rules([Rule::NonNegative, Rule::Integer]),
            FieldSpec::optional("dataUpdateFrequency", Value::Number(60.0))
                .rules([Rule::Positive, Rule::Integer]),
        ],
    )
    .cross_check(backtest_window_ordered)
}

fn decision_engine() -> AttributeSchema {
    AttributeSchema::new(
        ConfigEntityKind::DecisionEngineParams,
        vec![
            FieldSpec::optional("rsi_oversold", Value::Number(30.0)).rules([Rule::NonNegative]),
            FieldSpec::optional("rsi_overbought", Value::Number(70.0)).rules([Rule::NonNegative]),
            FieldSpec::optional("confidence_increase", Value::Number(0.1))
                .rules([Rule::NonNegative]),
            FieldSpec::optional("confidence_decrease", Value::Number(0.1))
                .rules([Rule::NonNegative]),
            FieldSpec::optional("ai_disagreement_confidence_factor", Value::Number(0.5))
                .rules([Rule::NonNegative]),
            FieldSpec::optional("bullish_keywords", Value::StringList(Vec::new())),
            FieldSpec::optional("bearish_keywords", Value::StringList(Vec::new())),
            FieldSpec::optional("risk_per_trade", Value::Number(0.02)).rules([Rule::OpenUnit]),
        ],
    )
    .cross_check(rsi_band_ordered)
}

fn trading_hours_ordered(attrs: &Attributes) -> Vec<FieldError> {
    let Some(Value::TimeRange(range)) = attrs.get("tradingHours") else {
        return Vec::new();
    };
    match (parse_clock_time(&range.start), parse_clock_time(&range.end)) {
        // unparseable ends are already reported by the ClockTime rule
        (Some(start), Some(end)) if start >= end => {
            vec![FieldError::constraint(
                "tradingHours",
                format!(
                    "tradingHours start {} must be before end {}",
                    range.start, range.end
                ),
            )]
        }
        _ => Vec::new(),
    }
}

fn backtest_window_ordered(attrs: &Attributes) -> Vec<FieldError> {
    let start = attrs.get("backtestingStartDate").and_then(Value::as_text);
    let end = attrs.get("backtestingEndDate").and_then(Value::as_text);
    match (start, end) {
        (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() && start > end => {
            vec![FieldError::constraint(
                "backtestingEndDate",
                format!("backtesting window ends ({}) before it starts ({})", end, start),
            )]
        }
        _ => Vec::new(),
    }
}

fn rsi_band_ordered(attrs: &Attributes) -> Vec<FieldError> {
    let low = attrs.get("rsi_oversold").and_then(Value::as_number);
    let high = attrs.get("rsi_overbought").and_then(Value::as_number);
    match (low, high) {
        (Some(low), Some(high)) if low >= high => vec![FieldError::constraint(
            "rsi_overbought",
            format!("rsi_overbought ({}) must exceed rsi_oversold ({})", high, low),
        )],
        _ => Vec::new(),
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConsoleError;

/// Every configuration entity the console administers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigEntityKind {
    Instrument,
    DataProvider,
    Broker,
    AiModel,
    Strategy,
    RiskPolicy,
    SystemSettings,
    #[serde(rename = "decision-engine")]
    DecisionEngineParams,
}

impl ConfigEntityKind {
    pub const ALL: [ConfigEntityKind; 8] = [
        Self::Instrument,
        Self::DataProvider,
        Self::Broker,
        Self::AiModel,
        Self::Strategy,
        Self::RiskPolicy,
        Self::SystemSettings,
        Self::DecisionEngineParams,
    ];

    /// Position in [`Self::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instrument => "instrument",
            Self::DataProvider => "data-provider",
            Self::Broker => "broker",
            Self::AiModel => "ai-model",
            Self::Strategy => "strategy",
            Self::RiskPolicy => "risk-policy",
            Self::SystemSettings => "system-settings",
            Self::DecisionEngineParams => "decision-engine",
        }
    }

    /// Collection path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Instrument => "/stocks",
            Self::DataProvider => "/data-providers",
            Self::Broker => "/brokers",
            Self::AiModel => "/ai-models",
            Self::Strategy => "/trading-strategies",
            Self::RiskPolicy => "/risk-management",
            Self::SystemSettings => "/system-settings",
            Self::DecisionEngineParams => "/decision-engine-config",
        }
    }

    /// Attribute holding the natural identifier; `None` for singleton kinds
    pub fn key_field(&self) -> Option<&'static str> {
        match self {
            Self::Instrument => Some("symbol"),
            Self::DataProvider | Self::Broker | Self::AiModel | Self::Strategy => Some("name"),
            Self::RiskPolicy | Self::SystemSettings | Self::DecisionEngineParams => None,
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.key_field().is_none()
    }

    /// Fixed key used for singleton kinds
    pub fn singleton_key(&self) -> Option<&'static str> {
        match self {
            Self::RiskPolicy => Some("risk-management"),
            Self::SystemSettings => Some("system-settings"),
            Self::DecisionEngineParams => Some("decision-engine"),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Instrument => "Stock Configurations",
            Self::DataProvider => "Data Providers",
            Self::Broker => "Brokers",
            Self::AiModel => "AI Models",
            Self::Strategy => "Trading Strategies",
            Self::RiskPolicy => "Risk Management",
            Self::SystemSettings => "System Settings",
            Self::DecisionEngineParams => "Decision Engine",
        }
    }
}

impl std::fmt::Display for ConfigEntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfigEntityKind {
    type Err = ConsoleError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "instrument" | "instruments" | "stock" | "stocks" => Ok(Self::Instrument),
            "data-provider" | "data-providers" | "provider" | "providers" => {
                Ok(Self::DataProvider)
            }
            "broker" | "brokers" => Ok(Self::Broker),
            "ai-model" | "ai-models" | "aimodel" | "model" | "models" => Ok(Self::AiModel),
            "strategy" | "strategies" | "trading-strategy" | "trading-strategies" => {
                Ok(Self::Strategy)
            }
            "risk-policy" | "risk" | "risk-management" => Ok(Self::RiskPolicy),
            "system-settings" | "settings" | "system" => Ok(Self::SystemSettings),
            "decision-engine" | "decision-engine-config" | "decision-engine-params" => {
                Ok(Self::DecisionEngineParams)
            }
            _ => Err(ConsoleError::UnknownKind(raw.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_cli_names_and_aliases() {
        for kind in ConfigEntityKind::ALL {
            assert_eq!(kind.as_str().parse::<ConfigEntityKind>().ok(), Some(kind));
        }
        assert_eq!(
            "stocks".parse::<ConfigEntityKind>().ok(),
            Some(ConfigEntityKind::Instrument)
        );
        assert_eq!(
            "AI_MODEL".parse::<ConfigEntityKind>().ok(),
            Some(ConfigEntityKind::AiModel)
        );
        assert!(matches!(
            "portfolio".parse::<ConfigEntityKind>(),
            Err(ConsoleError::UnknownKind(name)) if name == "portfolio"
        ));
    }

    #[test]
    fn singleton_kinds_have_fixed_keys() {
        for kind in ConfigEntityKind::ALL {
            assert_eq!(kind.is_singleton(), kind.singleton_key().is_some());
        }
        assert_eq!(ConfigEntityKind::Instrument.key_field(), Some("symbol"));
        assert_eq!(ConfigEntityKind::RiskPolicy.path(), "/risk-management");
    }

    #[test]
    fn index_matches_position_in_all() {
        for (position, kind) in ConfigEntityKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }
}

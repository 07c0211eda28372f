use serde::{Deserialize, Serialize};

/// Policy knobs for the ledger engine. By default any existing user may look up any
/// operation, and self-transfers are refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hide operations the requesting user neither owns nor receives.
    /// Off by default: any existing operation id resolves for any existing user.
    pub enforce_ownership: bool,

    /// Admit transfers whose sender and receiver are the same account.
    pub allow_self_transfer: bool,
}

impl EngineConfig {
    pub fn with_enforce_ownership(mut self, enforce: bool) -> Self {
        self.enforce_ownership = enforce;
        self
    }

    pub fn with_allow_self_transfer(mut self, allow: bool) -> Self {
        self.allow_self_transfer = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.enforce_ownership);
        assert!(!config.allow_self_transfer);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"enforce_ownership":true}"#).unwrap();
        assert_eq!(config, EngineConfig::default().with_enforce_ownership(true));
    }
}

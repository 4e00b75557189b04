use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{TaskClassification, classify};
use super::models::ModelTable;
use super::tier::ModelTier;
use crate::types::{Message, ToolInvocation};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingMode {
    #[default]
    Auto,
    Manual,
    #[serde(alias = "cost_optimized", alias = "cost-optimized")]
    CostOptimized,
    #[serde(alias = "speed_optimized", alias = "speed-optimized")]
    SpeedOptimized,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::CostOptimized => "costOptimized",
            Self::SpeedOptimized => "speedOptimized",
        }
    }

    fn forces_fast(&self) -> bool {
        matches!(self, Self::CostOptimized | Self::SpeedOptimized)
    }
}

impl std::fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "costoptimized" | "cost" => Ok(Self::CostOptimized),
            "speedoptimized" | "speed" => Ok(Self::SpeedOptimized),
            _ => Err(format!("Unknown routing mode: {}", s)),
        }
    }
}

/// Caller preferences layered over classification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    pub mode: RoutingMode,
    pub manual_model: Option<String>,
    pub preferred_tier: Option<ModelTier>,
}

impl RoutingConfig {
    pub fn manual(model_id: impl Into<String>) -> Self {
        Self {
            mode: RoutingMode::Manual,
            manual_model: Some(model_id.into()),
            preferred_tier: None,
        }
    }

    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_preferred_tier(mut self, tier: ModelTier) -> Self {
        self.preferred_tier = Some(tier);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ModelRouter {
    table: ModelTable,
    config: RoutingConfig,
}

impl ModelRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self::with_table(ModelTable::default(), config)
    }

    pub fn with_table(table: ModelTable, config: RoutingConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &ModelTable {
        &self.table
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn classify(
        &self,
        user_message: &str,
        transcript: &[Message],
        pending_tools: &[ToolInvocation],
    ) -> TaskClassification {
        classify(user_message, transcript, pending_tools)
    }

    /// Resolve a classification to a model id under this router's config.
    pub fn select_model(&self, classification: &TaskClassification) -> String {
        Self::resolve(&self.table, classification, &self.config)
    }

    /// Resolution order: a manual model (whatever the mode), then the fast tier
    /// for cost/speed modes, then the preferred tier, then the classified tier.
    pub fn resolve(
        table: &ModelTable,
        classification: &TaskClassification,
        config: &RoutingConfig,
    ) -> String {
        if let Some(model) = &config.manual_model {
            return model.clone();
        }

        let tier = if config.mode.forces_fast() {
            ModelTier::Fast
        } else {
            config.preferred_tier.unwrap_or(classification.tier)
        };

        table
            .model_id_for(tier)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Classify and resolve in one step.
    pub fn route(
        &self,
        user_message: &str,
        transcript: &[Message],
        pending_tools: &[ToolInvocation],
    ) -> (TaskClassification, String) {
        let classification = self.classify(user_message, transcript, pending_tools);
        let model_id = self.select_model(&classification);
        debug!(
            tier = %classification.tier,
            confidence = classification.confidence,
            reason = %classification.reason,
            model = %model_id,
            mode = %self.config.mode,
            "Routed turn"
        );
        (classification, model_id)
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deep() -> TaskClassification {
        TaskClassification {
            tier: ModelTier::Deep,
            reason: "test".into(),
            confidence: 0.85,
        }
    }

    fn model(tier: ModelTier) -> String {
        ModelTable::builtin().for_tier(tier).unwrap().model_id.clone()
    }

    #[test]
    fn test_classified_tier_by_default() {
        let router = ModelRouter::default();
        assert_eq!(router.select_model(&deep()), model(ModelTier::Deep));
    }

    #[test]
    fn test_manual_model_wins() {
        let router = ModelRouter::new(RoutingConfig::manual("my-model"));
        assert_eq!(router.select_model(&deep()), "my-model");

        // A manual model outranks cost mode too.
        let config = RoutingConfig {
            mode: RoutingMode::CostOptimized,
            manual_model: Some("pinned".into()),
            preferred_tier: None,
        };
        assert_eq!(ModelRouter::new(config).select_model(&deep()), "pinned");
    }

    #[test]
    fn test_manual_mode_without_model_falls_through() {
        let config = RoutingConfig::default().with_mode(RoutingMode::Manual);
        assert_eq!(
            ModelRouter::new(config).select_model(&deep()),
            model(ModelTier::Deep)
        );
    }

    #[test]
    fn test_cost_and_speed_force_fast() {
        for mode in [RoutingMode::CostOptimized, RoutingMode::SpeedOptimized] {
            let config = RoutingConfig::default()
                .with_mode(mode)
                .with_preferred_tier(ModelTier::Deep);
            assert_eq!(
                ModelRouter::new(config).select_model(&deep()),
                model(ModelTier::Fast)
            );
        }
    }

    #[test]
    fn test_preferred_tier_over_classification() {
        let config = RoutingConfig::default().with_preferred_tier(ModelTier::Balanced);
        assert_eq!(
            ModelRouter::new(config).select_model(&deep()),
            model(ModelTier::Balanced)
        );
    }

    #[test]
    fn test_route_read_only_turn() {
        let router = ModelRouter::default();
        let pending = vec![
            ToolInvocation::from_value("read", serde_json::json!({"file_path": "/a"})),
            ToolInvocation::from_value("glob", serde_json::json!({"pattern": "*.rs"})),
        ];
        let (classification, model_id) = router.route("", &[], &pending);
        assert_eq!(classification.tier, ModelTier::Fast);
        assert_eq!(model_id, model(ModelTier::Fast));
    }

    #[test]
    fn test_mode_parse_and_serde() {
        assert_eq!("cost-optimized".parse::<RoutingMode>().unwrap(), RoutingMode::CostOptimized);
        let config: RoutingConfig =
            serde_json::from_str(r#"{"mode":"speedOptimized","preferredTier":"deep"}"#).unwrap();
        assert_eq!(config.mode, RoutingMode::SpeedOptimized);
        assert_eq!(config.preferred_tier, Some(ModelTier::Deep));
    }
}

use std::sync::LazyLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::tier::ModelTier;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub tier: ModelTier,
    pub model_id: String,
    pub max_tokens: u32,
    pub supports_tools: bool,
    pub supports_vision: bool,
    pub cost_per_1k_prompt: Decimal,
    pub cost_per_1k_completion: Decimal,
}

impl ModelConfig {
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> Decimal {
        let thousand = dec!(1000);
        Decimal::from(prompt_tokens) / thousand * self.cost_per_1k_prompt
            + Decimal::from(completion_tokens) / thousand * self.cost_per_1k_completion
    }
}

static BUILTIN: LazyLock<ModelTable> = LazyLock::new(|| {
    ModelTable::new(vec![
        ModelConfig {
            tier: ModelTier::Fast,
            model_id: "claude-haiku-4-5-20251001".into(),
            max_tokens: 64_000,
            supports_tools: true,
            supports_vision: true,
            cost_per_1k_prompt: dec!(0.0008),
            cost_per_1k_completion: dec!(0.004),
        },
        ModelConfig {
            tier: ModelTier::Balanced,
            model_id: "claude-sonnet-4-5-20250929".into(),
            max_tokens: 64_000,
            supports_tools: true,
            supports_vision: true,
            cost_per_1k_prompt: dec!(0.003),
            cost_per_1k_completion: dec!(0.015),
        },
        ModelConfig {
            tier: ModelTier::Deep,
            model_id: "claude-opus-4-6".into(),
            max_tokens: 32_000,
            supports_tools: true,
            supports_vision: true,
            cost_per_1k_prompt: dec!(0.015),
            cost_per_1k_completion: dec!(0.075),
        },
    ])
});

/// Tier to model lookup table, also indexable by model id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTable {
    models: Vec<ModelConfig>,
}

impl ModelTable {
    /// A table with one model per tier. Later entries for a tier win.
    pub fn new(models: Vec<ModelConfig>) -> Self {
        let mut table: Vec<ModelConfig> = Vec::with_capacity(models.len());
        for model in models {
            table.retain(|m| m.tier != model.tier);
            table.push(model);
        }
        table.sort_by_key(|m| m.tier);
        Self { models: table }
    }

    /// The process-wide default table.
    pub fn builtin() -> &'static ModelTable {
        &BUILTIN
    }

    pub fn for_tier(&self, tier: ModelTier) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.tier == tier)
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.model_id == model_id)
    }

    /// Model id for `tier`, stepping down to cheaper tiers when absent.
    pub fn model_id_for(&self, tier: ModelTier) -> Option<&str> {
        let mut current = Some(tier);
        while let Some(t) = current {
            if let Some(model) = self.for_tier(t) {
                return Some(&model.model_id);
            }
            current = t.cheaper();
        }
        self.models.first().map(|m| m.model_id.as_str())
    }

    /// The model one tier below `model_id`, if any.
    pub fn get_cheaper_alternative(&self, model_id: &str) -> Option<&ModelConfig> {
        let tier = self.get(model_id)?.tier;
        let mut current = tier.cheaper();
        while let Some(t) = current {
            if let Some(model) = self.for_tier(t) {
                return Some(model);
            }
            current = t.cheaper();
        }
        None
    }

    pub fn estimate_cost(
        &self,
        model_id: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Option<Decimal> {
        self.get(model_id)
            .map(|m| m.cost(prompt_tokens, completion_tokens))
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

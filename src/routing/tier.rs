use serde::{Deserialize, Serialize};

/// Cost/capability class of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Balanced,
    Deep,
}

impl ModelTier {
    pub const ALL: [ModelTier; 3] = [ModelTier::Fast, ModelTier::Balanced, ModelTier::Deep];

    /// The next tier down: `deep -> balanced -> fast -> none`.
    pub fn cheaper(&self) -> Option<ModelTier> {
        match self {
            ModelTier::Deep => Some(ModelTier::Balanced),
            ModelTier::Balanced => Some(ModelTier::Fast),
            ModelTier::Fast => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Balanced => "balanced",
            ModelTier::Deep => "deep",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" | "small" => Ok(ModelTier::Fast),
            "balanced" | "primary" => Ok(ModelTier::Balanced),
            "deep" | "reasoning" => Ok(ModelTier::Deep),
            _ => Err(format!("Unknown model tier: {}", s)),
        }
    }
}

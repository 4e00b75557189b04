//! Model tier routing: classify the next unit of work and resolve a model.

mod classifier;
mod models;
mod router;
mod tier;

pub use classifier::{TaskClassification, classify};
pub use models::{ModelConfig, ModelTable};
pub use router::{ModelRouter, RoutingConfig, RoutingMode};
pub use tier::ModelTier;

//! Tiered query resolution: curated dataset, then retrieval-grounded or
//! plain generation.
pub mod bootstrap;
pub mod orchestrator;
pub mod tiers;

pub use bootstrap::bootstrap;
pub use orchestrator::{Components, Orchestrator};
pub use tiers::{
    system_prompt, DatasetTier, Draft, GenerationTier, Outcome, RetrievalTier, Tier, GENERATION_CONFIDENCE,
    GENERATION_ERROR_MESSAGE, PERSONA, SYSTEM_ERROR_MESSAGE,
};

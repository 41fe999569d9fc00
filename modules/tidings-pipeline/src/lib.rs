pub mod agents;
pub mod capability;
pub mod lock;
pub mod orchestrator;
pub mod render;
pub mod research;
pub mod service;
pub mod state;

pub use capability::{ModelCapability, ModelRouter};
pub use lock::GenerationLocks;
pub use orchestrator::{GateDecision, Orchestrator};
pub use service::{DigestService, DigestStore, DiscussionSelector, InMemoryDigestStore};
pub use state::{PipelineState, StageAction, StageOutput, StagePatch};

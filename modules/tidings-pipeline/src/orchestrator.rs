//! The pipeline state machine.
//!
//! Stages run strictly sequentially. Each stage is wrapped in an isolation
//! boundary: faults (including timeouts) are appended to the run's error
//! list and the run continues with an empty patch. The quality gate after
//! Formatting decides whether to loop back to ContentAnalysis, bounded by
//! the configured iteration cap.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use tidings_common::{Config, FaultKind, Stage, StageFault};

use crate::agents::{
    AnalystAgent, DiscussionWriterAgent, EditorAgent, EnrichmentAgent, FormatterAgent,
    OpinionAgent, ResearchAgent, StageAgent,
};
use crate::capability::ModelRouter;
use crate::research::ResearchSource;
use crate::state::PipelineState;

const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Iterate,
    Complete,
}

/// Pure quality-gate decision: iterate when quality is below threshold or
/// too many stages faulted, as long as the iteration cap allows it.
pub fn quality_gate(
    quality_score: f64,
    error_count: usize,
    iteration_count: u32,
    config: &Config,
) -> GateDecision {
    let below_standard =
        quality_score < config.quality_threshold || error_count > config.max_stage_errors;
    if below_standard && iteration_count < config.max_iterations {
        GateDecision::Iterate
    } else {
        GateDecision::Complete
    }
}

pub struct Orchestrator {
    config: Config,
    router: ModelRouter,
    agents: Vec<Arc<dyn StageAgent>>,
    stage_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        router: ModelRouter,
        research: Option<Arc<dyn ResearchSource>>,
    ) -> Self {
        let community = config.community_name.clone();
        let agents: Vec<Arc<dyn StageAgent>> = vec![
            Arc::new(ResearchAgent::new(research, community.clone())),
            Arc::new(AnalystAgent::new(community.clone())),
            Arc::new(DiscussionWriterAgent::new(community.clone())),
            Arc::new(EnrichmentAgent::new()),
            Arc::new(OpinionAgent::new(community.clone())),
            Arc::new(EditorAgent::new()),
            Arc::new(FormatterAgent::new(community, config.community_url.clone())),
        ];
        Self {
            config,
            router,
            agents,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Fixed transition table. `QualityCheck` and `Done` are handled by the
    /// run loop, not by agents.
    fn next_stage(stage: Stage) -> Stage {
        match stage {
            Stage::Research => Stage::ContentAnalysis,
            Stage::ContentAnalysis => Stage::DiscussionWriting,
            Stage::DiscussionWriting => Stage::ContentEnrichment,
            Stage::ContentEnrichment => Stage::OpinionWriting,
            Stage::OpinionWriting => Stage::Editing,
            Stage::Editing => Stage::Formatting,
            Stage::Formatting => Stage::QualityCheck,
            Stage::QualityCheck | Stage::Done => Stage::Done,
        }
    }

    fn agent_for(&self, stage: Stage) -> Option<&Arc<dyn StageAgent>> {
        self.agents.iter().find(|a| a.stage() == stage)
    }

    /// Run the full pipeline over one state record. All stage faults are
    /// recovered internally; the state carries the outcome.
    pub async fn run(&self, state: &mut PipelineState) {
        let mut stage = Stage::Research;

        loop {
            state.current_stage = stage;

            match stage {
                Stage::Done => break,
                Stage::QualityCheck => {
                    let score = state.quality_metrics.overall_score;
                    let decision = quality_gate(
                        score,
                        state.errors.len(),
                        state.iteration_count,
                        &self.config,
                    );
                    match decision {
                        GateDecision::Iterate => {
                            state.iteration_count += 1;
                            let warning = format!(
                                "quality gate requested iteration {} (score {:.2}, {} errors)",
                                state.iteration_count,
                                score,
                                state.errors.len()
                            );
                            warn!(
                                iteration = state.iteration_count,
                                quality_score = score,
                                "Quality below standard, iterating"
                            );
                            state.warnings.push(warning);
                            stage = Stage::ContentAnalysis;
                        }
                        GateDecision::Complete => {
                            info!(
                                quality_score = score,
                                iterations = state.iteration_count,
                                errors = state.errors.len(),
                                "Pipeline complete"
                            );
                            stage = Stage::Done;
                        }
                    }
                }
                _ => {
                    self.run_stage(stage, state).await;
                    stage = Self::next_stage(stage);
                }
            }
        }

        state.current_stage = Stage::Done;
    }

    async fn run_stage(&self, stage: Stage, state: &mut PipelineState) {
        let Some(agent) = self.agent_for(stage) else {
            state.errors.push(StageFault::internal(stage, "no agent registered"));
            return;
        };

        // Resolution failure is a fallback trigger, not an error.
        let model = self.router.resolve(agent.capability());

        let outcome =
            tokio::time::timeout(self.stage_timeout, agent.process(state, model)).await;

        match outcome {
            Ok(Ok(patch)) => state.apply(patch),
            Ok(Err(fault)) => {
                warn!(stage = %stage, error = %fault, "Stage faulted, continuing");
                state
                    .errors
                    .push(StageFault::new(stage, fault.kind, fault.message));
            }
            Err(_) => {
                warn!(stage = %stage, timeout = ?self.stage_timeout, "Stage timed out");
                state.errors.push(StageFault::new(
                    stage,
                    FaultKind::Timeout,
                    format!("stage exceeded {:?} timeout", self.stage_timeout),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_iterates_on_low_quality_until_cap() {
        let config = Config::default();
        assert_eq!(quality_gate(0.5, 0, 0, &config), GateDecision::Iterate);
        assert_eq!(quality_gate(0.5, 0, 1, &config), GateDecision::Iterate);
        // Cap of 2 is absolute.
        assert_eq!(quality_gate(0.5, 0, 2, &config), GateDecision::Complete);
    }

    #[test]
    fn gate_iterates_on_error_count() {
        let config = Config::default();
        assert_eq!(quality_gate(0.9, 3, 0, &config), GateDecision::Iterate);
        assert_eq!(quality_gate(0.9, 2, 0, &config), GateDecision::Complete);
    }

    #[test]
    fn gate_completes_on_good_quality() {
        let config = Config::default();
        assert_eq!(quality_gate(0.85, 0, 0, &config), GateDecision::Complete);
    }

    #[test]
    fn transition_table_is_total() {
        let mut stage = Stage::Research;
        let mut hops = 0;
        while stage != Stage::Done {
            stage = Orchestrator::next_stage(stage);
            hops += 1;
            assert!(hops < 16, "transition table must terminate");
        }
        assert_eq!(hops, 8);
    }
}

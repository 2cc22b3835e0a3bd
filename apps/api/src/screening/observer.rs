use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intake,
    Similarity,
    Analysis,
    Assembly,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Intake => "intake",
            Phase::Similarity => "similarity",
            Phase::Analysis => "analysis",
            Phase::Assembly => "assembly",
        }
    }
}

/// Emitted once per phase boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseEvent {
    pub batch_id: Uuid,
    pub phase: Phase,
    pub input_count: usize,
    pub output_count: usize,
    pub duration_ms: u64,
}

pub trait PhaseObserver: Send + Sync {
    fn phase_completed(&self, event: &PhaseEvent);
}

/// Writes phase events to the tracing subscriber.
pub struct TracingPhaseObserver;

impl PhaseObserver for TracingPhaseObserver {
    fn phase_completed(&self, event: &PhaseEvent) {
        info!(
            batch_id = %event.batch_id,
            phase = event.phase.as_str(),
            input_count = event.input_count,
            output_count = event.output_count,
            duration_ms = event.duration_ms,
            "screening phase completed"
        );
    }
}

use serde::Serialize;

/// Lifecycle of one narration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Initializing,
    Synthesizing,
    /// `partial` is set when the run was cancelled before every utterance was
    /// synthesized.
    Assembling { partial: bool },
    Completed,
    Cancelled,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Cancelled | PipelineState::Failed
        )
    }

    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Initializing) => true,
            (Initializing, Synthesizing) | (Initializing, Failed) => true,
            (Synthesizing, Assembling { .. }) | (Synthesizing, Failed) => true,
            (Assembling { partial: false }, Completed) => true,
            (Assembling { partial: true }, Cancelled) => true,
            (Assembling { .. }, Failed) => true,
            _ => false,
        }
    }
}

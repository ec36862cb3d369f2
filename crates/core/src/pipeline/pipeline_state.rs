use std::fmt;

use serde::Serialize;

use crate::shared::error::FailureReason;

/// Lifecycle of one personalization request.
///
/// `Received → Located → Styled → Composited → Done`; `Failed` is terminal
/// and reachable from every non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineState {
    Received,
    Located,
    Styled,
    Composited,
    Done,
    Failed(FailureReason),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    /// Whether `self → next` is a legal edge.
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Done | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Received, Located) | (Located, Styled) | (Styled, Composited) | (Composited, Done) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Failed(reason) => write!(f, "Failed({reason:?})"),
            other => write!(f, "{other:?}"),
        }
    }
}

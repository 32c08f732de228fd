use std::collections::VecDeque;
use watchparty_core::IceCandidate;

/// Per-remote buffer for candidates that arrive before a remote description exists.
///
/// Starts out awaiting; [`CandidateQueue::mark_ready`] is the single flush point. Once ready,
/// every later candidate passes straight through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateQueue {
    AwaitingRemoteDescription(VecDeque<IceCandidate>),
    Ready,
}

impl Default for CandidateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateQueue {
    pub fn new() -> Self {
        CandidateQueue::AwaitingRemoteDescription(VecDeque::new())
    }

    /// Queues the candidate, or hands it back if it can be applied right away.
    pub fn accept(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        match self {
            CandidateQueue::AwaitingRemoteDescription(pending) => {
                pending.push_back(candidate);
                None
            }
            CandidateQueue::Ready => Some(candidate),
        }
    }

    /// Transitions to ready and returns everything held, in arrival order.
    pub fn mark_ready(&mut self) -> Vec<IceCandidate> {
        match std::mem::replace(self, CandidateQueue::Ready) {
            CandidateQueue::AwaitingRemoteDescription(pending) => pending.into(),
            CandidateQueue::Ready => Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CandidateQueue::Ready)
    }

    pub fn pending_len(&self) -> usize {
        match self {
            CandidateQueue::AwaitingRemoteDescription(pending) => pending.len(),
            CandidateQueue::Ready => 0,
        }
    }

    /// Drops the ready flag but keeps anything still pending.
    pub fn into_pending(self) -> Vec<IceCandidate> {
        match self {
            CandidateQueue::AwaitingRemoteDescription(pending) => pending.into(),
            CandidateQueue::Ready => Vec::new(),
        }
    }
}

impl From<Vec<IceCandidate>> for CandidateQueue {
    fn from(pending: Vec<IceCandidate>) -> Self {
        CandidateQueue::AwaitingRemoteDescription(pending.into())
    }
}

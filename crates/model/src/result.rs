use crate::ids::BatchIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Pending,
    Reading,
    Writing,
    Uploading,
    Done,
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Done | BatchState::Failed)
    }
}

/// One entry per `BatchPlan` range, owned by the worker that processes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_index: BatchIndex,
    pub rows_read: usize,
    pub local_path: Option<std::path::PathBuf>,
    pub blob_key: Option<String>,
    pub state: BatchState,
    pub error: Option<String>,
    pub retries: usize,
}

impl BatchResult {
    pub fn pending(batch_index: BatchIndex) -> Self {
        Self {
            batch_index,
            rows_read: 0,
            local_path: None,
            blob_key: None,
            state: BatchState::Pending,
            error: None,
            retries: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == BatchState::Done
    }

    pub fn is_failed(&self) -> bool {
        self.state == BatchState::Failed
    }
}

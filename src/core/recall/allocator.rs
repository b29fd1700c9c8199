use crate::core::recall::store::{RecallError, RecallStore};
use std::sync::Arc;
use tracing::debug;

/// Assigns fresh random recall ids by optimistic insert, retrying
/// on collision a bounded number of times
pub struct RecallAllocator {
    store: Arc<dyn RecallStore>,
    max_attempts: u32,
}

impl RecallAllocator {
    pub fn new(store: Arc<dyn RecallStore>, max_attempts: u32) -> Self {
        RecallAllocator {
            store,
            max_attempts,
        }
    }

    /// Stores the value under a newly drawn id and returns that id.
    /// Backend failures abort immediately, only collisions retry.
    pub async fn allocate(&self, value: &str) -> Result<u64, RecallError> {
        for attempt in 1..=self.max_attempts {
            let id = next_candidate();

            match self.store.store(&id.to_string(), value.to_string()).await {
                Ok(()) => return Ok(id),
                Err(RecallError::Conflict(_)) => {
                    debug!(
                        "Recall id {} collided, attempt {}/{}",
                        id, attempt, self.max_attempts
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(RecallError::Exhausted(self.max_attempts))
    }

    pub async fn load(&self, id: u64) -> Result<String, RecallError> {
        self.store.load(&id.to_string()).await
    }
}

/// Non-negative 63 bit id, so it survives signed storage downstream
fn next_candidate() -> u64 {
    rand::random::<u64>() >> 1
}

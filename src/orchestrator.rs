//! Concurrent multi-candidate generation.
//!
//! One user intent fans out into N structurally identical calls to the
//! generation service. The batch is awaited jointly and assembled
//! positionally, so candidate order always matches submission order no
//! matter how call latencies interleave. The contract is all-or-nothing:
//! if any call fails, the whole batch fails and zero candidates surface.
//! The orchestrator never retries; the caller owns that decision.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::candidate::{Candidate, IdGenerator};
use crate::client::{GenerationRequest, GenerationService};
use crate::errors::GenerationError;
use crate::extract::extract_code;

pub struct GenerationOrchestrator {
    service: Arc<dyn GenerationService>,
    ids: IdGenerator,
}

impl GenerationOrchestrator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            ids: IdGenerator::new(),
        }
    }

    /// Produce a batch of independent candidates from one request.
    ///
    /// Each successful response goes through the code extractor and becomes
    /// a fresh `idle` candidate. A single failing call discards the batch
    /// and surfaces as one [`GenerationError::Batch`].
    pub async fn generate_batch(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Candidate>, GenerationError> {
        let fan_out = request.fan_out.max(1);
        debug!(fan_out, "dispatching generation batch");

        let calls = (0..fan_out).map(|_| self.service.generate(request));
        let results = join_all(calls).await;

        let mut outcomes = Vec::with_capacity(fan_out);
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(source) => {
                    warn!(index, error = %source, "generation call failed; discarding batch");
                    return Err(GenerationError::Batch {
                        index,
                        message: source.to_string(),
                    });
                }
            }
        }

        let candidates = outcomes
            .into_iter()
            .map(|outcome| {
                let source = extract_code(&outcome.text);
                Candidate::new(self.ids.next_id(), outcome.text, source)
            })
            .collect();
        Ok(candidates)
    }
}

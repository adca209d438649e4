//! Scoped ownership of heavyweight models.
//!
//! A [`ModelSession`] loads every model when acquired and releases them when
//! dropped, so accelerator memory is returned even when a job fails midway.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::WorkerResult;

/// A model that holds resources between `load` and `release`.
#[async_trait]
pub trait ManagedModel: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> WorkerResult<()>;

    /// Must be safe to call on a model that failed to load.
    fn release(&self);
}

/// Loaded models for the lifetime of one job.
pub struct ModelSession {
    models: Vec<Arc<dyn ManagedModel>>,
}

impl ModelSession {
    /// Load `models` in order. On failure, the models loaded so far are
    /// released before the error is returned.
    pub async fn acquire(models: Vec<Arc<dyn ManagedModel>>) -> WorkerResult<Self> {
        let mut session = Self {
            models: Vec::with_capacity(models.len()),
        };
        for model in models {
            debug!(model = model.name(), "Loading model");
            if let Err(e) = model.load().await {
                warn!(model = model.name(), error = %e, "Model failed to load");
                model.release();
                return Err(e);
            }
            session.models.push(model);
        }
        info!(models = session.models.len(), "Model session acquired");
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Drop for ModelSession {
    fn drop(&mut self) {
        // Reverse load order
        for model in self.models.iter().rev() {
            debug!(model = model.name(), "Releasing model");
            model.release();
        }
    }
}

impl std::fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSession")
            .field(
                "models",
                &self.models.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

//! Lock-free model handle for publish/reload of trained weights.
//!
//! Invocations are embarrassingly parallel and share only the read-only
//! model. Training must never mutate weights in place while invocations are
//! in flight, so retrained models are published as a whole through an
//! `ArcSwap`: readers `load()` an immutable snapshot for the duration of one
//! invocation, writers `publish()` a replacement atomically.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::autoencoder::LstmAutoencoder;

/// Shared, atomically swappable handle to the current model snapshot.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    inner: Arc<ArcSwap<LstmAutoencoder>>,
}

impl ModelHandle {
    pub fn new(model: LstmAutoencoder) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(model)),
        }
    }

    /// Snapshot the current model. The returned `Arc` stays valid even if a
    /// newer model is published while it is in use.
    pub fn load(&self) -> Arc<LstmAutoencoder> {
        self.inner.load_full()
    }

    /// Atomically replace the current model with a freshly trained one.
    pub fn publish(&self, model: LstmAutoencoder) {
        self.inner.store(Arc::new(model));
    }
}

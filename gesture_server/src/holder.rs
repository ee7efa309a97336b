//! Shared slot for the model currently served.
//!
use std::{
    path::Path,
    sync::{Arc, RwLock},
};

use crate::nn::{InferModel, ModelLoader, OnnxLoader};

/// Holds the served model. Empty until the first successful load.
///
/// Readers clone the `Arc` and release the lock right away, so a prediction keeps running on
/// the model it started with when another load swaps the slot.
pub struct ModelHolder {
    loader: Box<dyn ModelLoader>,
    model: RwLock<Option<Arc<dyn InferModel>>>,
}

impl Default for ModelHolder {
    fn default() -> Self {
        Self::new(OnnxLoader)
    }
}

impl ModelHolder {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: RwLock::new(None),
        }
    }

    /// Load the model at `path`, replacing the current one.
    ///
    /// Returns whether the load succeeded. On failure the current model stays in place.
    pub fn load(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.loader.load(path) {
            Ok(model) => {
                // The slot only ever holds a complete model, a poisoned lock is still usable.
                let mut slot = self.model.write().unwrap_or_else(|e| e.into_inner());
                *slot = Some(model);
                log::info!("Model loaded successfully from {}", path.display());
                true
            }
            Err(e) => {
                log::error!("Failed to load model from {}: {:#}", path.display(), e);
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    /// The model currently served, if any.
    pub fn current(&self) -> Option<Arc<dyn InferModel>> {
        self.model
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

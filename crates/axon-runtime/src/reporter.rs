//! Uniform failure signaling
//!
//! Every fallible proxy operation funnels its failure through the
//! reporter, so whether callers see an `Err` or a sentinel value is
//! decided in exactly one place.

use axon_core::AxonError;
use std::sync::{Mutex, RwLock};
use tracing::debug;

/// How fallible operations signal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fallible operations return `Err` (the startup default)
    #[default]
    RaiseOnError,
    /// Fallible operations return the documented invalid sentinel and
    /// record the failure for [`ErrorReporter::last_error`]
    ReturnCodeOnError,
}

pub struct ErrorReporter {
    mode: RwLock<ErrorMode>,
    last: Mutex<Option<AxonError>>,
}

impl ErrorReporter {
    pub fn new(mode: ErrorMode) -> Self {
        Self {
            mode: RwLock::new(mode),
            last: Mutex::new(None),
        }
    }

    /// Takes effect for all subsequent calls; not retroactive
    pub fn set_mode(&self, mode: ErrorMode) {
        *self.mode.write().unwrap() = mode;
    }

    pub fn mode(&self) -> ErrorMode {
        *self.mode.read().unwrap()
    }

    /// Sole decision point for failure signaling. The mode is read here,
    /// at the moment of failure, never cached per call.
    pub fn report<T>(&self, err: AxonError, sentinel: T) -> Result<T, AxonError> {
        *self.last.lock().unwrap() = Some(err.clone());
        match self.mode() {
            ErrorMode::RaiseOnError => Err(err),
            ErrorMode::ReturnCodeOnError => {
                debug!(kind = %err.kind, message = %err.message, "Suppressed error (return-code mode)");
                Ok(sentinel)
            }
        }
    }

    /// Most recent reported failure
    pub fn last_error(&self) -> Option<AxonError> {
        self.last.lock().unwrap().clone()
    }
}

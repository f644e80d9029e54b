// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Cooperative cancellation and complexity budget for long operations

use crate::error::KernelError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag an interactive caller sets to abort in-flight work.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits polled by the overlay loops once per processed cell.
#[derive(Debug, Clone)]
pub struct OpContext {
    cancel: Option<CancelHandle>,
    max_cells: Option<usize>,
    minkowski_warn_pairs: usize,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl OpContext {
    /// No cancellation, no budget: operations under it are total.
    pub fn unlimited() -> Self {
        Self {
            cancel: None,
            max_cells: None,
            minkowski_warn_pairs: usize::MAX,
        }
    }

    pub fn new(cancel: CancelHandle, max_cells: Option<usize>) -> Self {
        Self {
            cancel: Some(cancel),
            max_cells,
            minkowski_warn_pairs: usize::MAX,
        }
    }

    pub fn with_minkowski_warn_pairs(mut self, pairs: usize) -> Self {
        self.minkowski_warn_pairs = pairs;
        self
    }

    pub fn minkowski_warn_pairs(&self) -> usize {
        self.minkowski_warn_pairs
    }

    pub fn is_limited(&self) -> bool {
        self.cancel.is_some() || self.max_cells.is_some()
    }

    /// Fail with `Cancelled` once the flag is raised.
    pub fn poll(&self) -> Result<(), KernelError> {
        match &self.cancel {
            Some(handle) if handle.is_cancelled() => Err(KernelError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Fail with `ComplexityExceeded` when `cells` is over budget; also
    /// polls for cancellation.
    pub fn charge(&self, cells: usize) -> Result<(), KernelError> {
        self.poll()?;
        match self.max_cells {
            Some(limit) if cells > limit => Err(KernelError::ComplexityExceeded {
                limit,
                actual: cells,
            }),
            _ => Ok(()),
        }
    }
}

/// Unwrap the result of an operation run under [`OpContext::unlimited`].
pub(crate) fn total<T>(result: Result<T, KernelError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => unreachable!("unlimited operation aborted: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_observed() {
        let handle = CancelHandle::new();
        let ctx = OpContext::new(handle.clone(), None);
        assert!(ctx.poll().is_ok());
        handle.cancel();
        assert_eq!(ctx.poll(), Err(KernelError::Cancelled));
        handle.reset();
        assert!(ctx.poll().is_ok());
    }

    #[test]
    fn test_budget() {
        let ctx = OpContext::new(CancelHandle::new(), Some(10));
        assert!(ctx.charge(10).is_ok());
        assert_eq!(
            ctx.charge(11),
            Err(KernelError::ComplexityExceeded { limit: 10, actual: 11 })
        );
        assert!(OpContext::unlimited().charge(usize::MAX).is_ok());
    }
}

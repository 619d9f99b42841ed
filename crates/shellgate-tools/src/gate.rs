//! Runtime on/off switch for the terminal feature.
//!
//! The gate is the only process-wide mutable state in the runtime. It is
//! owned by the application state and passed explicitly to every entry
//! point. Execution APIs take an [`ExecCapability`], which can only be
//! obtained from [`FeatureGate::open`].

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Process-wide feature flag.
#[derive(Debug)]
pub struct FeatureGate {
    enabled: AtomicBool,
}

impl FeatureGate {
    /// Create a gate in the given state.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Current state.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flip the gate. Returns the previous state.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Terminal feature toggled");
        }
        previous
    }

    /// Mint a capability for an authorized caller while the gate is open.
    pub fn open(&self, authorized: bool) -> Result<ExecCapability> {
        if !authorized {
            warn!("Unauthorized caller attempted to open the terminal gate");
            return Err(Error::Unavailable("caller is not authorized".to_string()));
        }
        if !self.is_enabled() {
            return Err(Error::Unavailable("terminal feature is disabled".to_string()));
        }
        Ok(ExecCapability { _private: () })
    }
}

impl Default for FeatureGate {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Proof that the gate was open and the caller authorized at the time of
/// the request.
#[derive(Debug)]
pub struct ExecCapability {
    _private: (),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_default_is_disabled() {
        let gate = FeatureGate::default();
        assert!(!gate.is_enabled());
        assert!(matches!(gate.open(true), Err(Error::Unavailable(_))));
    }

    #[test]
    fn test_open_requires_authorization_and_enabled() {
        let gate = FeatureGate::new(true);
        assert!(gate.open(true).is_ok());
        assert!(gate.open(false).is_err());

        assert!(gate.set_enabled(false));
        assert!(gate.open(true).is_err());
        assert!(!gate.set_enabled(true));
        assert!(gate.open(true).is_ok());
    }

    #[test]
    fn test_toggle_is_visible_across_threads() {
        let gate = Arc::new(FeatureGate::new(false));
        let writer = {
            let gate = gate.clone();
            std::thread::spawn(move || gate.set_enabled(true))
        };
        writer.join().unwrap();
        assert!(gate.is_enabled());
    }
}

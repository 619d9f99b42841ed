//! Feature-gate check for terminal-backed routes

use shellgate_core::auth::{AuthContext, Scope};
use shellgate_tools::{ExecCapability, FeatureGate};

use super::auth::require_scope;
use crate::api::response::ApiError;

/// Check `scope`, then ask the gate for a capability. A closed gate maps to
/// 403 `FEATURE_DISABLED`.
pub fn open_gate(
    gate: &FeatureGate,
    auth: &AuthContext,
    scope: Scope,
) -> Result<ExecCapability, ApiError> {
    require_scope(auth, scope)?;
    Ok(gate.open(true)?)
}

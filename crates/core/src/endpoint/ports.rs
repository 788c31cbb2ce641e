//! Port interfaces for the host environment

/// Capability probe for the runtime the client is embedded in.
///
/// Implementations must never fail: when the host cannot be probed they
/// report a production runtime.
pub trait EnvironmentProbe: Send + Sync {
    /// Whether the runtime is a trusted debug environment. Only then is the
    /// operator-supplied API base override honoured.
    fn is_debug_environment(&self) -> bool;

    /// Application identifier sent with the login exchange. Empty when
    /// unknown.
    fn app_id(&self) -> String;
}

//! Error types for the scheduling core
//!
//! Fallible operations return [`RenderResult`]. Backend-level failures that
//! happen asynchronously (on the render thread, outside any caller's stack)
//! are reported through a single [`ErrorCallback`] with a typed
//! [`RenderingFailure`] reason; the core reacts by rejecting in-flight
//! frames and refusing to execute new ones until a reset completes. Its
//! internal cursors stay intact either way.

use std::sync::Arc;

use thiserror::Error;

/// High-level rendering error types.
///
/// Abstracted from any specific graphics API so the scheduling core stays
/// backend-agnostic; backend-specific detail is carried in the message and
/// logged at the point of failure.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Typed reason reported through the error callback when the backend fails
/// outside a caller's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingFailure {
    /// The native device could not be created
    FailedToCreateDevice,
    /// The driver reported an unrecoverable error (device removed/lost)
    DriverError,
    /// The requested configuration is not supported by the device
    UnsupportedConfiguration,
    /// Backend initialization failed
    FailedToInitialize,
}

/// Callback invoked when the backend reports a [`RenderingFailure`].
///
/// Called from whichever thread observed the failure, which in threaded
/// mode is the render thread.
pub type ErrorCallback = Arc<dyn Fn(RenderingFailure) + Send + Sync>;

//! Error taxonomy for the vignette engine.
//!
//! Only faults that a host has to show to the user are represented here. Pool
//! backpressure, stale deferred callbacks and invalid state transitions are
//! recovered silently inside the scene that produced them.

/// Convenience result type used across the crate.
pub type VignetteResult<T> = Result<T, VignetteError>;

/// Top-level error type returned by lifecycle and configuration APIs.
#[derive(thiserror::Error, Debug)]
pub enum VignetteError {
    /// The render surface refused to attach, so a scene could not initialise.
    #[error("render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Navigation asked for a scene id that was never registered.
    #[error("unknown scene '{0}'")]
    UnknownScene(String),

    /// Invalid configuration values.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO failure while reading configuration from disk.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VignetteError {
    /// Build a [`VignetteError::SurfaceUnavailable`] value.
    pub fn surface_unavailable(msg: impl Into<String>) -> Self {
        Self::SurfaceUnavailable(msg.into())
    }

    /// Build a [`VignetteError::UnknownScene`] value.
    pub fn unknown_scene(name: impl Into<String>) -> Self {
        Self::UnknownScene(name.into())
    }

    /// Build a [`VignetteError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the host should fall back to a message instead of a scene.
    pub fn is_init_failure(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable(_))
    }
}

impl From<serde_json::Error> for VignetteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = VignetteError::surface_unavailable("no adapter");
        assert_eq!(err.to_string(), "render surface unavailable: no adapter");
        assert!(err.is_init_failure());

        let err = VignetteError::unknown_scene("lotus2");
        assert_eq!(err.to_string(), "unknown scene 'lotus2'");
        assert!(!err.is_init_failure());
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err: VignetteError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, VignetteError::Config(_)));
    }
}

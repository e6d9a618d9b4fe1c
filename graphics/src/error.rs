//! Graphics error types.

use std::fmt;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    InitializationFailed(String),
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// No adapter exposes a queue family with graphics and presentation
    /// support for the target surface.
    NoCompatibleDevice,
    /// An otherwise compatible adapter lacks a required device extension.
    MissingExtension(String),
    /// Validation layers were required but are not present on the host.
    ValidationUnavailable,
    /// An index references a vertex outside the uploaded vertex buffer.
    InvalidIndex {
        /// The offending index value.
        index: u32,
        /// Number of vertices in the buffer.
        vertex_count: usize,
    },
    /// Shader compilation failed.
    ShaderCompilationFailed(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::NoCompatibleDevice => {
                write!(f, "no device with graphics and presentation support")
            }
            Self::MissingExtension(name) => {
                write!(f, "device is missing required extension {name}")
            }
            Self::ValidationUnavailable => {
                write!(f, "validation layers required but not available")
            }
            Self::InvalidIndex {
                index,
                vertex_count,
            } => {
                write!(
                    f,
                    "index {index} out of range for {vertex_count} vertices"
                )
            }
            Self::ShaderCompilationFailed(msg) => write!(f, "shader compilation failed: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::NoCompatibleDevice;
        assert_eq!(
            err.to_string(),
            "no device with graphics and presentation support"
        );

        let err = GraphicsError::MissingExtension("VK_KHR_swapchain".to_string());
        assert_eq!(
            err.to_string(),
            "device is missing required extension VK_KHR_swapchain"
        );

        let err = GraphicsError::InvalidIndex {
            index: 9,
            vertex_count: 6,
        };
        assert_eq!(err.to_string(), "index 9 out of range for 6 vertices");
    }
}

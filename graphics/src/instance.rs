//! Instance creation parameters.
//!
//! [`InstanceParameters`] carries the runtime configuration for backend
//! creation: which backend to use and whether diagnostic validation layers
//! should be enabled. Validation is a runtime value rather than a build-time
//! flag, so the same binary can run with diagnostics on or off and tests can
//! exercise both paths.

/// Graphics backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// Try the backends in order: Vulkan, wgpu, dummy.
    #[default]
    Auto,
    /// Native Vulkan via ash.
    Vulkan,
    /// Cross-platform backend via wgpu.
    Wgpu,
    /// OpenGL, reached through wgpu's GL backend.
    Gl,
    /// No-op backend for tests and headless environments.
    Dummy,
}

/// How validation layers are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Never enable validation.
    Disabled,
    /// Enable validation when the host provides it; degrade with a warning
    /// otherwise.
    #[default]
    Preferred,
    /// Fail backend creation when validation is not available.
    Required,
}

impl ValidationMode {
    /// Whether validation should be attempted at all.
    pub fn requested(self) -> bool {
        self != Self::Disabled
    }
}

/// Parameters for creating a graphics backend.
///
/// # Example
///
/// ```ignore
/// let params = InstanceParameters::new()
///     .with_backend(BackendType::Vulkan)
///     .with_validation(ValidationMode::Required);
/// let backend = create_backend(&params, Some(&window))?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceParameters {
    /// Backend to create.
    pub backend: BackendType,
    /// Validation layer request.
    pub validation: ValidationMode,
}

impl InstanceParameters {
    /// Create parameters with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend type.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the validation mode.
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = InstanceParameters::new();
        assert_eq!(params.backend, BackendType::Auto);
        assert_eq!(params.validation, ValidationMode::Preferred);
    }

    #[test]
    fn test_builder() {
        let params = InstanceParameters::new()
            .with_backend(BackendType::Dummy)
            .with_validation(ValidationMode::Required);
        assert_eq!(params.backend, BackendType::Dummy);
        assert_eq!(params.validation, ValidationMode::Required);
    }

    #[test]
    fn test_validation_requested() {
        assert!(!ValidationMode::Disabled.requested());
        assert!(ValidationMode::Preferred.requested());
        assert!(ValidationMode::Required.requested());
    }
}

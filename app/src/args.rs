//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use stlview_graphics::{BackendType, InstanceParameters, ValidationMode};

/// Graphics backend selection for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliBackend {
    /// Automatically select the best available backend.
    #[default]
    Auto,
    /// Native Vulkan via ash.
    Vulkan,
    /// Cross-platform backend via wgpu.
    Wgpu,
    /// OpenGL through wgpu's GL backend.
    Gl,
    /// No-op backend for testing without a GPU.
    Dummy,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Auto => BackendType::Auto,
            CliBackend::Vulkan => BackendType::Vulkan,
            CliBackend::Wgpu => BackendType::Wgpu,
            CliBackend::Gl => BackendType::Gl,
            CliBackend::Dummy => BackendType::Dummy,
        }
    }
}

/// Validation layer mode for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CliValidation {
    /// Never enable validation layers.
    Off,
    /// Enable validation when available, warn otherwise.
    #[default]
    Preferred,
    /// Fail startup when validation layers are unavailable.
    Required,
}

impl From<CliValidation> for ValidationMode {
    fn from(cli: CliValidation) -> Self {
        match cli {
            CliValidation::Off => ValidationMode::Disabled,
            CliValidation::Preferred => ValidationMode::Preferred,
            CliValidation::Required => ValidationMode::Required,
        }
    }
}

/// STL viewer arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stlview",
    about = "Minimal 3D viewer for binary STL files",
    version
)]
pub struct ViewerArgs {
    /// Binary STL file to view. A built-in cube is shown when omitted.
    pub model: Option<PathBuf>,

    /// Graphics backend to use.
    #[arg(long, default_value = "auto", value_enum)]
    pub backend: CliBackend,

    /// Validation layer mode.
    #[arg(long, default_value = "preferred", value_enum)]
    pub validation: CliValidation,

    /// Initial window width in pixels.
    #[arg(long, default_value = "800")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "600")]
    pub height: u32,

    /// Exit after rendering N frames (useful for testing).
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl ViewerArgs {
    /// Build the backend creation parameters from the CLI selection.
    pub fn instance_parameters(&self) -> InstanceParameters {
        InstanceParameters::new()
            .with_backend(self.backend.into())
            .with_validation(self.validation.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = ViewerArgs::try_parse_from(["stlview"]).unwrap();
        assert_eq!(args.backend, CliBackend::Auto);
        assert_eq!(args.validation, CliValidation::Preferred);
        assert_eq!(args.width, 800);
        assert_eq!(args.height, 600);
        assert!(args.model.is_none());
        assert!(args.max_frames.is_none());
    }

    #[test]
    fn test_parse_model_and_backend() {
        let args = ViewerArgs::try_parse_from([
            "stlview",
            "model.stl",
            "--backend",
            "gl",
            "--validation",
            "required",
            "--max-frames",
            "10",
        ])
        .unwrap();
        assert_eq!(args.model.as_deref(), Some(std::path::Path::new("model.stl")));
        assert_eq!(args.backend, CliBackend::Gl);
        assert_eq!(args.validation, CliValidation::Required);
        assert_eq!(args.max_frames, Some(10));

        let params = args.instance_parameters();
        assert_eq!(params.backend, BackendType::Gl);
        assert_eq!(params.validation, ValidationMode::Required);
    }
}

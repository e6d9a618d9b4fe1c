//! # stlview Core
//!
//! CPU-side mesh representation, procedural generators and the binary STL
//! decoder used by the stlview viewer.

pub mod mesh;
pub mod stl;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core crate version on startup.
pub fn init() {
    log::info!("stlview Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

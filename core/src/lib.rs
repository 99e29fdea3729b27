//! # MeshForge Core
//!
//! Core crate for MeshForge pipeline utilities: math types and
//! cooperative compute primitives (cancellation, scoped task pool,
//! progress tracking).

pub mod compute;
pub mod math;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

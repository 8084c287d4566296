//! Registry, cross-catalogue link resolution and reversible translation for
//! tabletop rule catalogues.
//!

pub use muster_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use muster_internal::prelude::*;
}

//! Theme engine and template rendering.
//!
//! Templates are compiled into the binary; there is no theme directory.

mod engine;

pub use engine::{SharedThemeEngine, ThemeEngine};

#![forbid(unsafe_code)]

//! Core: keyboard input, focus context, and the logging facade shared by the
//! portal runtime and shell crates.

pub mod event;
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, error, info, trace, warn};

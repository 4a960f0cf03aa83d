#![forbid(unsafe_code)]

//! Core: geometry primitives, DPI scale factors, and logging.

pub mod geometry;
pub mod logging;
pub mod scale;

pub use geometry::{Point, Rect, Sides, Size};
pub use scale::{ScaleFactor, ScaleFactorError};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

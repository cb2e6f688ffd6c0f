//! File authorization and lifecycle.
//!
//! Every operation takes the caller's identity explicitly. Reads degrade to
//! empty results for callers without access; mutations fail with
//! `Unauthenticated`, `Forbidden` or `NotFound` and leave state untouched.

pub mod access;
pub mod favorites;
pub mod lifecycle;
pub mod share;
pub mod sweep;

pub use lifecycle::{FileFilter, NewFile};
pub use share::NewGlobalFile;
pub use sweep::{SweepReport, Sweeper};

//! Data models for evidence processing
//!
//! Every result type is created fresh per call, used once to build a
//! [`ProcessingOutcome`], and then discarded.

mod evidence;
mod extraction;
mod outcome;
mod scan;
mod signed_url;

pub use evidence::*;
pub use extraction::*;
pub use outcome::*;
pub use scan::*;
pub use signed_url::*;

//! QAudit Processing Library
//!
//! Runs uploaded evidence through scan, text extraction and download URL
//! issuance, one file or a paced batch at a time.

pub mod orchestrator;
mod stages;

pub use orchestrator::{EvidenceProcessor, Requester};

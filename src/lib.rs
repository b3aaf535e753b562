//! Diagnostic driver for the fuser IR.

pub mod report;
pub mod samples;

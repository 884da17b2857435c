//! Record sources and the shared decode step.
//!
//! Most callers should use [`RecordSource::check`] once, then call
//! [`RecordSource::records`] for every pass they need:
//!
//! - the precheck fails fast with [`crate::AnalysisError::Path`] before any pipeline starts
//! - every pass opens its own handle and reads lazily, one line at a time
//! - each line is decoded by [`decode_record`] according to a [`RecordFormat`]

pub mod decode;
mod literal;
pub mod source;

pub use decode::{decode_record, RecordFormat};
pub use source::{RawLines, RecordSource, Records};

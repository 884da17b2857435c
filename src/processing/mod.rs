//! Projection and folding of decoded records.
//!
//! The processing layer consumes any iterator of decoded records, so it is independent of
//! where the records come from. Nothing here buffers the stream.
//!
//! Currently implemented:
//!
//! - [`project`]: per-statistic field projectors
//! - [`fold`]: the three aggregators and the streaming fold driver
//!
//! ## Example: fold an in-memory stream
//!
//! ```rust
//! use profile_stream::execution::CancellationToken;
//! use profile_stream::processing::{fold_statistic, FoldOptions};
//! use profile_stream::types::{Aggregate, ProfileRecord, Statistic};
//!
//! let records = vec![
//!     ProfileRecord {
//!         line: 1,
//!         username: Some("ann".to_string()),
//!         sex: Some(Some("F".to_string())),
//!         ..Default::default()
//!     },
//!     ProfileRecord {
//!         line: 2,
//!         username: Some("bob12".to_string()),
//!         sex: Some(Some("M".to_string())),
//!         ..Default::default()
//!     },
//! ];
//!
//! let out = fold_statistic(
//!     Statistic::Usernames,
//!     records.into_iter().map(Ok),
//!     &FoldOptions::default(),
//!     &CancellationToken::new(),
//!     |_| {},
//! )
//! .unwrap();
//!
//! let Aggregate::UsernameLengths(avg) = out.aggregate else { unreachable!() };
//! assert_eq!(avg["F"], 3.0);
//! assert_eq!(avg["M"], 5.0);
//! ```

pub mod fold;
pub mod project;

pub use fold::{
    fold_records, fold_statistic, Aggregator, CategorizedSum, DomainFrequency, FoldOptions,
    FoldOutcome, YearFrequency, DEFAULT_PROGRESS_EVERY,
};
pub use project::{birth_year, email_domain, extract_domain, username_length_and_category};

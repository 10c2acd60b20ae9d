// crates/filters/src/lib.rs
//! Include/exclude filtering of relative paths.
//!
//! A filter string is a sequence of groups, each introduced by `+` (include)
//! or `-` (exclude) and followed by glob patterns:
//!
//! ```
//! use filters::Filter;
//!
//! let f = Filter::new("+ a/*.txt - a/**").unwrap();
//! assert!(f.matches("a/x.txt", false));
//! assert!(!f.matches("a/b/x.txt", false));
//! assert!(f.matches("a", true));
//! ```
//!
//! The first matching pattern decides. Including a nested pattern also
//! includes its ancestor directories so the walk can reach it, and a pattern
//! starting with `./` is joined onto the directory includes before it.
#![deny(unsafe_op_in_unsafe_fn, rust_2018_idioms)]

mod error;
mod filter;
pub mod glob;
mod rule;
mod stats;
pub mod token;

pub use error::ParseError;
pub use filter::{DEFAULT_FILTER, Filter, FilterOptions, LOG_TARGET};
pub use rule::Rule;
pub use stats::FilterStats;
pub use token::{Token, tokenize};

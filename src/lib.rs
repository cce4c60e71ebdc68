//! issuefix library crate
//!
//! Turns a GitHub issue into file changes in a local working copy: assemble
//! the repository and issue context, ask a chat model for proposals, map them
//! onto real paths, reconcile each against disk and write the result.

pub mod config;
pub mod context;
pub mod error;
pub mod fix;
pub mod github;
pub mod llm;
pub mod util;

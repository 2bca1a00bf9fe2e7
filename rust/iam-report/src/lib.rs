//! # IAM Report
//!
//! Flattens the IAM bindings attached to an organization, its folders and its
//! projects into a single CSV report, one row per (member, role) pair.
//!
//! The audit walks the folder hierarchy below the requested root, then joins
//! the full project listing against the set of folders it visited. Calls that
//! fail along the way are reported and leave the run [RunStatus::Degraded]
//! rather than aborting it; only an unresolvable organization is fatal.
//!
//! Only bindings attached directly to a node are reported. Inherited access is
//! not computed.

mod row;
pub use row::*;

mod flatten;
pub use flatten::*;

mod context;
pub use context::*;

mod walk;
pub use walk::*;

mod join;
pub use join::*;

mod audit;
pub use audit::*;

mod sink;
pub use sink::*;

mod cli;
pub use cli::*;

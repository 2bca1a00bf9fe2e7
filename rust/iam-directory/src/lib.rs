//! # IAM Directory
//!
//! Read access to a cloud resource hierarchy (organization → folders →
//! projects) and to the access-control policies attached to its nodes.
//!
//! The [ResourceDirectory] trait is the capability the audit depends on. Two
//! implementations are provided:
//!
//! - [RestDirectory] talks to the Cloud Resource Manager REST API
//! - [MemoryDirectory] holds a hierarchy in memory, with failure injection
//!   for tests
//!
//! Listings are paginated remotely; [projects] and [child_folders] drain them
//! as streams.

mod error;
pub use error::*;

mod resource;
pub use resource::*;

mod policy;
pub use policy::*;

mod directory;
pub use directory::*;

mod rest;
pub use rest::*;

mod memory;
pub use memory::*;

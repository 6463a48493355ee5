//! Type system utilities and aliases.
//!
//! - [`aliases`]: Type aliases for the lock-wrapped state shared between
//!   a stream consumer and the collaborators it feeds.

pub mod aliases;

pub use aliases::*;

//! G-Code line classification and parsing
//!
//! This module provides:
//! - Command word recognition (`G1`, `M109`, ...)
//! - Classification of lines the filters care about
//! - Numeric parameter extraction
//! - Position parsing and serialization

pub mod command;
pub mod parser;

pub use command::*;
pub use parser::*;

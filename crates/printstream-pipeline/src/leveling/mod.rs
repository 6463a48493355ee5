//! Software bed leveling
//!
//! Turns a probed sample set into a height surface and rewrites move lines
//! so the nozzle follows it.

mod functions;

pub use functions::LevelingFunctions;

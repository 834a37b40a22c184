//! Test helpers shared across modules.

pub mod util;

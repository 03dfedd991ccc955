//! Ambient facilities shared by the provctl binaries.

pub mod logging;

//! Pieces shared by provctl command-line frontends.

pub mod errors;

//! Test harness: a scripted stand-in for a local node plus a controller
//! rooted in a temporary directory.

mod fake_node;
mod workspace;

pub use fake_node::{FakeNode, KNOWN_ADDRESSES};
pub use workspace::TestWorkspace;

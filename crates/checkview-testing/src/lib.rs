//! Testing infrastructure for checkview integration tests.
//!
//! - `TestWorld`: host signals + model + recording reporter in one place
//! - `providers`: providers answering immediately, on demand, or failing
//! - `reporter`: a `Reporter` that records every call
//! - `fixtures`: sample changes and runs
//! - `wait`: bounded waits on views and snapshots

pub mod fixtures;
pub mod providers;
pub mod reporter;
pub mod wait;
pub mod world;

pub use world::TestWorld;

// Engine module - pure state reduction over provider responses
// This layer sits between provider data (types) and the async runtime

pub mod attempts;
pub mod state;
pub mod views;

pub use attempts::{AttemptInfo, aggregate};
pub use state::{ChecksState, PluginStates, ProviderState, ProviderStatus};
pub use views::Memo;

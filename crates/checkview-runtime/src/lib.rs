mod actions;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
mod pipeline;
pub mod provider;
pub mod reporter;
pub mod signals;
pub mod store;
pub mod view;

pub use config::{ModelConfig, ProviderConfig};
pub use error::{Error, Result};
pub use events::UiEvent;
pub use model::ChecksModel;
pub use provider::CheckProvider;
pub use reporter::{Execution, Reporter, TracingReporter};
pub use signals::{HostHandle, HostSignals, Visibility, host_channels};
pub use store::ChecksStore;
pub use view::ViewStream;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

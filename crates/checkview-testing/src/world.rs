//! TestWorld pattern for model-level integration tests.

use checkview_runtime::{
    CheckProvider, ChecksModel, HostHandle, ModelConfig, ProviderConfig, host_channels,
};
use std::sync::Arc;

use crate::fixtures::sample_change;
use crate::reporter::RecordingReporter;

/// Host signals, a model wired to them and a recording reporter.
///
/// Must be created inside a tokio runtime.
///
/// # Example
/// ```no_run
/// # async fn demo() {
/// use checkview_testing::TestWorld;
/// use checkview_testing::providers::StubProvider;
///
/// let world = TestWorld::new().with_change(42, 2);
/// world.register("ci", StubProvider::sample());
/// # }
/// ```
pub struct TestWorld {
    host: HostHandle,
    model: ChecksModel,
    reporter: Arc<RecordingReporter>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Polling is disabled unless a test opts in per provider.
    pub fn new() -> Self {
        Self::with_config(ModelConfig {
            default_polling_interval_seconds: 0,
            ..ModelConfig::default()
        })
    }

    pub fn with_config(config: ModelConfig) -> Self {
        let (host, signals) = host_channels();
        let reporter = Arc::new(RecordingReporter::new());
        let model = ChecksModel::new(signals, config, reporter.clone());
        Self {
            host,
            model,
            reporter,
        }
    }

    /// Load sample change `number` with `patchsets` patchsets.
    pub fn with_change(self, number: u64, patchsets: u32) -> Self {
        self.host.load_change(sample_change(number, patchsets));
        self
    }

    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    pub fn model(&self) -> &ChecksModel {
        &self.model
    }

    pub fn reporter(&self) -> &RecordingReporter {
        &self.reporter
    }

    pub fn register(&self, plugin: &str, provider: Arc<dyn CheckProvider>) {
        self.model
            .register(plugin, provider, None)
            .expect("Failed to register provider");
    }

    pub fn register_polling(&self, plugin: &str, provider: Arc<dyn CheckProvider>, seconds: u64) {
        self.model
            .register(plugin, provider, Some(ProviderConfig::with_polling_interval(seconds)))
            .expect("Failed to register provider");
    }
}

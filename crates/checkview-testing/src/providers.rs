//! Check providers for tests.
//!
//! - [`StubProvider`] answers every fetch immediately from a closure
//! - [`ScriptedProvider`] parks every fetch until the test answers it

use anyhow::anyhow;
use checkview_runtime::CheckProvider;
use checkview_types::{ChangeData, FetchResponse, Run};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

use crate::fixtures::sample_runs;
use crate::wait::WAIT_TIMEOUT;

type Responder = dyn Fn(&ChangeData) -> anyhow::Result<FetchResponse> + Send + Sync;

/// Provider answering immediately and recording every request.
pub struct StubProvider {
    calls: Mutex<Vec<ChangeData>>,
    respond: Box<Responder>,
}

impl StubProvider {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&ChangeData) -> anyhow::Result<FetchResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    /// Always answers with `response`.
    pub fn responding(response: FetchResponse) -> Arc<Self> {
        Self::new(move |_| Ok(response.clone()))
    }

    pub fn with_runs(runs: Vec<Run>) -> Arc<Self> {
        Self::responding(FetchResponse::with_runs(runs))
    }

    /// Answers with [`sample_runs`] for whatever was requested.
    pub fn sample() -> Arc<Self> {
        Self::new(|data| {
            Ok(FetchResponse::with_runs(sample_runs(
                data.change_number,
                data.patchset_number,
            )))
        })
    }

    /// Fails outside the classified response on every fetch.
    pub fn failing(message: &str) -> Arc<Self> {
        let message = message.to_string();
        Self::new(move |_| Err(anyhow!("{message}")))
    }

    pub fn panicking(message: &'static str) -> Arc<Self> {
        Self::new(move |_| panic!("{message}"))
    }

    pub fn calls(&self) -> Vec<ChangeData> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CheckProvider for StubProvider {
    fn fetch(&self, data: ChangeData) -> BoxFuture<'static, anyhow::Result<FetchResponse>> {
        self.calls.lock().unwrap().push(data.clone());
        let response = (self.respond)(&data);
        async move { response }.boxed()
    }
}

/// A fetch parked inside [`ScriptedProvider`].
pub struct PendingFetch {
    pub data: ChangeData,
    reply: oneshot::Sender<anyhow::Result<FetchResponse>>,
}

impl PendingFetch {
    /// Resolve the fetch. Returns false if the model already abandoned it.
    pub fn respond(self, response: FetchResponse) -> bool {
        self.reply.send(Ok(response)).is_ok()
    }

    pub fn fail(self, message: &str) -> bool {
        self.reply.send(Err(anyhow!("{message}"))).is_ok()
    }

    /// True once the model dropped this fetch in favour of a newer one.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }
}

/// Provider whose fetches stay pending until the test resolves them.
pub struct ScriptedProvider {
    tx: mpsc::UnboundedSender<PendingFetch>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PendingFetch>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        })
    }

    /// Next fetch issued by the model, in issue order.
    ///
    /// # Panics
    /// If no fetch arrives within [`WAIT_TIMEOUT`].
    pub async fn next_fetch(&self) -> PendingFetch {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(WAIT_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for a fetch")
            .expect("fetch channel closed")
    }

    /// Fetch already issued, without waiting.
    pub async fn try_next_fetch(&self) -> Option<PendingFetch> {
        self.rx.lock().await.try_recv().ok()
    }
}

impl CheckProvider for ScriptedProvider {
    fn fetch(&self, data: ChangeData) -> BoxFuture<'static, anyhow::Result<FetchResponse>> {
        let (reply, answer) = oneshot::channel();
        // Receiver lives in self, so this only fails during teardown
        let _ = self.tx.send(PendingFetch { data, reply });
        async move {
            match answer.await {
                Ok(result) => result,
                // Dropped unanswered: stay pending like a request that never returns
                Err(_) => std::future::pending().await,
            }
        }
        .boxed()
    }
}

use checkview_engine::ChecksState;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::watch;

/// Live projection of the checks state.
///
/// The first [`next`](ViewStream::next) yields the value for the current
/// snapshot; later calls wait until the projected value differs from the
/// last one yielded. Ends with `None` once the model is gone.
pub struct ViewStream<T> {
    rx: watch::Receiver<Arc<ChecksState>>,
    select: Box<dyn FnMut(&ChecksState) -> T + Send>,
    last: Option<T>,
}

impl<T: Clone + PartialEq> ViewStream<T> {
    pub(crate) fn new(
        rx: watch::Receiver<Arc<ChecksState>>,
        select: impl FnMut(&ChecksState) -> T + Send + 'static,
    ) -> Self {
        Self {
            rx,
            select: Box::new(select),
            last: None,
        }
    }

    /// Value for the latest snapshot, without waiting.
    pub fn current(&mut self) -> T {
        let state = self.rx.borrow().clone();
        (self.select)(&state)
    }

    pub async fn next(&mut self) -> Option<T> {
        if self.last.is_none() {
            let state = self.rx.borrow_and_update().clone();
            let value = (self.select)(&state);
            self.last = Some(value.clone());
            return Some(value);
        }

        loop {
            self.rx.changed().await.ok()?;
            let state = self.rx.borrow_and_update().clone();
            let value = (self.select)(&state);
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = T>
    where
        T: Send + 'static,
    {
        stream::unfold(self, |mut view| async move {
            let item = view.next().await?;
            Some((item, view))
        })
    }
}

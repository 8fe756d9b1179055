use checkview_types::ChangeInfo;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Visibility of the host document or window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Receiving side of the host's change/patchset/visibility signals.
///
/// Cloning is cheap; every pipeline holds its own copy so each tracks what
/// it has already seen independently.
#[derive(Clone)]
pub struct HostSignals {
    pub change_number: watch::Receiver<Option<u64>>,
    pub latest_patchset: watch::Receiver<Option<u32>>,
    pub change: watch::Receiver<Option<Arc<ChangeInfo>>>,
    pub router_patchset: watch::Receiver<Option<u32>>,
    pub visibility: watch::Receiver<Visibility>,
    reload: broadcast::Sender<()>,
}

impl HostSignals {
    /// New receiver for the process-wide reload broadcast.
    pub fn reload_events(&self) -> broadcast::Receiver<()> {
        self.reload.subscribe()
    }

    pub fn is_visible(&self) -> bool {
        *self.visibility.borrow() == Visibility::Visible
    }

    pub fn current_change_number(&self) -> Option<u64> {
        *self.change_number.borrow()
    }

    pub fn current_latest_patchset(&self) -> Option<u32> {
        *self.latest_patchset.borrow()
    }

    pub fn current_change(&self) -> Option<Arc<ChangeInfo>> {
        self.change.borrow().clone()
    }
}

/// Sending side, owned by whatever tracks the change being viewed.
///
/// Setters only notify when the value actually changes.
pub struct HostHandle {
    change_number: watch::Sender<Option<u64>>,
    latest_patchset: watch::Sender<Option<u32>>,
    change: watch::Sender<Option<Arc<ChangeInfo>>>,
    router_patchset: watch::Sender<Option<u32>>,
    visibility: watch::Sender<Visibility>,
    reload: broadcast::Sender<()>,
}

/// Create a connected handle/signals pair with everything unset and visible.
pub fn host_channels() -> (HostHandle, HostSignals) {
    let (change_number_tx, change_number_rx) = watch::channel(None);
    let (latest_patchset_tx, latest_patchset_rx) = watch::channel(None);
    let (change_tx, change_rx) = watch::channel(None);
    let (router_patchset_tx, router_patchset_rx) = watch::channel(None);
    let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
    let (reload_tx, _) = broadcast::channel(16);

    let handle = HostHandle {
        change_number: change_number_tx,
        latest_patchset: latest_patchset_tx,
        change: change_tx,
        router_patchset: router_patchset_tx,
        visibility: visibility_tx,
        reload: reload_tx.clone(),
    };
    let signals = HostSignals {
        change_number: change_number_rx,
        latest_patchset: latest_patchset_rx,
        change: change_rx,
        router_patchset: router_patchset_rx,
        visibility: visibility_rx,
        reload: reload_tx,
    };
    (handle, signals)
}

fn set_distinct<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}

impl HostHandle {
    pub fn set_change_number(&self, number: Option<u64>) {
        set_distinct(&self.change_number, number);
    }

    pub fn set_latest_patchset(&self, patchset: Option<u32>) {
        set_distinct(&self.latest_patchset, patchset);
    }

    pub fn set_change(&self, change: Option<ChangeInfo>) {
        set_distinct(&self.change, change.map(Arc::new));
    }

    pub fn set_router_patchset(&self, patchset: Option<u32>) {
        set_distinct(&self.router_patchset, patchset);
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        set_distinct(&self.visibility, visibility);
    }

    /// Publish a change object along with its number and latest patchset.
    pub fn load_change(&self, change: ChangeInfo) {
        let number = change.number;
        let latest = change.latest_patchset();
        self.set_change(Some(change));
        self.set_change_number(Some(number));
        self.set_latest_patchset(latest);
    }

    /// Ask every provider to refetch.
    pub fn broadcast_reload(&self) {
        // No subscribers simply means no model is listening yet
        let _ = self.reload.send(());
    }
}

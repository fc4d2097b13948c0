//! Single-flight plumbing: the first caller does the work, later callers for
//! the same request wait for its answer instead of issuing their own.

use tokio::sync::watch;

/// Held by the caller doing the work.
pub(crate) struct Flight<T> {
    tx: watch::Sender<Option<T>>,
}

/// Held by callers waiting on someone else's flight.
#[derive(Clone)]
pub(crate) struct Ticket<T> {
    rx: watch::Receiver<Option<T>>,
}

pub(crate) fn flight<T>() -> (Flight<T>, Ticket<T>) {
    let (tx, rx) = watch::channel(None);
    (Flight { tx }, Ticket { rx })
}

impl<T> Flight<T> {
    pub(crate) fn land(self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

impl<T: Clone> Ticket<T> {
    /// `None` if the flight was dropped before producing a value.
    pub(crate) async fn wait(mut self) -> Option<T> {
        self.rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| Option::clone(&value))
    }

    /// The leading caller went away without landing.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.rx.has_changed().is_err() && self.rx.borrow().is_none()
    }
}

// Copyright 2024 Zinc Labs Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! The cancellation-bearing call context every handler method receives
//! (spec.md §5). One `CallContext` is created per RPC call; the router
//! cancels it when the adapter observes the client going away, and any
//! producer task the handler spawned is expected to poll or await it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Signals cancellation to every clone of this context. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone
    /// of this context. A producer task typically races this against its
    /// own work in a `tokio::select!`.
    ///
    /// The `Notified` future is created before the flag check so a
    /// `cancel()` landing between the check and the await is still caught —
    /// checking the flag first and only then awaiting `notified()` would
    /// lose that wakeup.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

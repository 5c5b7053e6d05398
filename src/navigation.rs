//! Page-scoped session tokens.
//!
//! Every time the user enters a page, [`Navigation::enter`] issues a token and every earlier
//! token stops being current.  Work that completes after its page was left checks the token and
//! discards its result instead of touching the next page's state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The shared page counter.
#[derive(Clone, Debug, Default)]
pub struct Navigation {
    epoch: Arc<AtomicU64>,
}

impl Navigation {
    /// Enter a page, superseding every token issued before.
    pub fn enter(&self) -> SessionToken {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        SessionToken {
            epoch,
            current: Arc::clone(&self.epoch),
        }
    }

    /// Leave the current page without entering another.
    pub fn leave(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

/// Proof of which page a piece of work belongs to.
#[derive(Clone, Debug)]
pub struct SessionToken {
    epoch: u64,
    current: Arc<AtomicU64>,
}

impl SessionToken {
    /// True while no other page has been entered and this one has not been left.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.epoch
    }

    /// Leave this token's page, if it is still the current one.
    pub fn invalidate(&self) {
        let _ = self.current.compare_exchange(
            self.epoch,
            self.epoch + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

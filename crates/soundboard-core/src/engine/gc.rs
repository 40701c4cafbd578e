//! RT-safe reclamation for voice snapshots
//!
//! Snapshots and voices are wrapped in `basedrop::Shared<T>`. When the last
//! reference is dropped, including on the audio thread after a snapshot was
//! replaced mid-callback, the memory is not freed in place. The pointer is
//! enqueued instead and released the next time the owning registry runs
//! [`Reclaimer::collect`] on the control plane.
//!
//! - Drop on RT thread: enqueues a pointer, no deallocation
//! - Actual deallocation: control-plane thread, under the registry lock
//!
//! Unlike a process-wide collector thread, each registry owns its own
//! `Reclaimer`, so there is no global state and tests stay isolated.

use basedrop::{Collector, Handle, Shared};

/// Owns the `basedrop` collector for one voice registry
pub struct Reclaimer {
    collector: Collector,
    handle: Handle,
}

impl Reclaimer {
    pub fn new() -> Self {
        let collector = Collector::new();
        let handle = collector.handle();
        Self { collector, handle }
    }

    /// Wrap a value so its final drop is deferred to [`Reclaimer::collect`]
    pub fn share<T: Send + 'static>(&self, value: T) -> Shared<T> {
        Shared::new(&self.handle, value)
    }

    /// Free everything whose last reference has been dropped
    ///
    /// Dropping a snapshot can release the voices it held, which enqueues
    /// them in turn, so collection runs until the queue is drained.
    pub fn collect(&mut self) {
        while self.collector.collect_one() {}
    }
}

impl Default for Reclaimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_drop_is_deferred_until_collect() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut reclaimer = Reclaimer::new();

        let shared = reclaimer.share(DropCounter(Arc::clone(&drops)));
        let clone = shared.clone();
        drop(shared);
        drop(clone);

        // Last reference gone, but nothing freed yet
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        reclaimer.collect();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_collect_releases_nested_shared() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut reclaimer = Reclaimer::new();

        let inner = reclaimer.share(DropCounter(Arc::clone(&drops)));
        let outer = reclaimer.share(vec![inner]);
        drop(outer);

        reclaimer.collect();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}

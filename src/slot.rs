use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// An owning handle to a registration on the bus connection.
///
/// Every registration - an exported object, a v-table, a signal subscription,
/// a pending asynchronous call - is tied to the lifetime of a Slot. Dropping
/// the Slot performs exactly one deregistration; the handle is neither
/// copyable nor cloneable, so a second deregistration is impossible by
/// construction.
///
/// Registering calls either hand the Slot to the caller (a *returned* slot,
/// the `_with_slot` method variants), or keep it inside the owning `Object`
/// or `Proxy` (a *floating* slot), in which case the registration lives
/// exactly as long as its owner.
#[must_use = "dropping a Slot immediately cancels its registration"]
pub struct Slot {
    id: u64,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Slot {
    /// Creates a slot that runs the given closure when released.
    pub fn new<F: FnOnce() + Send + 'static>(release: F) -> Slot {
        Slot { id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed), release: Some(Box::new(release)) }
    }

    /// Releases the registration now. Equivalent to dropping the slot.
    pub fn release(self) {}

    // Drops the slot without running the release closure. Used when the
    // registration has already been consumed, e g a pending call that
    // completed.
    pub (crate) fn defuse(mut self) { self.release = None; }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(f) = self.release.take() { f() }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Slot({})", self.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn releases_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c2 = count.clone();
        let s = Slot::new(move || { c2.fetch_add(1, Ordering::SeqCst); });
        assert_eq!(count.load(Ordering::SeqCst), 0);
        s.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn defused_slot_does_not_release() {
        let count = Arc::new(AtomicUsize::new(0));
        let c2 = count.clone();
        let s = Slot::new(move || { c2.fetch_add(1, Ordering::SeqCst); });
        s.defuse();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}

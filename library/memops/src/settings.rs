use core::sync::atomic::{AtomicBool, Ordering};

/// Process-wide debug and workaround switches.
///
/// One instance is owned by the driver handle and shared by reference with
/// every component that honors a switch. Switches are read at the point of
/// use rather than captured at construction, so flipping one takes effect
/// on the next operation that consults it.
#[derive(Debug, Default)]
pub struct DebugSettings {
    make_all_buffers_resident: AtomicBool,
}

impl DebugSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every submission must run under the handler-wide lock so the
    /// full residency set can be declared for it.
    #[inline]
    pub fn make_all_buffers_resident(&self) -> bool {
        self.make_all_buffers_resident.load(Ordering::Relaxed)
    }

    pub fn set_make_all_buffers_resident(&self, enabled: bool) {
        self.make_all_buffers_resident.store(enabled, Ordering::Relaxed);
    }
}

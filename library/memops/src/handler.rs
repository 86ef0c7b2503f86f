use core::cell::RefCell;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::FxHashSet;

use crate::residency::{AllocationId, DeviceHandle, OsContext, ResidencyContainer};
use crate::settings::DebugSettings;
use crate::status::MemoryOperationsStatus;

type ResidencySet = FxHashSet<AllocationId>;

/// Tracks which device memory allocations are believed resident, and folds
/// that knowledge into per-submission residency containers.
///
/// A handler is the single source of truth for "is allocation X resident".
/// Residency here is bookkeeping only: making an allocation resident records
/// the belief that it is mapped and usable on the device, and the merged
/// container produced at submission time is what tells the hardware
/// scheduler which allocations must actually be paged in.
///
/// Every operation is synchronous and atomic with respect to the others;
/// no ordering is guaranteed across distinct allocations, and callers that
/// need a specific outcome for concurrent operations on the same allocation
/// must serialize themselves.
pub trait MemoryOperationsHandler: Send + Sync {
    /// Records every allocation in `allocations` as resident. Re-inserting
    /// an already-resident allocation is a no-op, as is an empty slice.
    fn make_resident(
        &self,
        device: DeviceHandle,
        allocations: &[AllocationId],
    ) -> MemoryOperationsStatus;

    /// Removes `allocation` from the residency set within the scope of
    /// `context`. Evicting an allocation that is not resident is a no-op,
    /// not an error.
    fn evict_within_os_context(
        &self,
        context: Option<&OsContext>,
        allocation: AllocationId,
    ) -> MemoryOperationsStatus;

    /// Removes `allocation` from the residency set regardless of context.
    fn evict(&self, device: DeviceHandle, allocation: AllocationId) -> MemoryOperationsStatus;

    /// Pure query: [`Success`] if `allocation` is currently tracked as
    /// resident, [`MemoryNotFound`] otherwise. An allocation that was never
    /// made resident and one that has been evicted are indistinguishable.
    ///
    /// [`Success`]: MemoryOperationsStatus::Success
    /// [`MemoryNotFound`]: MemoryOperationsStatus::MemoryNotFound
    fn is_resident(
        &self,
        device: DeviceHandle,
        allocation: AllocationId,
    ) -> MemoryOperationsStatus;

    /// Appends every resident allocation that `container` does not already
    /// hold to the end of `container`, leaving the existing entries and
    /// their order untouched. The order of the appended entries is
    /// unspecified. Nothing is ever removed from `container`.
    ///
    /// The read of the residency set is synchronized with the mutating
    /// operations, so a merge never observes a half-applied mutation from
    /// another thread.
    fn merge_with_residency_container(
        &self,
        context: Option<&OsContext>,
        container: &mut ResidencyContainer,
    );

    /// Enters the submission-wide critical section demanded by the
    /// force-all-resident workaround, if that switch is enabled. With the
    /// switch off this returns an idle guard and costs nothing.
    ///
    /// The submission path must keep the returned guard alive across the
    /// whole submission. While a thread holds an engaged guard it may still
    /// call every other handler operation; other threads block until the
    /// guard is dropped.
    fn lock_handler_for_exec_wa(&self) -> HandlerLock<'_>;
}

/// Guard for the submission-wide workaround critical section.
///
/// One type covers both outcomes of [`lock_handler_for_exec_wa`]: the guard
/// either holds the handler lock for as long as it lives, or holds nothing.
/// Either way it is released when dropped, on every exit path.
///
/// [`lock_handler_for_exec_wa`]: MemoryOperationsHandler::lock_handler_for_exec_wa
#[must_use = "the workaround critical section ends as soon as this guard is dropped"]
pub struct HandlerLock<'a> {
    guard: Option<ReentrantMutexGuard<'a, RefCell<ResidencySet>>>,
}

impl<'a> HandlerLock<'a> {
    /// An idle guard, for handlers (or configurations) with no workaround
    /// critical section to enter.
    pub fn unlocked() -> Self {
        Self { guard: None }
    }

    fn locked(guard: ReentrantMutexGuard<'a, RefCell<ResidencySet>>) -> Self {
        Self { guard: Some(guard) }
    }

    /// Whether the guard is actually holding the handler lock.
    pub fn is_locked(&self) -> bool {
        self.guard.is_some()
    }
}

/// The default memory operations handler.
///
/// Keeps a single process-wide residency set. The set is guarded by one
/// reentrant lock: each operation takes it for the duration of that one
/// call, and the force-all-resident workaround takes it for a whole
/// submission. The lock being reentrant, a submission thread holding the
/// workaround guard may keep calling the other operations; any other
/// thread blocks until the guard is released.
///
/// Device and context tokens are accepted and ignored; residency is not
/// partitioned per device or per engine here. A handler that does
/// discriminate by context implements [`MemoryOperationsHandler`] itself
/// and gives [`evict_within_os_context`] a meaning distinct from
/// [`evict`].
///
/// [`evict_within_os_context`]: MemoryOperationsHandler::evict_within_os_context
/// [`evict`]: MemoryOperationsHandler::evict
pub struct MemoryOperationsHandlerDefault {
    residency: ReentrantMutex<RefCell<ResidencySet>>,
    settings: Arc<DebugSettings>,
}

impl MemoryOperationsHandlerDefault {
    pub fn new(settings: Arc<DebugSettings>) -> Self {
        Self {
            residency: ReentrantMutex::new(RefCell::new(ResidencySet::default())),
            settings,
        }
    }
}

impl MemoryOperationsHandler for MemoryOperationsHandlerDefault {
    fn make_resident(
        &self,
        _device: DeviceHandle,
        allocations: &[AllocationId],
    ) -> MemoryOperationsStatus {
        let residency = self.residency.lock();
        let mut residency = residency.borrow_mut();
        for allocation in allocations {
            residency.insert(*allocation);
        }
        trace!("made {} allocation(s) resident", allocations.len());
        MemoryOperationsStatus::Success
    }

    fn evict_within_os_context(
        &self,
        _context: Option<&OsContext>,
        allocation: AllocationId,
    ) -> MemoryOperationsStatus {
        let residency = self.residency.lock();
        residency.borrow_mut().remove(&allocation);
        trace!("evicted {}", allocation);
        MemoryOperationsStatus::Success
    }

    fn evict(&self, _device: DeviceHandle, allocation: AllocationId) -> MemoryOperationsStatus {
        self.evict_within_os_context(None, allocation)
    }

    fn is_resident(
        &self,
        _device: DeviceHandle,
        allocation: AllocationId,
    ) -> MemoryOperationsStatus {
        let residency = self.residency.lock();
        if residency.borrow().contains(&allocation) {
            MemoryOperationsStatus::Success
        } else {
            MemoryOperationsStatus::MemoryNotFound
        }
    }

    fn merge_with_residency_container(
        &self,
        _context: Option<&OsContext>,
        container: &mut ResidencyContainer,
    ) {
        let residency = self.residency.lock();
        for allocation in residency.borrow().iter() {
            container.push(*allocation);
        }
    }

    fn lock_handler_for_exec_wa(&self) -> HandlerLock<'_> {
        if self.settings.make_all_buffers_resident() {
            debug!("serializing submission: force-all-resident workaround is enabled");
            HandlerLock::locked(self.residency.lock())
        } else {
            HandlerLock::unlocked()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::status::MemoryOperationsStatus::{MemoryNotFound, Success};

    fn id(raw: u64) -> AllocationId {
        AllocationId::new(raw).unwrap()
    }

    fn handler() -> MemoryOperationsHandlerDefault {
        MemoryOperationsHandlerDefault::new(Arc::new(DebugSettings::new()))
    }

    const DEVICE: DeviceHandle = DeviceHandle::new(0);

    #[test]
    fn make_resident_establishes_membership() {
        let handler = handler();
        assert_eq!(handler.make_resident(DEVICE, &[id(1)]), Success);
        assert_eq!(handler.is_resident(DEVICE, id(1)), Success);
    }

    #[test]
    fn make_resident_of_nothing_is_a_noop() {
        let handler = handler();
        assert_eq!(handler.make_resident(DEVICE, &[]), Success);
        assert_eq!(handler.is_resident(DEVICE, id(1)), MemoryNotFound);
    }

    #[test]
    fn evict_removes_membership_and_is_idempotent() {
        let handler = handler();
        handler.make_resident(DEVICE, &[id(1)]);
        assert_eq!(handler.evict(DEVICE, id(1)), Success);
        assert_eq!(handler.is_resident(DEVICE, id(1)), MemoryNotFound);
        // evicting again is still a successful no-op
        assert_eq!(handler.evict(DEVICE, id(1)), Success);
        assert_eq!(handler.is_resident(DEVICE, id(1)), MemoryNotFound);
    }

    #[test]
    fn make_resident_is_idempotent() {
        let handler = handler();
        handler.make_resident(DEVICE, &[id(1)]);
        handler.make_resident(DEVICE, &[id(1)]);
        handler.evict(DEVICE, id(1));
        assert_eq!(handler.is_resident(DEVICE, id(1)), MemoryNotFound);
    }

    #[test]
    fn evicted_allocations_can_become_resident_again() {
        let handler = handler();
        handler.make_resident(DEVICE, &[id(1)]);
        handler.evict(DEVICE, id(1));
        handler.make_resident(DEVICE, &[id(1)]);
        assert_eq!(handler.is_resident(DEVICE, id(1)), Success);
    }

    #[test]
    fn merge_appends_only_missing_entries() {
        let handler = handler();
        handler.make_resident(DEVICE, &[id(1), id(2), id(3)]);

        let mut container: ResidencyContainer = [id(2), id(9)].into_iter().collect();
        handler.merge_with_residency_container(None, &mut container);

        // the seeded prefix keeps its order
        assert_eq!(&container.as_slice()[..2], &[id(2), id(9)]);
        // appended entries arrive in unspecified order, so compare as a set
        assert_eq!(container.len(), 4);
        for expected in [id(1), id(2), id(3), id(9)] {
            assert!(container.contains(expected));
        }
    }

    #[test]
    fn merge_into_empty_container_yields_the_residency_set() {
        let handler = handler();
        handler.make_resident(DEVICE, &[id(1), id(2)]);
        handler.evict(DEVICE, id(2));

        let mut container = ResidencyContainer::new();
        handler.merge_with_residency_container(None, &mut container);
        assert_eq!(container.as_slice(), &[id(1)]);
    }

    // The literal walkthrough: make 1 and 2 resident, evict 2 in-context,
    // then observe queries and merges.
    #[test]
    fn submission_walkthrough() {
        let handler = handler();
        let ctx = OsContext::new(0);

        assert_eq!(handler.make_resident(DEVICE, &[id(1), id(2)]), Success);
        assert_eq!(handler.evict_within_os_context(Some(&ctx), id(2)), Success);

        assert_eq!(handler.is_resident(DEVICE, id(1)), Success);
        assert_eq!(handler.is_resident(DEVICE, id(2)), MemoryNotFound);
        assert_eq!(handler.is_resident(DEVICE, id(3)), MemoryNotFound);

        let mut container: ResidencyContainer = [id(2)].into_iter().collect();
        handler.merge_with_residency_container(Some(&ctx), &mut container);
        assert_eq!(container.len(), 2);
        assert!(container.contains(id(1)));
        assert!(container.contains(id(2)));

        let mut container = ResidencyContainer::new();
        handler.merge_with_residency_container(Some(&ctx), &mut container);
        assert_eq!(container.as_slice(), &[id(1)]);
    }

    #[test]
    fn workaround_lock_is_idle_when_switch_is_off() {
        let handler = handler();
        let lock = handler.lock_handler_for_exec_wa();
        assert!(!lock.is_locked());
        // nothing is held, so the handler stays usable from this thread
        assert_eq!(handler.make_resident(DEVICE, &[id(1)]), Success);
    }

    #[test]
    fn workaround_lock_engages_when_switch_is_on() {
        let settings = Arc::new(DebugSettings::new());
        settings.set_make_all_buffers_resident(true);
        let handler = MemoryOperationsHandlerDefault::new(settings);

        let lock = handler.lock_handler_for_exec_wa();
        assert!(lock.is_locked());

        // the guard owner may keep operating on the handler while it holds
        // the critical section
        assert_eq!(handler.make_resident(DEVICE, &[id(1)]), Success);
        let mut container = ResidencyContainer::new();
        handler.merge_with_residency_container(None, &mut container);
        assert_eq!(container.as_slice(), &[id(1)]);

        drop(lock);
        assert_eq!(handler.is_resident(DEVICE, id(1)), Success);
    }

    #[test]
    fn workaround_switch_is_read_per_acquisition() {
        let settings = Arc::new(DebugSettings::new());
        let handler = MemoryOperationsHandlerDefault::new(settings.clone());

        assert!(!handler.lock_handler_for_exec_wa().is_locked());
        settings.set_make_all_buffers_resident(true);
        assert!(handler.lock_handler_for_exec_wa().is_locked());
    }
}

use core::fmt;
use core::num::NonZeroU64;
use core::slice;

use smallvec::SmallVec;

/// Uniquely identifies one device memory allocation.
///
/// Ids are issued by the memory manager that owns allocation lifetime; the
/// residency tracker stores ids only and never dereferences them. The owner
/// must evict an id from every handler tracking it before the allocation is
/// destroyed, otherwise the handlers keep reporting a dead allocation as
/// resident.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(NonZeroU64);

impl AllocationId {
    /// Creates an id from its raw value. Zero is reserved and yields `None`.
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl From<NonZeroU64> for AllocationId {
    #[inline]
    fn from(raw: NonZeroU64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "alloc#{}", self.0)
    }
}

/// Identifies a device to scope a memory operation to.
///
/// Opaque to the residency tracker; the default handler keeps one
/// process-wide residency set and does not partition by device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u32);

impl DeviceHandle {
    #[inline]
    pub const fn new(ordinal: u32) -> Self {
        Self(ordinal)
    }

    #[inline]
    pub const fn ordinal(self) -> u32 {
        self.0
    }
}

/// Identifies a submission queue/engine on a device.
///
/// Passed through eviction and merge calls as a scoping token. The default
/// handler treats all contexts alike; handlers that track residency per
/// engine give this meaning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OsContext {
    context_id: u32,
}

impl OsContext {
    #[inline]
    pub const fn new(context_id: u32) -> Self {
        Self { context_id }
    }

    #[inline]
    pub const fn context_id(&self) -> u32 {
        self.context_id
    }
}

/// Ordered list of the allocations declared resident for one command
/// submission.
///
/// Owned by the submitting caller: it is seeded with the allocations the
/// command list references explicitly, extended with the globally resident
/// ones via [`merge_with_residency_container`], then handed to the kernel
/// submission boundary and discarded. An id is never present twice;
/// [`push`] keeps that invariant by refusing duplicates.
///
/// [`merge_with_residency_container`]: crate::handler::MemoryOperationsHandler::merge_with_residency_container
/// [`push`]: ResidencyContainer::push
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResidencyContainer {
    entries: SmallVec<[AllocationId; 8]>,
}

impl ResidencyContainer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` unless it is already present. Returns whether the
    /// container grew. Existing entries keep their relative order.
    pub fn push(&mut self, id: AllocationId) -> bool {
        if self.entries.contains(&id) {
            return false;
        }
        self.entries.push(id);
        true
    }

    #[inline]
    pub fn contains(&self, id: AllocationId) -> bool {
        self.entries.contains(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[AllocationId] {
        &self.entries
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, AllocationId> {
        self.entries.iter()
    }
}

impl FromIterator<AllocationId> for ResidencyContainer {
    fn from_iter<I: IntoIterator<Item = AllocationId>>(iter: I) -> Self {
        let mut container = Self::new();
        for id in iter {
            container.push(id);
        }
        container
    }
}

impl<'a> IntoIterator for &'a ResidencyContainer {
    type Item = &'a AllocationId;
    type IntoIter = slice::Iter<'a, AllocationId>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

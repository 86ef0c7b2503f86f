//! Residency tracking for device memory allocations.
//!
//! A userspace driver has to tell the kernel scheduler, with every command
//! submission, which allocations must be mapped on the device for that
//! submission to run. This crate provides the bookkeeping layer behind that
//! list: a process-wide record of which allocations are currently believed
//! resident, and the merge primitive that folds the record into the
//! per-submission [`ResidencyContainer`].
//!
//! The subsystem never owns allocation lifetime and never touches the
//! hardware; it stores opaque [`AllocationId`]s issued by the memory
//! manager, which must evict an id before destroying its allocation.
//!
//! [`MemoryOperationsHandler`] is the seam: the default handler keeps one
//! process-wide set, while context-aware handlers can partition residency
//! per engine without changing call sites.

pub mod handler;
pub mod residency;
pub mod settings;
pub mod status;

pub use self::handler::{HandlerLock, MemoryOperationsHandler, MemoryOperationsHandlerDefault};
pub use self::residency::{AllocationId, DeviceHandle, OsContext, ResidencyContainer};
pub use self::settings::DebugSettings;
pub use self::status::MemoryOperationsStatus;

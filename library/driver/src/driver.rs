use std::sync::{Arc, OnceLock};

use log::debug;
use thiserror::Error;

use oxidrm_memops::{DebugSettings, MemoryOperationsHandler, MemoryOperationsHandlerDefault};

use crate::env::DriverEnv;

static DRIVER: OnceLock<Arc<DriverHandle>> = OnceLock::new();

/// Errors surfaced by driver lifecycle operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("the driver has not been initialized")]
    Uninitialized,
}

/// Process-wide driver state: the environment snapshot, the debug switches
/// derived from it, and the memory operations handler shared with every
/// submission path.
///
/// A handle is constructed exactly once by [`init`] and lives for the
/// remainder of the process. Call sites receive it by `Arc` and pass it
/// along; nothing in this workspace reaches through a global to find it.
pub struct DriverHandle {
    env: DriverEnv,
    settings: Arc<DebugSettings>,
    memory_operations: Arc<dyn MemoryOperationsHandler>,
}

impl DriverHandle {
    /// Builds a standalone handle from an environment snapshot.
    ///
    /// Most callers want [`init`]; constructing directly is for embedders
    /// and tests that manage the handle's lifecycle themselves.
    pub fn create(env: DriverEnv) -> Arc<Self> {
        let settings = Arc::new(DebugSettings::new());
        settings.set_make_all_buffers_resident(env.make_all_buffers_resident);
        let memory_operations = Arc::new(MemoryOperationsHandlerDefault::new(settings.clone()));
        Arc::new(Self {
            env,
            settings,
            memory_operations,
        })
    }

    pub fn env(&self) -> &DriverEnv {
        &self.env
    }

    pub fn debug_settings(&self) -> &Arc<DebugSettings> {
        &self.settings
    }

    /// The residency tracker consulted on the submission path.
    pub fn memory_operations(&self) -> &Arc<dyn MemoryOperationsHandler> {
        &self.memory_operations
    }
}

/// Initializes the process-wide driver, reading configuration from the
/// environment, and returns the shared handle.
///
/// The initializer runs exactly once no matter how many threads race into
/// this call; late and concurrent callers block until it completes and then
/// observe the same handle.
pub fn init() -> Arc<DriverHandle> {
    DRIVER
        .get_or_init(|| {
            let env = DriverEnv::read();
            debug!("driver init: {:?}", env);
            DriverHandle::create(env)
        })
        .clone()
}

/// Returns the process-wide driver handle, or [`DriverError::Uninitialized`]
/// if [`init`] has not completed yet.
pub fn try_get() -> Result<Arc<DriverHandle>, DriverError> {
    DRIVER.get().cloned().ok_or(DriverError::Uninitialized)
}

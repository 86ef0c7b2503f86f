//! Drives the full bootstrap-then-submit flow a queue implementation runs.

use oxidrm_memops::{
    AllocationId, DeviceHandle, MemoryOperationsHandler, MemoryOperationsStatus,
    ResidencyContainer,
};

fn id(raw: u64) -> AllocationId {
    AllocationId::new(raw).unwrap()
}

#[test]
fn bootstrap_then_submit() {
    let _ = env_logger::builder().is_test(true).try_init();

    let handle = oxidrm_driver::init();
    let memops = handle.memory_operations();
    let device = DeviceHandle::new(0);

    // the memory manager reports a command list's first references
    assert_eq!(
        memops.make_resident(device, &[id(10), id(11)]),
        MemoryOperationsStatus::Success
    );

    // the submission path enters the (possibly idle) workaround section,
    // seeds the container with explicit references, and merges
    let _wa = memops.lock_handler_for_exec_wa();
    let mut container: ResidencyContainer = [id(42)].into_iter().collect();
    memops.merge_with_residency_container(None, &mut container);

    assert!(container.contains(id(10)));
    assert!(container.contains(id(11)));
    assert_eq!(container.as_slice()[0], id(42));
    assert_eq!(container.len(), 3);
}

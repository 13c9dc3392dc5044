pub mod fs_object_store;
pub mod log_notifier;
pub mod memory_object_store;

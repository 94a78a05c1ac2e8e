pub mod entry;
pub mod maintenance;
pub mod status;
pub mod task;

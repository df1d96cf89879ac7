pub mod allocator;
pub mod create;
pub mod merge;

pub mod dead_code;
pub mod entrypoints;
pub mod integrity;
pub mod reachability;
pub mod simplify;
pub mod trace;

#[path = "../common/mod.rs"]
mod common;

mod pool_lifecycle_test;

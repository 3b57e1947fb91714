// Library crate exposing modules for integration tests

pub mod model;
pub mod repository;
pub mod util;

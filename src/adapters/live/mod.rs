//! Live adapters that talk to real endpoints.

pub mod earth_engine;

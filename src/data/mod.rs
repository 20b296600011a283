//! Cache storage and the records kept in it.

pub mod kv;
pub mod memory;
pub mod models;
pub mod redis;
pub mod settings;
pub mod taps;

//! Adapters binding domain ports to concrete infrastructure.

pub mod sqlite;

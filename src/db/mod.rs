//! Local persistence

pub mod sqlite;

// SQLite driver adapter
//
// - config: bb8 connection manager and pool construction
// - params: conversion from middleware values to rusqlite values
// - query: result-set extraction
// - connection: pooled connection wrapper (DML, SELECT, transaction control)

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SharedSqliteConnection, SqliteManager, SqlitePooledConnection};
pub use connection::SqliteConnection;
pub use query::build_result_set;

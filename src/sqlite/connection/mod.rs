mod core;
mod dml;
mod select;
mod tx;

pub(crate) use core::run_blocking;
pub use core::SqliteConnection;

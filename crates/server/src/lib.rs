pub mod connection;
pub mod core;

pub use connection::Connection;
pub use core::{Server, SNAPSHOT_MAX};

//! Durable row access for insights, edges, and the operation log.
//!
//! Everything here takes a plain [`rusqlite::Connection`]; the write
//! pipeline wraps calls in a single transaction, read paths run on the
//! bare connection (WAL keeps readers unblocked).

pub mod edge;
pub mod insight;
pub mod oplog;

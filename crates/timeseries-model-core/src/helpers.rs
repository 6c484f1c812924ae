//! Backend-independent utilities.
//!
//! - [`timestamps`]: normalize heterogeneous timestamp columns to epoch seconds.
//! - [`cells`]: walk any supported column row by row.
//! - [`periodic`]: convert calendar timestamp columns to instants before a
//!   table is handed to the distributed engine.
//! - [`reshape`]: append, drop and project columns of exported tables.
//! - [`validation`]: side-effect-free argument checks shared by every backend.

pub mod cells;
pub mod periodic;
pub mod reshape;
pub mod timestamps;
pub mod validation;

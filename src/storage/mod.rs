//! Artifact Storage
//!
//! File-level primitives shared by the anomaly engine and the alert flag:
//! atomic replace/remove and the CSV table codec used between stages.

pub mod atomic;
pub mod table;

pub use atomic::{remove_if_exists, write_atomic};
pub use table::{Table, TableError};

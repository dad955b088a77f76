//! Alert state machine
//!
//! Two states, `NO_ALERT` and `ALERT`, persisted as the presence of a single
//! flag file. [`AlertDecision::evaluate`] derives the state from a scored
//! record set; [`AlertDecision::apply`] asserts or clears the [`AlertFlag`].

mod decision;
mod flag;

pub use decision::{AlertDecision, FlagUpdate};
pub use flag::{AlertFlag, TIMESTAMP_FORMAT};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("failed to write alert flag {}: {}", .0.display(), .1)]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed to clear alert flag {}: {}", .0.display(), .1)]
    Clear(PathBuf, #[source] std::io::Error),

    #[error("failed to read alert flag {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),
}

//! Fragment linker.
//!
//! Merges per-platform schema [`Fragment`]s into one validated
//! [`LinkedApi`](crossbind_api::LinkedApi). Linking is all-or-nothing:
//! every validation failure across the whole input is collected into
//! [`LinkErrors`] and no partial output is ever produced.
//!
//! [`Fragment`]: crossbind_api::Fragment

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod merge;

pub use error::{LinkErrors, ValidationError};
pub use merge::link;

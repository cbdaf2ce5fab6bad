//! Core types shared across the staffdesk workspace.
//!
//! This crate provides the error `Result` alias and the identifiers of
//! backend-owned entities (staff members and restaurants).

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{RestaurantId, UserId};

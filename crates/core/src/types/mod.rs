//! Core types for Marigold.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod selection;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use role::{Area, Role};
pub use selection::{Membership, SelectionKind};

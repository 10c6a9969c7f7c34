//! Marigold storefront client library.
//!
//! Talks to the storefront REST API and keeps the shopper's cart and
//! wishlist in step across local and remote storage. The `mg` binary in
//! `marigold-cli` is a thin layer over this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod forms;
pub mod selection;
pub mod session;
pub mod state;
pub mod storage;

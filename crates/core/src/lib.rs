//! VibeHive Core - Shared forum types and access policy.
//!
//! This crate provides the types and pure decision logic used by the other
//! VibeHive components:
//! - `web` - Server-rendered forum front end
//! - `cli` - Operator commands against the remote forum API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session storage. Everything here can be exercised from unit
//! tests without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, roles, plans, tags and prices
//! - [`models`] - Entity shapes returned by the remote forum API
//! - [`envelope`] - Normalization of inconsistent list response shapes
//! - [`session`] - Resolution of the current actor from stored session data
//! - [`guard`] - Access decisions for private and admin-only pages
//! - [`quota`] - Daily post limit for members without a premium plan
//! - [`password`] - Registration password policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod envelope;
pub mod guard;
pub mod models;
pub mod password;
pub mod quota;
pub mod session;
pub mod types;

pub use types::*;

//! Newtypes shared across the forum.
//!
//! Ids, addresses, roles, plans and prices coming back from the remote API
//! are wrapped here so handlers never pass raw strings around.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;

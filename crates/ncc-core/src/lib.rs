//! Domain logic for the NCC labor-negotiation console.
//!
//! No HTTP or terminal code lives here. The crate holds the passive records
//! exchanged with the backend, the adapters that flatten inconsistent
//! response shapes into table rows, strict calendar helpers, and the
//! client-side validation rules applied before any request is issued.

pub mod company;
pub mod date;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod record;
pub mod report;
pub mod response;
pub mod validate;

pub use error::{Error, Result, ValidationError};

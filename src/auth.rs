//! Token models, grant identifiers, and unverified JWT inspection.

pub mod grant;
pub mod jwt;
pub mod token;

pub use grant::*;
pub use jwt::*;
pub use token::{record::*, secret::*};

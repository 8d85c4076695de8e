//! Persisted token pair and the redacted secret wrapper it is built from.

pub mod record;
pub mod secret;

//! Route modules for the API server.

pub mod callbacks;
pub mod calls;

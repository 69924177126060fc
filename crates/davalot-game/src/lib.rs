//! Davalot: hidden-role quest game bounded context.
//!
//! Responsible for the lobby, role dealing, quest proposals and votes,
//! quest resolution, and the closing assassination.

pub mod application;
pub mod domain;

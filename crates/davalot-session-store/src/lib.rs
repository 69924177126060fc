//! Davalot session store: adapters persisting one game session per channel.

pub mod memory_session_repository;
pub mod pg_session_repository;

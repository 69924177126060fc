//! Domain layer for the game context.

pub mod aggregates;
pub mod characters;
pub mod commands;
pub mod composition;
pub mod events;
pub mod player;
pub mod quest_rules;
pub mod reveal;

//! Shared test mocks and utilities for the Davalot game engine.

mod clock;
mod notifier;
mod repository;
mod rng;

pub use clock::FixedClock;
pub use notifier::{FailingNotifier, RecordingNotifier};
pub use repository::{
    ConflictingSessionRepository, EmptySessionRepository, FailingSessionRepository,
    RecordingSessionRepository,
};
pub use rng::{MockRng, SequenceRng};

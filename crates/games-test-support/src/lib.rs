//! Shared test fakes and utilities for the games service.

mod cancellation;
mod clock;
mod publisher;
mod repository;

pub use cancellation::AlreadyCancelled;
pub use clock::FixedClock;
pub use publisher::{FailingEventPublisher, RecordingEventPublisher};
pub use repository::{
    EmptyEventRepository, FailingEventRepository, InMemoryEventRepository,
    RecordingEventRepository,
};

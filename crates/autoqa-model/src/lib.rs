//! Canonical session/event data model and JSON codec for AutoQA.
//!
//! Types here are pure data: no I/O beyond the session file load/save
//! helpers on [`RecordedSession`], no browser or LLM dependencies.

pub mod checkpoint;
pub mod element;
pub mod event;
pub mod input;
pub mod repository;
pub mod session;
pub mod timestamp;

pub use checkpoint::{CheckpointData, CheckpointType, MatchMode};
pub use element::{BoundingBox, ElementInfo, ElementLocator, LocatorStrategy};
pub use event::{Coordinates, EventType, RecordedEvent};
pub use input::{AlertAction, InputData, Modifier};
pub use repository::{ObjectRepository, TestObject};
pub use session::{ModelError, RecordedSession, CURRENT_SCHEMA_VERSION};

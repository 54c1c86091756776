//! Playback-side primitives: explicit waits, the locator resolver, the
//! popup sentinel, the frame navigator, the evidence collector, and
//! checkpoint evaluation. The dispatch state machine that composes
//! these lives in `autoqa-player`.

pub mod checkpoint;
pub mod driver;
pub mod error;
pub mod evidence;
pub mod frame_nav;
pub mod locator;
pub mod sentinel;
pub mod waits;

#[cfg(any(test, feature = "test-support"))]
pub mod tests_support;

pub use driver::{ConsoleLogEntry, Driver, ElementHandle, RgbaImage};
pub use error::PlaybackError;
pub use locator::ResolvedElement;
pub use sentinel::SentinelReport;

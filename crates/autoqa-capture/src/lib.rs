//! Recording-side pipeline: OS input capture, field redaction, and the
//! session-lifecycle orchestrator tying capture to DOM enrichment and
//! session persistence.

pub mod classifier;
pub mod input_capture;
pub mod recording_session;
pub mod redactor;

pub use classifier::{classify, ClassifiedEvent};
pub use input_capture::{InputSource, ModifierState, MouseButton, RawInputEvent, ScriptedInputSource};
pub use recording_session::{lock_file_path, FixedUrlSource, RecordingSession, UrlSource};
pub use redactor::{Redactor, REDACTED_PLACEHOLDER};

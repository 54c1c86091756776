pub mod baseline;
pub mod cdp_driver;
pub mod engine;
pub mod keymap;
pub mod policy;
pub mod result;

pub use cdp_driver::CdpDriver;
pub use engine::PlayerEngine;
pub use policy::PlaybackPolicy;
pub use result::PlaybackResult;

pub mod frame;
pub mod source;

pub use frame::{FrameError, ImageQuality};

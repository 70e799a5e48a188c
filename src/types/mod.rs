//! Type definitions

pub mod frequency;
pub mod round_trip;
pub mod schedule;
pub mod stop;
pub mod upart;

pub use frequency::*;
pub use round_trip::*;
pub use schedule::*;
pub use stop::*;
pub use upart::*;

//! Business logic services

pub mod address_book;
pub mod clock;
pub mod lookup;
pub mod merge;
pub mod pipeline;
pub mod postalize;
pub mod round_trips;

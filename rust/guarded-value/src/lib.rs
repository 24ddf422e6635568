#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod error;
mod guarded;
mod sync;

pub use error::WouldBlock;
pub use guarded::GuardedValue;

#[cfg(all(test, feature = "loom"))]
mod loom_tests;

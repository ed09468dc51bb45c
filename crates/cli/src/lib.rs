#![forbid(unsafe_code)]

pub mod cli;
mod error;
pub mod runner;

pub use error::Error;

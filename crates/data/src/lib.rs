//! Rule tables and session settings, loaded from JSON and validated before
//! they reach the core crate.

pub mod load;

pub use load::*;

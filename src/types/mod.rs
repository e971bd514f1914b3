//! Core types for ecoclaim.

pub mod message;
pub mod run;
pub mod stream;

pub use message::*;
pub use run::*;
pub use stream::*;

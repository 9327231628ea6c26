//! `digit-recog` library crate.
//!
//! The binary (`digits`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the recognizer can be embedded in other front-ends (e.g. an HTTP service)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod preprocess;
pub mod recognizer;
pub mod report;

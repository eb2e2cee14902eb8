//! Command-line front end for the basketcast forecasting engine

pub mod cli;
pub mod commands;
pub mod io;
pub mod logging;
pub mod request;

pub use logging::init_logging;

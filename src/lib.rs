//! Acquisition and force reconstruction for a 16-channel piezoelectric
//! sensor front end streaming framed ADC samples over a serial link.
pub mod cli;
pub mod config;
pub mod drivers;
pub mod engine;
pub mod session;
pub mod types;

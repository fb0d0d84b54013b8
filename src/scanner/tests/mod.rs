//! Test modules for the scanner
//!
//! Run-loop tests use an in-memory walker and scripted detection clients.

pub mod helpers;

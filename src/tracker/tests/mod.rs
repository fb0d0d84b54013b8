//! Test modules for the state tracker

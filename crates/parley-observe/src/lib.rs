//! Logging and trace export setup for the Parley server.

pub mod tracing_setup;

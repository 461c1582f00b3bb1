//! Processes started after installation

pub mod companion;

//! quietinstall: unattended batch runner for third-party software installers

pub mod cli;
pub mod config;
pub mod install;

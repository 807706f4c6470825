//! Command implementations

pub mod exec;
pub mod init;

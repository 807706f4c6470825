//! Shared constants for test infrastructure

pub const INIT_PACKAGE: &str = "@acme/init";
pub const PLAIN_PACKAGE: &str = "left-pad";

pub const VERSION_1_0_0: &str = "1.0.0";
pub const VERSION_1_1_0: &str = "1.1.0";
pub const VERSION_1_2_0: &str = "1.2.0";
pub const VERSION_2_0_0: &str = "2.0.0";

/// Entry file every generated test package declares
pub const ENTRY_FILE: &str = "lib/index.js";

//! Environment-variable backed driver configuration.

use std::env;
use std::str::FromStr;

/// Selects the devices the driver exposes. Interpreted by the device
/// enumeration layer; carried here verbatim.
pub const AFFINITY_MASK: &str = "OXIDRM_AFFINITY_MASK";
/// Switches the driver into per-context memory spaces for program debug.
pub const ENABLE_PROGRAM_DEBUGGING: &str = "OXIDRM_ENABLE_PROGRAM_DEBUGGING";
/// Forces the whole residency set to be declared for every submission,
/// serializing submissions against residency mutation.
pub const MAKE_ALL_BUFFERS_RESIDENT: &str = "OXIDRM_MAKE_ALL_BUFFERS_RESIDENT";

/// Reads `name` from the process environment, falling back to `default`
/// when the variable is unset or does not parse.
pub fn get_setting<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean settings accept the integer convention ("0"/"1") as well as
/// "true"/"false".
pub fn get_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => match value.as_str() {
            "0" | "false" => false,
            "1" | "true" => true,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Snapshot of the environment-derived driver settings, read once at driver
/// initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverEnv {
    pub affinity_mask: String,
    pub program_debugging: bool,
    pub make_all_buffers_resident: bool,
}

impl DriverEnv {
    pub fn read() -> Self {
        Self {
            affinity_mask: get_setting(AFFINITY_MASK, String::new()),
            program_debugging: get_flag(ENABLE_PROGRAM_DEBUGGING, false),
            make_all_buffers_resident: get_flag(MAKE_ALL_BUFFERS_RESIDENT, false),
        }
    }
}

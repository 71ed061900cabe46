//! # GPIO actuator
//!
//! The grab and release motors are driven by pulsing a GPIO output.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};
use std::fs;
use std::path::PathBuf;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Something that can set binary outputs.
pub trait Actuator {
    fn set_output(&mut self, name: &str, level: Level);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Outputs exported through the linux sysfs GPIO interface.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SysfsGpio {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl Actuator for SysfsGpio {
    fn set_output(&mut self, name: &str, level: Level) {
        let path = self.root.join(name).join("value");
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };

        match fs::write(&path, value) {
            Ok(_) => trace!("{} set {:?}", name, level),
            Err(e) => warn!("Could not set {} {:?} ({:?}): {}", name, level, path, e),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Pulse an output low, high, then low again.
pub fn pulse(actuator: &mut dyn Actuator, name: &str) {
    for level in [Level::Low, Level::High, Level::Low].iter() {
        actuator.set_output(name, *level);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sysfs_write() {
        let root = std::env::temp_dir().join(format!("ctrl_gpio_{}", std::process::id()));
        fs::create_dir_all(root.join("gpio157")).unwrap();

        let mut gpio = SysfsGpio::new(&root);
        pulse(&mut gpio, "gpio157");
        assert_eq!(fs::read_to_string(root.join("gpio157/value")).unwrap(), "0");

        gpio.set_output("gpio157", Level::High);
        assert_eq!(fs::read_to_string(root.join("gpio157/value")).unwrap(), "1");

        // Missing outputs are only logged
        gpio.set_output("gpio999", Level::High);

        fs::remove_dir_all(root).ok();
    }
}

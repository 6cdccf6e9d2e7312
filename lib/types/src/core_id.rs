/*++

Licensed under the Apache-2.0 license.

File Name:

    core_id.rs

Abstract:

    File contains the identifiers of the emulated cores.

--*/

use std::fmt;

/// One of the two emulated cores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoreId {
    /// Main processor
    Cpu,

    /// Coprocessor
    Cop,
}

impl CoreId {
    /// All cores, in the order they execute within a lock-step cycle
    pub const ALL: [CoreId; 2] = [CoreId::Cpu, CoreId::Cop];

    /// Value reported by the CPU_ID register when read from this core
    pub const fn hw_id(self) -> u8 {
        match self {
            CoreId::Cpu => 0xaa,
            CoreId::Cop => 0x55,
        }
    }

    /// Position of this core in per-core arrays
    pub const fn index(self) -> usize {
        match self {
            CoreId::Cpu => 0,
            CoreId::Cop => 1,
        }
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreId::Cpu => write!(f, "CPU"),
            CoreId::Cop => write!(f, "COP"),
        }
    }
}

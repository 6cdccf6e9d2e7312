/*++

Licensed under the Apache-2.0 license.

File Name:

    types.rs

Abstract:

    Common types used in the project.

--*/

use bitfield::bitfield;
use mcemu_types::ArmMode;
use std::fmt;

/// Instruction fetched at the PC of a core, before it executes
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ArmInstr {
    /// 32-bit ARM state instruction
    Arm(u32),

    /// 16-bit Thumb state instruction
    Thumb(u16),
}

impl fmt::Display for ArmInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmInstr::Arm(instr) => write!(f, "0x{instr:08x}"),
            ArmInstr::Thumb(instr) => write!(f, "0x{instr:04x}"),
        }
    }
}

bitfield! {
    /// Current Program Status Register
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Cpsr(u32);

    /// Negative
    pub n, set_n: 31;

    /// Zero
    pub z, set_z: 30;

    /// Carry
    pub c, set_c: 29;

    /// Overflow
    pub v, set_v: 28;

    /// IRQ disable
    pub irq_disable, set_irq_disable: 7;

    /// FIQ disable
    pub fiq_disable, set_fiq_disable: 6;

    /// Thumb state
    pub thumb, set_thumb: 5;

    /// Processor mode
    pub from into ArmMode, mode, set_mode: 4, 0;
}

impl fmt::Display for Cpsr {
    /// Formats as flags (upper case when set) followed by state and mode,
    /// e.g. `nZCv arm User`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c.to_ascii_uppercase() } else { c };
        write!(
            f,
            "{}{}{}{} {} {}",
            flag(self.n(), 'n'),
            flag(self.z(), 'z'),
            flag(self.c(), 'c'),
            flag(self.v(), 'v'),
            if self.thumb() { "thumb" } else { "arm" },
            self.mode()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpsr_fields() {
        let cpsr = Cpsr(0x6000_00d3);
        assert!(!cpsr.n());
        assert!(cpsr.z());
        assert!(cpsr.c());
        assert!(!cpsr.v());
        assert!(cpsr.irq_disable());
        assert!(cpsr.fiq_disable());
        assert!(!cpsr.thumb());
        assert_eq!(cpsr.mode(), ArmMode::Supervisor);
    }

    #[test]
    fn test_cpsr_set_mode() {
        let mut cpsr = Cpsr(0xf000_0000);
        cpsr.set_mode(ArmMode::User);
        cpsr.set_thumb(true);
        assert_eq!(cpsr.0, 0xf000_0030);
        assert_eq!(cpsr.to_string(), "NZCV thumb User");
    }

    #[test]
    fn test_cpsr_invalid_mode() {
        assert_eq!(Cpsr(0).mode(), ArmMode::Invalid);
        assert_eq!(Cpsr(0x4000_0010).to_string(), "nZcv arm User");
    }

    #[test]
    fn test_instr_display() {
        assert_eq!(ArmInstr::Arm(0xe12f_ff1e).to_string(), "0xe12fff1e");
        assert_eq!(ArmInstr::Thumb(0x4770).to_string(), "0x4770");
    }
}

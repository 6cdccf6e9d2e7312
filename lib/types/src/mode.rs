/*++

Licensed under the Apache-2.0 license.

File Name:

    mode.rs

Abstract:

    File contains the ARMv4T processor modes.

--*/

use crate::arm_enum;

arm_enum! {
    /// ARM processor mode, as encoded in CPSR[4:0]
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub ArmMode;
    u32;
    {
        /// Unprivileged mode
        User = 0b10000,

        /// Fast interrupt
        Fiq = 0b10001,

        /// Interrupt
        Irq = 0b10010,

        /// Supervisor (reset, SWI)
        Supervisor = 0b10011,

        /// Prefetch/Data abort
        Abort = 0b10111,

        /// Undefined instruction
        Undefined = 0b11011,

        /// Privileged mode sharing the User register bank
        System = 0b11111,
    };
    Invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_decode() {
        assert_eq!(ArmMode::from(0x10), ArmMode::User);
        assert_eq!(ArmMode::from(0x13), ArmMode::Supervisor);
        assert_eq!(ArmMode::from(0x1f), ArmMode::System);
        assert_eq!(ArmMode::from(0x00), ArmMode::Invalid);
    }

    #[test]
    fn test_mode_encode() {
        for mode in ArmMode::ALL {
            assert_eq!(ArmMode::from(u32::from(*mode)), *mode);
        }
    }
}

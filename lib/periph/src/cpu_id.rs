/*++

Licensed under the Apache-2.0 license.

File Name:

    cpu_id.rs

Abstract:

    File contains the per-core CPU identification register.

--*/

use mcemu_bus::{Bus, BusError, ReadOnlyRegister, Register};
use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};
use tock_registers::interfaces::Writeable;

/// Address of the CPU_ID register in the SoC memory map
pub const CPU_ID_ADDR: ArmAddr = 0xffff_4200;

/// Byte-wide register that reads back the identifier of the core performing
/// the access.
///
/// The register has no way to see who issued a bus cycle, so the scheduler
/// announces the executing core through [`Bus::select_core`] before each
/// instruction.
pub struct CpuIdReg {
    id: ReadOnlyRegister<u8>,
}

impl CpuIdReg {
    pub fn new() -> Self {
        Self {
            id: ReadOnlyRegister::new(CoreId::Cpu.hw_id()),
        }
    }

    /// Memory map size.
    pub fn mmap_size(&self) -> ArmAddr {
        <ReadOnlyRegister<u8> as Register>::SIZE as ArmAddr
    }
}

impl Default for CpuIdReg {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for CpuIdReg {
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        match addr {
            0 => self.id.read(size),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError> {
        match addr {
            0 => self.id.write(size, val),
            _ => Err(BusError::StoreAccessFault),
        }
    }

    fn select_core(&mut self, id: CoreId) {
        self.id.reg.set(id.hw_id());
    }

    fn warm_reset(&mut self) {
        self.select_core(CoreId::Cpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_selected_core() {
        let mut reg = CpuIdReg::new();
        assert_eq!(reg.read(ArmSize::Byte, 0), Ok(0xaa));

        reg.select_core(CoreId::Cop);
        assert_eq!(reg.read(ArmSize::Byte, 0), Ok(0x55));

        reg.select_core(CoreId::Cpu);
        assert_eq!(reg.read(ArmSize::Byte, 0), Ok(0xaa));
    }

    #[test]
    fn test_wide_reads_fault() {
        let mut reg = CpuIdReg::new();
        assert_eq!(
            reg.read(ArmSize::HalfWord, 0),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(reg.read(ArmSize::Word, 0), Err(BusError::LoadAccessFault));
    }

    #[test]
    fn test_writes_fault() {
        let mut reg = CpuIdReg::new();
        for size in ArmSize::ALL {
            assert_eq!(reg.write(*size, 0, 0x55), Err(BusError::StoreAccessFault));
        }
        assert_eq!(reg.read(ArmSize::Byte, 0), Ok(0xaa));
    }

    #[test]
    fn test_warm_reset_selects_cpu() {
        let mut reg = CpuIdReg::new();
        reg.select_core(CoreId::Cop);
        reg.warm_reset();
        assert_eq!(reg.read(ArmSize::Byte, 0), Ok(0xaa));
    }

    #[test]
    fn test_mmap_size() {
        assert_eq!(CpuIdReg::new().mmap_size(), 1);
    }
}

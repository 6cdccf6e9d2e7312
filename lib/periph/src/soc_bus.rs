/*++

Licensed under the Apache-2.0 license.

File Name:

    soc_bus.rs

Abstract:

    File contains the root bus of the emulated dual-core SoC.

--*/

use crate::cpu_id::{CpuIdReg, CPU_ID_ADDR};
use mcemu_bus::{Bus, BusError, DynamicBus, Ram};
use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};

/// How the two cores' initial stack pointers are placed in stack RAM
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StackLayout {
    /// Each core gets its own half of stack RAM
    #[default]
    Split,

    /// Both cores start at the top of stack RAM, so their frames alias
    Shared,
}

/// Memory map configuration
#[derive(Debug, Clone)]
pub struct SocBusArgs {
    /// Base of program RAM
    pub program_base: ArmAddr,

    /// Size of program RAM in bytes
    pub program_size: usize,

    /// Size of stack RAM in bytes. Stack RAM ends at `SocBus::STACK_END`.
    pub stack_size: usize,
}

impl Default for SocBusArgs {
    fn default() -> Self {
        Self {
            program_base: SocBus::PROGRAM_BASE,
            program_size: SocBus::PROGRAM_SIZE,
            stack_size: SocBus::STACK_SIZE,
        }
    }
}

/// Root bus of the SoC: program RAM, stack RAM and the CPU_ID register,
/// shared by both cores.
pub struct SocBus {
    bus: DynamicBus,
    stack_size: usize,
}

impl SocBus {
    pub const PROGRAM_BASE: ArmAddr = 0x5555_0000;
    pub const PROGRAM_SIZE: usize = 1024 * 1024;
    pub const STACK_SIZE: usize = 1024 * 1024;

    /// One past the last byte of stack RAM
    pub const STACK_END: u64 = 0x1000_0000;

    pub fn new(args: SocBusArgs) -> std::io::Result<Self> {
        let mut bus = DynamicBus::new();
        bus.attach_dev(
            "program",
            range(args.program_base as u64, args.program_size)?,
            Box::new(Ram::zeroed(args.program_size)),
        )?;
        let stack_base = Self::STACK_END
            .checked_sub(args.stack_size as u64)
            .ok_or_else(|| out_of_space(0, args.stack_size))?;
        bus.attach_dev(
            "stack",
            range(stack_base, args.stack_size)?,
            Box::new(Ram::zeroed(args.stack_size)),
        )?;
        let cpu_id = CpuIdReg::new();
        bus.attach_dev(
            "cpu_id",
            range(CPU_ID_ADDR as u64, cpu_id.mmap_size() as usize)?,
            Box::new(cpu_id),
        )?;
        Ok(Self {
            bus,
            stack_size: args.stack_size,
        })
    }

    /// Initial stack pointer of `core`
    pub fn stack_top(&self, core: CoreId, layout: StackLayout) -> ArmAddr {
        let top = Self::STACK_END as ArmAddr;
        match (layout, core) {
            (StackLayout::Shared, _) | (StackLayout::Split, CoreId::Cpu) => top,
            (StackLayout::Split, CoreId::Cop) => top - (self.stack_size / 2) as ArmAddr,
        }
    }

    /// Copy `bytes` to `addr` through the bus.
    ///
    /// # Error
    ///
    /// * `ArmAddr` - first address that is not backed by writable memory
    pub fn load(&mut self, addr: ArmAddr, bytes: &[u8]) -> Result<(), ArmAddr> {
        for (offset, byte) in bytes.iter().enumerate() {
            let byte_addr = addr.checked_add(offset as ArmAddr).ok_or(ArmAddr::MAX)?;
            self.bus
                .write(ArmSize::Byte, byte_addr, ArmData::from(*byte))
                .map_err(|_| byte_addr)?;
        }
        Ok(())
    }

    /// Name of the region mapped at `addr`
    pub fn region_name(&self, addr: ArmAddr) -> Option<&str> {
        self.bus.dev_name(addr)
    }
}

fn out_of_space(start: u64, size: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("region {start:#x}+{size:#x} does not fit the 32-bit address space"),
    )
}

fn range(start: u64, size: usize) -> std::io::Result<std::ops::RangeInclusive<ArmAddr>> {
    let end = start + size as u64;
    if size == 0 || end > 1 << 32 {
        return Err(out_of_space(start, size));
    }
    Ok(start as ArmAddr..=(end - 1) as ArmAddr)
}

impl Bus for SocBus {
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        self.bus.read(size, addr)
    }

    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError> {
        self.bus.write(size, addr, val)
    }

    fn select_core(&mut self, id: CoreId) {
        self.bus.select_core(id)
    }

    fn poll(&mut self) {
        self.bus.poll()
    }

    fn warm_reset(&mut self) {
        self.bus.warm_reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soc() -> SocBus {
        SocBus::new(SocBusArgs::default()).unwrap()
    }

    #[test]
    fn test_default_map() {
        let bus = soc();
        assert_eq!(bus.region_name(0x5555_0000), Some("program"));
        assert_eq!(bus.region_name(0x5564_ffff), Some("program"));
        assert_eq!(bus.region_name(0x5565_0000), None);
        assert_eq!(bus.region_name(0x0ff0_0000), Some("stack"));
        assert_eq!(bus.region_name(0x0fff_ffff), Some("stack"));
        assert_eq!(bus.region_name(0x1000_0000), None);
        assert_eq!(bus.region_name(CPU_ID_ADDR), Some("cpu_id"));
        assert_eq!(bus.region_name(CPU_ID_ADDR + 1), None);
    }

    #[test]
    fn test_cpu_id_follows_selected_core() {
        let mut bus = soc();
        bus.select_core(CoreId::Cop);
        assert_eq!(bus.read(ArmSize::Byte, CPU_ID_ADDR), Ok(0x55));
        bus.select_core(CoreId::Cpu);
        assert_eq!(bus.read(ArmSize::Byte, CPU_ID_ADDR), Ok(0xaa));
        assert_eq!(
            bus.read(ArmSize::Word, CPU_ID_ADDR),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            bus.write(ArmSize::Byte, CPU_ID_ADDR, 0),
            Err(BusError::StoreAccessFault)
        );
    }

    #[test]
    fn test_stack_tops() {
        let bus = soc();
        assert_eq!(bus.stack_top(CoreId::Cpu, StackLayout::Split), 0x1000_0000);
        assert_eq!(bus.stack_top(CoreId::Cop, StackLayout::Split), 0x0ff8_0000);
        assert_eq!(bus.stack_top(CoreId::Cpu, StackLayout::Shared), 0x1000_0000);
        assert_eq!(bus.stack_top(CoreId::Cop, StackLayout::Shared), 0x1000_0000);
    }

    #[test]
    fn test_stack_is_writable_below_top() {
        let mut bus = soc();
        assert_eq!(bus.write(ArmSize::Word, 0x0fff_fffc, 0x1234_5678), Ok(()));
        assert_eq!(bus.read(ArmSize::Word, 0x0fff_fffc), Ok(0x1234_5678));
        assert_eq!(
            bus.write(ArmSize::Word, 0x1000_0000, 0),
            Err(BusError::StoreAccessFault)
        );
    }

    #[test]
    fn test_load() {
        let mut bus = soc();
        assert_eq!(bus.load(0x5555_0000, &[0x04, 0xb0, 0x2d, 0xe5]), Ok(()));
        assert_eq!(bus.read(ArmSize::Word, 0x5555_0000), Ok(0xe52d_b004));
    }

    #[test]
    fn test_load_reports_unmapped_address() {
        let mut bus = soc();
        assert_eq!(bus.load(0x5564_fffe, &[1, 2, 3, 4]), Err(0x5565_0000));
        assert_eq!(bus.load(CPU_ID_ADDR, &[0xaa]), Err(CPU_ID_ADDR));
        assert_eq!(bus.load(0x2000_0000, &[]), Ok(()));
    }

    #[test]
    fn test_custom_args() {
        let bus = SocBus::new(SocBusArgs {
            program_base: 0x0000_0000,
            program_size: 0x1000,
            stack_size: 0x2000,
        })
        .unwrap();
        assert_eq!(bus.region_name(0xfff), Some("program"));
        assert_eq!(bus.region_name(0x0fff_e000), Some("stack"));
        assert_eq!(bus.region_name(0x0fff_dfff), None);
        assert_eq!(bus.stack_top(CoreId::Cop, StackLayout::Split), 0x0fff_f000);
    }

    #[test]
    fn test_oversized_stack_rejected() {
        let result = SocBus::new(SocBusArgs {
            stack_size: 0x1000_0001,
            ..Default::default()
        });
        let err = result.err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert_eq!(
            err.to_string(),
            "region 0x0+0x10000001 does not fit the 32-bit address space"
        );

        // The whole space below the stack end is still accepted
        let bus = SocBus::new(SocBusArgs {
            program_base: 0x1000_0000,
            program_size: 0x1000,
            stack_size: 0x1000_0000,
        })
        .unwrap();
        assert_eq!(bus.region_name(0), Some("stack"));
    }

    #[test]
    fn test_overlapping_regions_rejected() {
        let result = SocBus::new(SocBusArgs {
            program_base: 0x0ff8_0000,
            ..Default::default()
        });
        assert_eq!(
            result.err().map(|e| e.kind()),
            Some(std::io::ErrorKind::AddrInUse)
        );
    }
}

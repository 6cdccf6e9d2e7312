/*++

Licensed under the Apache-2.0 license.

File Name:

    bus_bridge.rs

Abstract:

    File contains the adapter that lets an ARM core access a Bus.

--*/

use crate::cpu::{WatchPtrCfg, WatchPtrHit, WatchPtrKind};
use armv4t_emu::Memory;
use mcemu_bus::{Bus, BusError};
use mcemu_types::{ArmAddr, ArmData, ArmSize};

/// Presents a `Bus` as `armv4t_emu::Memory` for the duration of one
/// instruction.
///
/// `Memory` accesses cannot fail, so faulting reads return 0 and faulting
/// writes are dropped. The first fault and the first watched access are kept
/// for the caller to inspect once the instruction completes.
pub(crate) struct BusBridge<'a, TBus: Bus> {
    bus: &'a mut TBus,
    watch: &'a WatchPtrCfg,

    /// Address of the opcode fetch still expected from the core. That read is
    /// not checked against read watchpoints.
    fetch_addr: Option<ArmAddr>,

    pub hit: Option<WatchPtrHit>,
    pub fault: Option<(ArmAddr, BusError)>,
}

impl<'a, TBus: Bus> BusBridge<'a, TBus> {
    pub fn new(bus: &'a mut TBus, watch: &'a WatchPtrCfg, fetch_addr: ArmAddr) -> Self {
        Self {
            bus,
            watch,
            fetch_addr: Some(fetch_addr),
            hit: None,
            fault: None,
        }
    }

    fn check_watch(&mut self, kind: WatchPtrKind, addr: ArmAddr, size: ArmSize) {
        if self.hit.is_some() {
            return;
        }
        self.hit = self
            .watch
            .watch_ptrs
            .iter()
            .find_map(|watch_ptr| watch_ptr.first_hit(kind, addr, size))
            .map(|addr| WatchPtrHit { addr, kind });
    }

    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> ArmData {
        if self.fetch_addr == Some(addr) {
            self.fetch_addr = None;
        } else {
            self.check_watch(WatchPtrKind::Read, addr, size);
        }
        match self.bus.read(size, addr) {
            Ok(val) => val,
            Err(err) => {
                self.fault.get_or_insert((addr, err));
                0
            }
        }
    }

    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) {
        self.check_watch(WatchPtrKind::Write, addr, size);
        if let Err(err) = self.bus.write(size, addr, val) {
            self.fault.get_or_insert((addr, err));
        }
    }
}

macro_rules! impl_bridge_r {
    ($fn:ident, $ty:ty, $size:ident) => {
        fn $fn(&mut self, addr: u32) -> $ty {
            self.read(ArmSize::$size, addr) as $ty
        }
    };
}

macro_rules! impl_bridge_w {
    ($fn:ident, $ty:ty, $size:ident) => {
        fn $fn(&mut self, addr: u32, val: $ty) {
            self.write(ArmSize::$size, addr, ArmData::from(val))
        }
    };
}

impl<TBus: Bus> Memory for BusBridge<'_, TBus> {
    impl_bridge_r!(r8, u8, Byte);
    impl_bridge_r!(r16, u16, HalfWord);
    impl_bridge_r!(r32, u32, Word);
    impl_bridge_w!(w8, u8, Byte);
    impl_bridge_w!(w16, u16, HalfWord);
    impl_bridge_w!(w32, u32, Word);
}

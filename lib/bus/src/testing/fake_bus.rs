/*++

Licensed under the Apache-2.0 license.

File Name:

    fake_bus.rs

Abstract:

    File contains code for a fake implementation of the Bus trait.

--*/

use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};

use crate::testing::{BusCall, BusLog};
use crate::{Bus, BusError};

/// A Bus implementation that logs every call, including the scheduler hooks,
/// and returns caller-chosen results.
///
/// # Example
///
/// ```
/// use mcemu_bus::{Bus, testing::{BusCall, FakeBus}};
/// use mcemu_types::{ArmSize, CoreId};
///
/// let mut fake_bus = FakeBus::new();
/// fake_bus.read_result = Ok(35);
/// fake_bus.select_core(CoreId::Cpu);
/// assert_eq!(fake_bus.read(ArmSize::HalfWord, 0xdeadcafe), Ok(35));
/// assert_eq!(
///     fake_bus.log.take(),
///     [
///         BusCall::SelectCore(CoreId::Cpu),
///         BusCall::Read { size: ArmSize::HalfWord, addr: 0xdeadcafe },
///     ]
/// );
/// ```
pub struct FakeBus {
    pub log: BusLog,
    pub read_result: Result<ArmData, BusError>,
    pub write_result: Result<(), BusError>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            log: BusLog::new(),
            read_result: Ok(0),
            write_result: Ok(()),
        }
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FakeBus {
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        self.log.record(BusCall::Read { size, addr });
        self.read_result
    }

    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError> {
        self.log.record(BusCall::Write { size, addr, val });
        self.write_result
    }

    fn select_core(&mut self, id: CoreId) {
        self.log.record(BusCall::SelectCore(id));
    }

    fn poll(&mut self) {
        self.log.record(BusCall::Poll);
    }

    fn warm_reset(&mut self) {
        self.log.record(BusCall::WarmReset);
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    dynamic_bus.rs

Abstract:

    File contains DynamicBus type.

--*/

use std::{io::ErrorKind, ops::RangeInclusive};

use crate::{Bus, BusError};
use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};

struct MappedDevice {
    name: String,
    mmap_range: RangeInclusive<ArmAddr>,
    bus: Box<dyn Bus>,
}

/// A bus that uses dynamic-dispatch to delegate to a runtime-modifiable list of
/// devices, kept sorted by base address.
#[derive(Default)]
pub struct DynamicBus {
    devs: Vec<MappedDevice>,
}

impl DynamicBus {
    pub fn new() -> DynamicBus {
        Self::default()
    }

    /// Attach `bus` at `mmap_range`. Device accesses are relative to the
    /// start of the range.
    ///
    /// # Error
    ///
    /// * `ErrorKind::AddrInUse` - the range overlaps an attached device
    pub fn attach_dev(
        &mut self,
        name: &str,
        mmap_range: RangeInclusive<ArmAddr>,
        bus: Box<dyn Bus>,
    ) -> std::io::Result<()> {
        let mut index = 0;
        for cur in self.devs.iter() {
            if mmap_range.end() >= cur.mmap_range.start()
                && mmap_range.start() <= cur.mmap_range.end()
            {
                return Err(std::io::Error::new(
                    ErrorKind::AddrInUse,
                    format!(
                        "Address space for device {} ({:#010x}-{:#010x}) collides with device {} ({:#010x}-{:#010x})",
                        name,
                        mmap_range.start(),
                        mmap_range.end(),
                        cur.name,
                        cur.mmap_range.start(),
                        cur.mmap_range.end()
                    ),
                ));
            }
            if mmap_range.start() < cur.mmap_range.start() {
                break;
            }
            index += 1;
        }
        log::debug!(
            "attached {} at {:#010x}-{:#010x}",
            name,
            mmap_range.start(),
            mmap_range.end()
        );
        self.devs.insert(
            index,
            MappedDevice {
                name: name.into(),
                mmap_range,
                bus,
            },
        );
        Ok(())
    }

    /// Name of the device mapped at `addr`, if any
    pub fn dev_name(&self, addr: ArmAddr) -> Option<&str> {
        self.find(addr).map(|i| self.devs[i].name.as_str())
    }

    fn find(&self, addr: ArmAddr) -> Option<usize> {
        self.devs
            .binary_search_by(|d| {
                if *d.mmap_range.end() < addr {
                    std::cmp::Ordering::Less
                } else if *d.mmap_range.start() > addr {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }
}

impl Bus for DynamicBus {
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        let index = self.find(addr).ok_or(BusError::LoadAccessFault)?;
        let dev = &mut self.devs[index];
        dev.bus.read(size, addr - dev.mmap_range.start())
    }

    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError> {
        let index = self.find(addr).ok_or(BusError::StoreAccessFault)?;
        let dev = &mut self.devs[index];
        dev.bus.write(size, addr - dev.mmap_range.start(), val)
    }

    fn select_core(&mut self, id: CoreId) {
        for dev in self.devs.iter_mut() {
            dev.bus.select_core(id);
        }
    }

    fn poll(&mut self) {
        for dev in self.devs.iter_mut() {
            dev.bus.poll();
        }
    }

    fn warm_reset(&mut self) {
        for dev in self.devs.iter_mut() {
            dev.bus.warm_reset();
        }
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    ram.rs

Abstract:

    File contains implementation of RAM

--*/

use crate::{mem::Mem, Bus, BusError};
use mcemu_types::{ArmAddr, ArmData, ArmSize};

/// Read Write Memory Device
pub struct Ram {
    data: Mem,
}

impl Ram {
    /// Create new RAM
    ///
    /// # Arguments
    ///
    /// * `data` - Initial contents of the RAM
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Mem::new(data),
        }
    }

    /// Create a zero-filled RAM of `size` bytes
    pub fn zeroed(size: usize) -> Self {
        Self::new(vec![0; size])
    }

    pub fn mmap_size(&self) -> ArmAddr {
        self.data.len() as ArmAddr
    }
}

impl Bus for Ram {
    /// Read data of specified size from given address
    ///
    /// # Error
    ///
    /// * `BusError::LoadAccessFault` - Read past the end of the RAM
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        Ok(self.data.read(size, addr)?)
    }

    /// Write data of specified size to given address
    ///
    /// # Error
    ///
    /// * `BusError::StoreAccessFault` - Write past the end of the RAM
    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError> {
        Ok(self.data.write(size, addr, val)?)
    }
}

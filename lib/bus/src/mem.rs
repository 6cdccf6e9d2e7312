/*++

Licensed under the Apache-2.0 license.

File Name:

    mem.rs

Abstract:

    File contains implementation of helper data structures to support memory
    devices like ROM and RAM.

--*/

use crate::BusError;
use mcemu_types::{ArmAddr, ArmData, ArmSize};

/// Memory Exception
#[derive(Debug, PartialEq, Eq)]
pub enum MemError {
    /// Read from an address or width the memory does not back
    ReadAccessFault,

    /// Write to an address or width the memory does not back
    WriteAccessFault,
}

impl From<MemError> for BusError {
    /// Converts to this type from the input type.
    fn from(exception: MemError) -> BusError {
        match exception {
            MemError::ReadAccessFault => BusError::LoadAccessFault,
            MemError::WriteAccessFault => BusError::StoreAccessFault,
        }
    }
}

/// Little-endian byte storage
pub struct Mem {
    /// Data storage
    data: Vec<u8>,
}

impl Mem {
    /// Create a new memory object
    ///
    /// # Arguments
    ///
    /// * `data` - Data contents for memory
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Size of the memory in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn range(&self, size: ArmSize, addr: ArmAddr) -> Option<std::ops::Range<usize>> {
        let len = match size {
            ArmSize::Invalid => return None,
            size => usize::from(size),
        };
        let start = addr as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }

    /// Read data of specified size from given address. ARM cores may issue
    /// unaligned accesses, so any in-range address is accepted.
    ///
    /// # Error
    ///
    /// * `MemError::ReadAccessFault` - Read from invalid or non existent address
    #[inline]
    pub fn read(&self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, MemError> {
        let range = self.range(size, addr).ok_or(MemError::ReadAccessFault)?;
        Ok(self.data[range]
            .iter()
            .rev()
            .fold(0, |acc, b| (acc << 8) | ArmData::from(*b)))
    }

    /// Write data of specified size to given address
    ///
    /// # Error
    ///
    /// * `MemError::WriteAccessFault` - Write to invalid or non existent address
    #[inline]
    pub fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), MemError> {
        let range = self.range(size, addr).ok_or(MemError::WriteAccessFault)?;
        let len = range.len();
        self.data[range].copy_from_slice(&val.to_le_bytes()[..len]);
        Ok(())
    }
}

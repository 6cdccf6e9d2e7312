/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait.

--*/

use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};
use std::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Instruction fetch from an unmapped or non-executable address
    InstrAccessFault,

    /// Load from an unmapped address or with an unsupported width
    LoadAccessFault,

    /// Store to an unmapped or read-only address, or with an unsupported width
    StoreAccessFault,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BusError::InstrAccessFault => "instruction access fault",
            BusError::LoadAccessFault => "load access fault",
            BusError::StoreAccessFault => "store access fault",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for BusError {}

/// Represents an abstract memory bus. Used to read and write from RAM and
/// peripheral addresses.
pub trait Bus {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Address to read from
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault`
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Address to write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault`
    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError>;

    /// Called by the scheduler right before `id` executes an instruction.
    /// Core-aware peripherals use it to answer accesses on behalf of that core.
    fn select_core(&mut self, _id: CoreId) {
        // By default, do nothing
    }

    /// This method is used to notify peripherals of the passage of time. The
    /// owner of this bus MAY call this function once per lock-step cycle.
    fn poll(&mut self) {
        // By default, do nothing
    }

    fn warm_reset(&mut self) {
        // By default, do nothing
    }
}

impl<T: Bus + ?Sized> Bus for Box<T> {
    fn read(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        T::read(self, size, addr)
    }

    fn write(&mut self, size: ArmSize, addr: ArmAddr, val: ArmData) -> Result<(), BusError> {
        T::write(self, size, addr, val)
    }

    fn select_core(&mut self, id: CoreId) {
        T::select_core(self, id)
    }

    fn poll(&mut self) {
        T::poll(self)
    }

    fn warm_reset(&mut self) {
        T::warm_reset(self)
    }
}

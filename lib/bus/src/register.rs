/*++

Licensed under the Apache-2.0 license.

File Name:

    register.rs

Abstract:

    File contains implementation of the register types used by peripherals

--*/

use crate::BusError;
use mcemu_types::{ArmData, ArmSize};
use tock_registers::interfaces::Readable;
use tock_registers::registers::InMemoryRegister;
use tock_registers::{RegisterLongName, UIntLike};

/// A fixed-width peripheral register. Accesses whose width differs from the
/// register width fault.
pub trait Register {
    /// Size of the register in bytes.
    const SIZE: usize;

    /// Read the register
    ///
    /// # Error
    ///
    /// * `BusError::LoadAccessFault` - `size` does not match the register width
    fn read(&self, size: ArmSize) -> Result<ArmData, BusError>;

    /// Write the register
    ///
    /// # Error
    ///
    /// * `BusError::StoreAccessFault` - `size` does not match the register
    ///   width, or the register is read-only
    fn write(&mut self, size: ArmSize, val: ArmData) -> Result<(), BusError>;
}

/// Lossless widening to, and truncating narrowing from, the bus data type
pub trait ArmDataConverter: UIntLike {
    /// Bus access width that matches this type
    const ARM_SIZE: ArmSize;

    fn from_arm_data(val: ArmData) -> Self;

    fn to_arm_data(self) -> ArmData;
}

macro_rules! impl_register_for_uint {
    ($($ty:ty => $size:ident),* $(,)?) => {
        $(
            impl ArmDataConverter for $ty {
                const ARM_SIZE: ArmSize = ArmSize::$size;

                fn from_arm_data(val: ArmData) -> Self {
                    val as $ty
                }

                fn to_arm_data(self) -> ArmData {
                    ArmData::from(self)
                }
            }

            impl Register for $ty {
                const SIZE: usize = std::mem::size_of::<Self>();

                fn read(&self, size: ArmSize) -> Result<ArmData, BusError> {
                    match size {
                        ArmSize::$size => Ok(self.to_arm_data()),
                        _ => Err(BusError::LoadAccessFault),
                    }
                }

                fn write(&mut self, size: ArmSize, val: ArmData) -> Result<(), BusError> {
                    match size {
                        ArmSize::$size => {
                            *self = <$ty>::from_arm_data(val);
                            Ok(())
                        }
                        _ => Err(BusError::StoreAccessFault),
                    }
                }
            }
        )*
    };
}

impl_register_for_uint!(u8 => Byte, u16 => HalfWord, u32 => Word);

/// Read Only Register
///
/// The owning peripheral updates the value through `reg`; bus writes fault.
pub struct ReadOnlyRegister<T: UIntLike, R: RegisterLongName = ()> {
    pub reg: InMemoryRegister<T, R>,
}

impl<T: UIntLike, R: RegisterLongName> ReadOnlyRegister<T, R> {
    pub fn new(val: T) -> Self {
        Self {
            reg: InMemoryRegister::new(val),
        }
    }
}

impl<T: ArmDataConverter, R: RegisterLongName> Register for ReadOnlyRegister<T, R> {
    const SIZE: usize = std::mem::size_of::<T>();

    fn read(&self, size: ArmSize) -> Result<ArmData, BusError> {
        if size != T::ARM_SIZE {
            return Err(BusError::LoadAccessFault);
        }
        Ok(self.reg.get().to_arm_data())
    }

    fn write(&mut self, _size: ArmSize, _val: ArmData) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mcemu Bus library.

--*/

mod bus;
mod dynamic_bus;
mod mem;
mod ram;
mod register;
pub mod testing;

pub use crate::bus::{Bus, BusError};
pub use crate::dynamic_bus::DynamicBus;
pub use crate::mem::{Mem, MemError};
pub use crate::ram::Ram;
pub use crate::register::{ReadOnlyRegister, Register};

/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mcemu Peripheral library.

--*/

mod cpu_id;
mod soc_bus;

pub use cpu_id::{CpuIdReg, CPU_ID_ADDR};
pub use soc_bus::{SocBus, SocBusArgs, StackLayout};

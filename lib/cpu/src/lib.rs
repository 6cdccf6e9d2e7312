/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the mcemu CPU library.

--*/

mod arm_core;
mod bus_bridge;
pub mod cpu;
mod types;

pub use arm_core::{ArmCore, HLE_RETURN_ADDR};
pub use cpu::{
    BusFault, Cpu, CpuArgs, InstrTracer, StepAction, WatchPtr, WatchPtrHit, WatchPtrKind,
};
pub use types::{ArmInstr, Cpsr};

/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains gdb module for the dual-core emulator.

--*/
pub mod gdb_state;
pub mod gdb_target;

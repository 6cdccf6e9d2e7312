/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains exports for code useful for testing Bus traits.

--*/

mod bus_log;
mod fake_bus;

pub use bus_log::{BusCall, BusLog};
pub use fake_bus::FakeBus;

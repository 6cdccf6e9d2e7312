/*++

Licensed under the Apache-2.0 license.

File Name:

    bus_log.rs

Abstract:

    File contains a shared record of Bus trait calls for use in tests.

--*/

use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};
use std::{cell::RefCell, fmt, rc::Rc};

/// One call made through the `Bus` trait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCall {
    Read {
        size: ArmSize,
        addr: ArmAddr,
    },
    Write {
        size: ArmSize,
        addr: ArmAddr,
        val: ArmData,
    },
    SelectCore(CoreId),
    Poll,
    WarmReset,
}

impl BusCall {
    /// Data access address, if the call is a read or write
    pub fn addr(&self) -> Option<ArmAddr> {
        match self {
            BusCall::Read { addr, .. } | BusCall::Write { addr, .. } => Some(*addr),
            _ => None,
        }
    }
}

impl fmt::Display for BusCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BusCall::Read { size, addr } => write!(f, "read({size}, {addr:#x})"),
            BusCall::Write { size, addr, val } => write!(f, "write({size}, {addr:#x}, {val:#x})"),
            BusCall::SelectCore(id) => write!(f, "select_core({id})"),
            BusCall::Poll => f.write_str("poll()"),
            BusCall::WarmReset => f.write_str("warm_reset()"),
        }
    }
}

/// Ordered list of bus calls shared between clones.
///
/// A test keeps a clone of the log of a fake that has been boxed into a
/// `DynamicBus` and inspects the calls after driving the bus.
///
/// # Example
///
/// ```
/// use mcemu_bus::testing::{BusCall, BusLog};
/// use mcemu_types::{ArmSize, CoreId};
///
/// let log = BusLog::new();
/// let handle = log.clone();
/// log.record(BusCall::SelectCore(CoreId::Cop));
/// handle.record(BusCall::Read { size: ArmSize::Byte, addr: 0x4200 });
/// assert_eq!(log.len(), 2);
/// assert_eq!(
///     handle.take(),
///     [
///         BusCall::SelectCore(CoreId::Cop),
///         BusCall::Read { size: ArmSize::Byte, addr: 0x4200 },
///     ]
/// );
/// assert!(log.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct BusLog {
    calls: Rc<RefCell<Vec<BusCall>>>,
}

impl BusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: BusCall) {
        self.calls.borrow_mut().push(call);
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Return the calls recorded so far and leave the log empty
    pub fn take(&self) -> Vec<BusCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Addresses of the data accesses recorded so far, oldest first
    pub fn accessed_addrs(&self) -> Vec<ArmAddr> {
        self.calls.borrow().iter().filter_map(BusCall::addr).collect()
    }
}

impl fmt::Display for BusLog {
    /// One call per line
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for call in self.calls.borrow().iter() {
            writeln!(f, "{call}")?;
        }
        Ok(())
    }
}

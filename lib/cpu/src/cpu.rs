/*++

Licensed under the Apache-2.0 license.

File Name:

    cpu.rs

Abstract:

    File contains the lock-step scheduler of the dual-core ARMv4T system.

--*/

use crate::arm_core::ArmCore;
use crate::bus_bridge::BusBridge;
use crate::types::ArmInstr;
use mcemu_bus::{Bus, BusError};
use mcemu_types::{ArmAddr, ArmData, ArmSize, CoreId};
use std::fmt;

pub type InstrTracer<'a> = dyn FnMut(CoreId, u32, ArmInstr) + 'a;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WatchPtrKind {
    Read,
    Write,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatchPtrHit {
    pub addr: u32,
    pub kind: WatchPtrKind,
}

/// One armed watchpoint covering `addr..addr + len`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatchPtr {
    pub addr: ArmAddr,
    pub len: u32,
    pub kind: WatchPtrKind,
}

impl WatchPtr {
    /// First byte of `addr..addr + size` this watchpoint covers
    pub fn first_hit(
        &self,
        kind: WatchPtrKind,
        addr: ArmAddr,
        size: ArmSize,
    ) -> Option<ArmAddr> {
        if kind != self.kind {
            return None;
        }
        (0..usize::from(size) as ArmAddr)
            .map(|offset| addr.wrapping_add(offset))
            .find(|byte_addr| byte_addr.wrapping_sub(self.addr) < self.len)
    }
}

/// Watchpoints shared by both cores. Each insertion is kept as its own entry,
/// so overlapping watchpoints are removed independently.
pub struct WatchPtrCfg {
    pub watch_ptrs: Vec<WatchPtr>,
    pub hit: Option<WatchPtrHit>,
}

impl WatchPtrCfg {
    pub fn new() -> Self {
        Self {
            watch_ptrs: Vec::new(),
            hit: None,
        }
    }
}

impl Default for WatchPtrCfg {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus error raised while a core executed an instruction
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusFault {
    pub core: CoreId,
    /// Address of the faulting instruction
    pub pc: u32,
    /// Address of the faulting access
    pub addr: ArmAddr,
    pub error: BusError,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {:#010x} (pc {:#010x} on {})",
            self.error, self.addr, self.pc, self.core
        )
    }
}

/// Cpu instruction step action
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StepAction {
    /// Continue
    Continue,

    /// Watchpoint hit; the core's PC points back at the accessing instruction
    Break,

    /// Core returned to `HLE_RETURN_ADDR`
    Halted,

    /// Bus fault
    Fatal,
}

/// Start state of the system
#[derive(Debug, Clone)]
pub struct CpuArgs {
    /// Initial PC of both cores
    pub entry: u32,

    /// Initial SP, indexed by `CoreId::index()`
    pub stack_tops: [u32; 2],

    /// System steps the coprocessor stays idle after reset
    pub cop_start_delay: u32,
}

impl Default for CpuArgs {
    fn default() -> Self {
        Self {
            entry: 0,
            stack_tops: [0; 2],
            cop_start_delay: 24,
        }
    }
}

/// Two ARMv4T cores sharing one bus, executing in lock-step
pub struct Cpu<TBus: Bus> {
    /// The bus both cores use to talk to memory and peripherals.
    pub bus: TBus,

    cores: [ArmCore; 2],

    args: CpuArgs,

    /// Remaining system steps before the coprocessor starts
    stall_cop_cycles: u32,

    /// System steps since reset
    cycles: u64,

    watch_ptr_cfg: WatchPtrCfg,

    fault: Option<BusFault>,
}

impl<TBus: Bus> Cpu<TBus> {
    pub fn new(bus: TBus, args: CpuArgs) -> Self {
        let cores = CoreId::ALL
            .map(|id| ArmCore::new(id, args.entry, args.stack_tops[id.index()]));
        Self {
            bus,
            cores,
            stall_cop_cycles: args.cop_start_delay,
            args,
            cycles: 0,
            watch_ptr_cfg: WatchPtrCfg::new(),
            fault: None,
        }
    }

    /// Reset both cores to the start state and warm-reset the bus. Memory
    /// contents are kept.
    pub fn reset(&mut self) {
        for core in self.cores.iter_mut() {
            core.reset(self.args.entry, self.args.stack_tops[core.id().index()]);
        }
        self.stall_cop_cycles = self.args.cop_start_delay;
        self.cycles = 0;
        self.watch_ptr_cfg.hit = None;
        self.fault = None;
        self.bus.warm_reset();
    }

    pub fn core(&self, id: CoreId) -> &ArmCore {
        &self.cores[id.index()]
    }

    pub fn core_mut(&mut self, id: CoreId) -> &mut ArmCore {
        &mut self.cores[id.index()]
    }

    /// System steps since reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// True while the coprocessor is held idle after reset
    pub fn cop_stalled(&self) -> bool {
        self.stall_cop_cycles != 0
    }

    /// Execute one instruction on core `id`.
    ///
    /// A watchpoint hit or bus fault is recorded only if none is pending;
    /// `step` clears both at the start of every system step.
    pub fn step_core(&mut self, id: CoreId, instr_tracer: Option<&mut InstrTracer>) -> StepAction {
        if id == CoreId::Cop && self.stall_cop_cycles != 0 {
            self.stall_cop_cycles -= 1;
            return StepAction::Continue;
        }
        let core = &mut self.cores[id.index()];
        if core.halted() {
            return StepAction::Continue;
        }

        self.bus.select_core(id);

        let pc = core.pc();
        let fetched = match core.thumb_mode() {
            true => self
                .bus
                .read(ArmSize::HalfWord, pc)
                .map(|instr| ArmInstr::Thumb(instr as u16)),
            false => self.bus.read(ArmSize::Word, pc).map(ArmInstr::Arm),
        };
        let instr = match fetched {
            Ok(instr) => instr,
            Err(_) => {
                return self.record_fault(BusFault {
                    core: id,
                    pc,
                    addr: pc,
                    error: BusError::InstrAccessFault,
                })
            }
        };
        if let Some(tracer) = instr_tracer {
            tracer(id, pc, instr);
        }

        let mut bridge = BusBridge::new(&mut self.bus, &self.watch_ptr_cfg, pc);
        core.step(&mut bridge);
        let (hit, fault) = (bridge.hit, bridge.fault);

        if core.halted() {
            return StepAction::Halted;
        }

        if let Some((addr, error)) = fault {
            return self.record_fault(BusFault {
                core: id,
                pc,
                addr,
                error,
            });
        }

        if let Some(hit) = hit {
            core.set_pc(pc);
            self.watch_ptr_cfg.hit.get_or_insert(hit);
            return StepAction::Break;
        }

        StepAction::Continue
    }

    fn record_fault(&mut self, fault: BusFault) -> StepAction {
        log::warn!("{fault}");
        self.fault.get_or_insert(fault);
        StepAction::Fatal
    }

    /// Advance the system by one lock-step cycle: the CPU executes one
    /// instruction, then the coprocessor does. Returns the first core whose
    /// step did not end in `StepAction::Continue`.
    pub fn step(
        &mut self,
        mut instr_tracer: Option<&mut InstrTracer>,
    ) -> Option<(CoreId, StepAction)> {
        self.watch_ptr_cfg.hit = None;
        self.fault = None;
        self.cycles += 1;

        let mut result = None;
        for id in CoreId::ALL {
            let action = self.step_core(id, instr_tracer.as_deref_mut());
            if action != StepAction::Continue && result.is_none() {
                result = Some((id, action));
            }
        }
        self.bus.poll();
        result
    }

    /// Read from the bus on behalf of a debugger. Watchpoints are not checked.
    pub fn read_bus(&mut self, size: ArmSize, addr: ArmAddr) -> Result<ArmData, BusError> {
        self.bus.read(size, addr)
    }

    /// Write to the bus on behalf of a debugger. Watchpoints are not checked.
    pub fn write_bus(
        &mut self,
        size: ArmSize,
        addr: ArmAddr,
        val: ArmData,
    ) -> Result<(), BusError> {
        self.bus.write(size, addr, val)
    }

    //// Append WatchPointer
    pub fn add_watchptr(&mut self, addr: u32, len: u32, kind: WatchPtrKind) {
        self.watch_ptr_cfg
            .watch_ptrs
            .push(WatchPtr { addr, len, kind });
    }

    /// Remove one watchpoint previously added with the same arguments.
    /// Returns false if there is none.
    pub fn remove_watchptr(&mut self, addr: u32, len: u32, kind: WatchPtrKind) -> bool {
        let watch_ptr = WatchPtr { addr, len, kind };
        let watch_ptrs = &mut self.watch_ptr_cfg.watch_ptrs;
        match watch_ptrs.iter().position(|x| *x == watch_ptr) {
            Some(pos) => {
                watch_ptrs.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every watchpoint
    pub fn clear_watchptrs(&mut self) {
        self.watch_ptr_cfg.watch_ptrs.clear();
    }

    //// Get WatchPointer
    pub fn get_watchptr_hit(&self) -> Option<&WatchPtrHit> {
        self.watch_ptr_cfg.hit.as_ref()
    }

    /// Bus fault raised during the last system step
    pub fn fault(&self) -> Option<&BusFault> {
        self.fault.as_ref()
    }
}

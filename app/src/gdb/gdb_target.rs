/*++

Licensed under the Apache-2.0 license.

File Name:

    gdb_target.rs

Abstract:

    File contains gdb_target module for the dual-core emulator. Each core is
    exposed to GDB as a thread.

--*/

use gdbstub::arch::{Arch, SingleStepGdbBehavior};
use gdbstub::common::{Signal, Tid};
use gdbstub::stub::MultiThreadStopReason;
use gdbstub::target;
use gdbstub::target::ext::base::multithread::{
    MultiThreadBase, MultiThreadResume, MultiThreadResumeOps, MultiThreadSingleStep,
    MultiThreadSingleStepOps,
};
use gdbstub::target::ext::base::BaseOps;
use gdbstub::target::ext::breakpoints::WatchKind;
use gdbstub::target::ext::monitor_cmd::{outputln, ConsoleOutput};
use gdbstub::target::ext::thread_extra_info::{ThreadExtraInfo, ThreadExtraInfoOps};
use gdbstub::target::{Target, TargetError, TargetResult};
use gdbstub_arch::arm::reg::ArmCoreRegs;
use mcemu_cpu::{Cpu, StepAction, WatchPtrKind};
use mcemu_periph::SocBus;
use mcemu_types::{ArmSize, CoreId};
use std::fmt::Write;

/// Number of system steps between two polls for debugger input
const POLL_INTERVAL: u64 = 1024;

const fn tid(n: usize) -> Tid {
    match Tid::new(n) {
        Some(tid) => tid,
        None => panic!("thread id 0 is reserved"),
    }
}

/// GDB thread ids, indexed by `CoreId::index()`
const TIDS: [Tid; 2] = [tid(1), tid(2)];

pub fn core_to_tid(id: CoreId) -> Tid {
    TIDS[id.index()]
}

pub fn tid_to_core(tid: Tid) -> Option<CoreId> {
    CoreId::ALL.into_iter().find(|id| core_to_tid(*id) == tid)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecMode {
    Step,
    Continue,
}

/// Why `GdbTarget::run` returned
pub enum RunEvent {
    /// The debugger sent data while the target was running
    IncomingData,

    /// The target stopped on its own
    Stopped(MultiThreadStopReason<u32>),
}

pub struct GdbTarget {
    cpu: Cpu<SocBus>,
    exec_mode: [Option<ExecMode>; 2],
    breakpoints: Vec<u32>,

    /// Breakpoint reached in a system step that reported another stop
    /// reason. Reported by the next `run` before any instruction executes.
    pending_break: Option<MultiThreadStopReason<u32>>,
}

impl GdbTarget {
    // Create new instance of GdbTarget
    pub fn new(cpu: Cpu<SocBus>) -> Self {
        Self {
            cpu,
            exec_mode: [None; 2],
            breakpoints: Vec::new(),
            pending_break: None,
        }
    }

    /// Release the emulator once the debug session is over. Watchpoints are
    /// dropped so a free run cannot stop on them.
    pub fn into_cpu(mut self) -> Cpu<SocBus> {
        self.cpu.clear_watchptrs();
        self.cpu
    }

    fn core_for(tid: Tid) -> Result<CoreId, &'static str> {
        tid_to_core(tid).ok_or("specified invalid core")
    }

    /// Advance the system by one lock-step cycle and translate what happened
    /// into a stop reason.
    fn step_system(&mut self) -> Option<MultiThreadStopReason<u32>> {
        let before = CoreId::ALL.map(|id| self.cpu.core(id).cycles());
        let event = self.cpu.step(None);

        // Only cores that executed this step can land on a breakpoint
        let sw_break = CoreId::ALL
            .into_iter()
            .filter(|id| self.cpu.core(*id).cycles() != before[id.index()])
            .find(|id| self.breakpoints.contains(&self.cpu.core(*id).pc()))
            .map(|id| MultiThreadStopReason::SwBreak(core_to_tid(id)));

        let reason = event.and_then(|(id, action)| self.stop_reason(id, action));
        if reason.is_some() {
            self.pending_break = sw_break;
            return reason;
        }
        sw_break
    }

    fn stop_reason(&self, id: CoreId, action: StepAction) -> Option<MultiThreadStopReason<u32>> {
        let tid = core_to_tid(id);
        match action {
            StepAction::Break => {
                self.cpu
                    .get_watchptr_hit()
                    .map(|hit| MultiThreadStopReason::Watch {
                        tid,
                        kind: match hit.kind {
                            WatchPtrKind::Read => WatchKind::Read,
                            WatchPtrKind::Write => WatchKind::Write,
                        },
                        addr: hit.addr,
                    })
            }
            StepAction::Halted => {
                let ret = self.cpu.core(id).read_reg(0).unwrap_or_default();
                log::info!("{id} returned {ret:#x}");
                Some(MultiThreadStopReason::Exited(ret as u8))
            }
            StepAction::Fatal => Some(MultiThreadStopReason::Signal(Signal::SIGSEGV)),
            StepAction::Continue => None,
        }
    }

    fn should_single_step(&self) -> bool {
        // Cores run in lock-step, so stepping any core steps the whole system
        self.exec_mode.contains(&Some(ExecMode::Step))
    }

    /// Run the target until it stops or, when continuing, until
    /// `poll_incoming_data` reports pending debugger input.
    pub fn run(&mut self, mut poll_incoming_data: impl FnMut() -> bool) -> RunEvent {
        if let Some(reason) = self.pending_break.take() {
            return RunEvent::Stopped(reason);
        }

        if self.should_single_step() {
            return RunEvent::Stopped(
                self.step_system()
                    .unwrap_or(MultiThreadStopReason::DoneStep),
            );
        }

        let mut cycles: u64 = 0;
        loop {
            if cycles % POLL_INTERVAL == 0 && poll_incoming_data() {
                return RunEvent::IncomingData;
            }
            cycles += 1;

            if let Some(reason) = self.step_system() {
                return RunEvent::Stopped(reason);
            }
        }
    }

    /// One line per core describing where it is
    fn describe_cores(&self) -> String {
        let mut out = String::new();
        for id in CoreId::ALL {
            let core = self.cpu.core(id);
            let state = if core.halted() {
                "halted"
            } else if id == CoreId::Cop && self.cpu.cop_stalled() {
                "stalled"
            } else {
                "running"
            };
            let _ = writeln!(
                out,
                "{id} (tid {}): pc={:#010x} r0={:#x} cpsr={} instructions={} {state}",
                core_to_tid(id),
                core.pc(),
                core.read_reg(0).unwrap_or_default(),
                core.cpsr(),
                core.cycles(),
            );
        }
        out
    }

    /// Execute a `monitor` command and return its console output
    pub fn exec_monitor_cmd(&mut self, cmd: &[u8]) -> String {
        let Ok(cmd) = std::str::from_utf8(cmd) else {
            return "command must be valid UTF-8\n".into();
        };

        match cmd.trim() {
            "" => "Sorry, didn't catch that. Try `monitor ping`!\n".into(),
            "ping" => "pong!\n".into(),
            "cores" => self.describe_cores(),
            "cycles" => format!("{} system steps since reset\n", self.cpu.cycles()),
            "reset" => {
                self.cpu.reset();
                self.pending_break = None;
                "both cores reset\n".into()
            }
            cmd => format!("I don't know how to handle '{cmd}'\n"),
        }
    }
}

impl Target for GdbTarget {
    type Arch = gdbstub_arch::arm::Armv4t;
    type Error = &'static str;

    fn base_ops(&mut self) -> BaseOps<Self::Arch, Self::Error> {
        BaseOps::MultiThread(self)
    }

    fn guard_rail_implicit_sw_breakpoints(&self) -> bool {
        true
    }

    fn guard_rail_single_step_gdb_behavior(&self) -> SingleStepGdbBehavior {
        SingleStepGdbBehavior::Optional
    }

    fn support_breakpoints(
        &mut self,
    ) -> Option<target::ext::breakpoints::BreakpointsOps<'_, Self>> {
        Some(self)
    }

    fn support_monitor_cmd(&mut self) -> Option<target::ext::monitor_cmd::MonitorCmdOps<'_, Self>> {
        Some(self)
    }
}

impl MultiThreadBase for GdbTarget {
    fn read_registers(&mut self, regs: &mut ArmCoreRegs, tid: Tid) -> TargetResult<(), Self> {
        let core = self.cpu.core(Self::core_for(tid).map_err(|_| TargetError::NonFatal)?);

        for (idx, reg) in regs.r.iter_mut().enumerate() {
            *reg = core.read_reg(idx as u8).ok_or(TargetError::NonFatal)?;
        }
        regs.sp = core.read_reg(13).ok_or(TargetError::NonFatal)?;
        regs.lr = core.read_reg(14).ok_or(TargetError::NonFatal)?;
        regs.pc = core.pc();
        regs.cpsr = core.cpsr().0;

        Ok(())
    }

    fn write_registers(&mut self, regs: &ArmCoreRegs, tid: Tid) -> TargetResult<(), Self> {
        let id = Self::core_for(tid).map_err(|_| TargetError::NonFatal)?;
        let core = self.cpu.core_mut(id);

        for (idx, reg) in regs.r.iter().enumerate() {
            core.write_reg(idx as u8, *reg);
        }
        core.write_reg(13, regs.sp);
        core.write_reg(14, regs.lr);
        core.set_pc(regs.pc);
        // Last, since it may switch the register bank
        core.write_reg(16, regs.cpsr);

        Ok(())
    }

    fn read_addrs(&mut self, start_addr: u32, data: &mut [u8], _tid: Tid) -> TargetResult<(), Self> {
        // Both cores share one address space
        for (addr, val) in (start_addr..).zip(data.iter_mut()) {
            *val = self
                .cpu
                .read_bus(ArmSize::Byte, addr)
                .map_err(|_| TargetError::NonFatal)? as u8;
        }
        Ok(())
    }

    fn write_addrs(&mut self, start_addr: u32, data: &[u8], _tid: Tid) -> TargetResult<(), Self> {
        for (addr, val) in (start_addr..).zip(data.iter().copied()) {
            self.cpu
                .write_bus(ArmSize::Byte, addr, u32::from(val))
                .map_err(|_| TargetError::NonFatal)?;
        }
        Ok(())
    }

    fn list_active_threads(
        &mut self,
        thread_is_active: &mut dyn FnMut(Tid),
    ) -> Result<(), Self::Error> {
        for id in CoreId::ALL {
            thread_is_active(core_to_tid(id));
        }
        Ok(())
    }

    fn support_resume(&mut self) -> Option<MultiThreadResumeOps<'_, Self>> {
        Some(self)
    }

    fn support_thread_extra_info(&mut self) -> Option<ThreadExtraInfoOps<'_, Self>> {
        Some(self)
    }
}

impl MultiThreadResume for GdbTarget {
    fn resume(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn clear_resume_actions(&mut self) -> Result<(), Self::Error> {
        self.exec_mode = [None; 2];
        Ok(())
    }

    fn set_resume_action_continue(
        &mut self,
        tid: Tid,
        signal: Option<Signal>,
    ) -> Result<(), Self::Error> {
        if signal.is_some() {
            return Err("no support for continuing with signal");
        }

        self.exec_mode[Self::core_for(tid)?.index()] = Some(ExecMode::Continue);

        Ok(())
    }

    #[inline(always)]
    fn support_single_step(&mut self) -> Option<MultiThreadSingleStepOps<'_, Self>> {
        Some(self)
    }
}

impl MultiThreadSingleStep for GdbTarget {
    fn set_resume_action_step(
        &mut self,
        tid: Tid,
        signal: Option<Signal>,
    ) -> Result<(), Self::Error> {
        if signal.is_some() {
            return Err("no support for stepping with signal");
        }

        self.exec_mode[Self::core_for(tid)?.index()] = Some(ExecMode::Step);

        Ok(())
    }
}

impl target::ext::breakpoints::Breakpoints for GdbTarget {
    #[inline(always)]
    fn support_sw_breakpoint(
        &mut self,
    ) -> Option<target::ext::breakpoints::SwBreakpointOps<'_, Self>> {
        Some(self)
    }

    #[inline(always)]
    fn support_hw_watchpoint(
        &mut self,
    ) -> Option<target::ext::breakpoints::HwWatchpointOps<'_, Self>> {
        Some(self)
    }
}

impl target::ext::breakpoints::SwBreakpoint for GdbTarget {
    fn add_sw_breakpoint(
        &mut self,
        addr: u32,
        _kind: <Self::Arch as Arch>::BreakpointKind,
    ) -> TargetResult<bool, Self> {
        self.breakpoints.push(addr);
        Ok(true)
    }

    fn remove_sw_breakpoint(
        &mut self,
        addr: u32,
        _kind: <Self::Arch as Arch>::BreakpointKind,
    ) -> TargetResult<bool, Self> {
        match self.breakpoints.iter().position(|x| *x == addr) {
            None => return Ok(false),
            Some(pos) => self.breakpoints.remove(pos),
        };

        Ok(true)
    }
}

fn watch_kinds(kind: WatchKind) -> &'static [WatchPtrKind] {
    match kind {
        WatchKind::Write => &[WatchPtrKind::Write],
        WatchKind::Read => &[WatchPtrKind::Read],
        WatchKind::ReadWrite => &[WatchPtrKind::Read, WatchPtrKind::Write],
    }
}

impl target::ext::breakpoints::HwWatchpoint for GdbTarget {
    fn add_hw_watchpoint(
        &mut self,
        addr: u32,
        len: u32,
        kind: WatchKind,
    ) -> TargetResult<bool, Self> {
        for kind in watch_kinds(kind) {
            self.cpu.add_watchptr(addr, len, *kind);
        }

        Ok(true)
    }

    fn remove_hw_watchpoint(
        &mut self,
        addr: u32,
        len: u32,
        kind: WatchKind,
    ) -> TargetResult<bool, Self> {
        let mut removed = true;
        for kind in watch_kinds(kind) {
            removed &= self.cpu.remove_watchptr(addr, len, *kind);
        }

        Ok(removed)
    }
}

impl target::ext::monitor_cmd::MonitorCmd for GdbTarget {
    fn handle_monitor_cmd(
        &mut self,
        cmd: &[u8],
        mut out: ConsoleOutput<'_>,
    ) -> Result<(), Self::Error> {
        for line in self.exec_monitor_cmd(cmd).lines() {
            outputln!(out, "{}", line);
        }
        Ok(())
    }
}

impl ThreadExtraInfo for GdbTarget {
    fn thread_extra_info(&self, tid: Tid, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let id = Self::core_for(tid)?;
        let mut info = format!("{id} (CPU_ID {:#04x})", id.hw_id());
        if self.cpu.core(id).halted() {
            info.push_str(", halted");
        }

        let len = info.len().min(buf.len());
        buf[..len].copy_from_slice(&info.as_bytes()[..len]);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Program;
    use crate::{create_cpu, TEST_PROGRAM_ELF};
    use gdbstub::target::ext::breakpoints::{HwWatchpoint, SwBreakpoint};
    use gdbstub_arch::arm::ArmBreakpointKind;
    use mcemu_periph::StackLayout;

    const ENTRY: u32 = 0x5555_0000;
    const CPU: Tid = tid(1);
    const COP: Tid = tid(2);

    fn target(layout: StackLayout) -> GdbTarget {
        let program = Program::from_elf(TEST_PROGRAM_ELF).unwrap();
        GdbTarget::new(create_cpu(&program, layout, 24).unwrap())
    }

    fn continue_all(target: &mut GdbTarget) {
        target.clear_resume_actions().unwrap();
        target.set_resume_action_continue(CPU, None).unwrap();
        target.set_resume_action_continue(COP, None).unwrap();
    }

    fn stopped(event: RunEvent) -> MultiThreadStopReason<u32> {
        match event {
            RunEvent::Stopped(reason) => reason,
            RunEvent::IncomingData => panic!("unexpected incoming data"),
        }
    }

    #[test]
    fn test_thread_mapping() {
        assert_eq!(tid_to_core(CPU), Some(CoreId::Cpu));
        assert_eq!(tid_to_core(COP), Some(CoreId::Cop));
        assert_eq!(tid_to_core(tid(3)), None);
        assert_eq!(core_to_tid(CoreId::Cop), COP);

        let mut target = target(StackLayout::Split);
        let mut tids = vec![];
        target.list_active_threads(&mut |tid| tids.push(tid)).unwrap();
        assert_eq!(tids, vec![CPU, COP]);
    }

    #[test]
    fn test_read_registers() {
        let mut target = target(StackLayout::Split);
        let mut regs = ArmCoreRegs::default();
        assert!(target.read_registers(&mut regs, COP).is_ok());
        assert_eq!(regs.pc, ENTRY);
        assert_eq!(regs.sp, 0x0ff8_0000);
        assert_eq!(regs.lr, mcemu_cpu::HLE_RETURN_ADDR);
        assert_eq!(regs.cpsr & 0x1f, 0x10);

        assert!(matches!(
            target.read_registers(&mut regs, tid(7)),
            Err(TargetError::NonFatal)
        ));
    }

    #[test]
    fn test_write_registers() {
        let mut target = target(StackLayout::Split);
        let mut regs = ArmCoreRegs::default();
        assert!(target.read_registers(&mut regs, CPU).is_ok());
        regs.r[5] = 0x1234;
        regs.pc = ENTRY + 0x44;
        assert!(target.write_registers(&regs, CPU).is_ok());

        let core = target.cpu.core(CoreId::Cpu);
        assert_eq!(core.read_reg(5), Some(0x1234));
        assert_eq!(core.pc(), ENTRY + 0x44);
        assert_eq!(target.cpu.core(CoreId::Cop).read_reg(5), Some(0));
    }

    #[test]
    fn test_memory_access() {
        let mut target = target(StackLayout::Split);
        let mut data = [0u8; 4];
        assert!(target.read_addrs(ENTRY, &mut data, CPU).is_ok());
        assert_eq!(data, [0x00, 0x48, 0x2d, 0xe9]);

        assert!(target.write_addrs(0x0fff_fff0, &[1, 2, 3, 4], COP).is_ok());
        assert!(target.read_addrs(0x0fff_fff0, &mut data, CPU).is_ok());
        assert_eq!(data, [1, 2, 3, 4]);

        assert!(matches!(
            target.read_addrs(0x2000_0000, &mut data, CPU),
            Err(TargetError::NonFatal)
        ));
        assert!(matches!(
            target.write_addrs(0xffff_4200, &[0], CPU),
            Err(TargetError::NonFatal)
        ));
    }

    #[test]
    fn test_resume_actions() {
        let mut target = target(StackLayout::Split);
        assert_eq!(
            target.set_resume_action_continue(CPU, Some(Signal::SIGINT)),
            Err("no support for continuing with signal")
        );
        assert_eq!(
            target.set_resume_action_step(tid(9), None),
            Err("specified invalid core")
        );

        target.set_resume_action_step(COP, None).unwrap();
        target.set_resume_action_continue(CPU, None).unwrap();
        assert!(target.should_single_step());

        target.clear_resume_actions().unwrap();
        assert!(!target.should_single_step());
    }

    #[test]
    fn test_single_step_steps_whole_system() {
        let mut target = target(StackLayout::Split);
        target.clear_resume_actions().unwrap();
        target.set_resume_action_step(CPU, None).unwrap();

        let reason = stopped(target.run(|| panic!("single step must not poll")));
        assert!(matches!(reason, MultiThreadStopReason::DoneStep));
        assert_eq!(target.cpu.cycles(), 1);
        assert_eq!(target.cpu.core(CoreId::Cpu).pc(), ENTRY + 4);
    }

    #[test]
    fn test_continue_polls_for_data() {
        let mut target = target(StackLayout::Split);
        continue_all(&mut target);

        let mut polls = 0;
        let event = target.run(|| {
            polls += 1;
            polls == 3
        });
        assert!(matches!(event, RunEvent::IncomingData));
        assert_eq!(target.cpu.cycles(), 2 * POLL_INTERVAL);
    }

    #[test]
    fn test_sw_breakpoint() {
        let mut target = target(StackLayout::Split);
        // Counting path of the coprocessor
        let bkpt = ENTRY + 0x44;
        assert!(matches!(
            target.add_sw_breakpoint(bkpt, ArmBreakpointKind::Arm32),
            Ok(true)
        ));
        continue_all(&mut target);

        let reason = stopped(target.run(|| false));
        assert!(matches!(reason, MultiThreadStopReason::SwBreak(tid) if tid == COP));
        assert_eq!(target.cpu.core(CoreId::Cop).pc(), bkpt);

        assert!(matches!(
            target.remove_sw_breakpoint(bkpt, ArmBreakpointKind::Arm32),
            Ok(true)
        ));
        assert!(matches!(
            target.remove_sw_breakpoint(bkpt, ArmBreakpointKind::Arm32),
            Ok(false)
        ));
    }

    #[test]
    fn test_breakpoint_ignores_stalled_core() {
        let mut target = target(StackLayout::Split);
        assert!(matches!(
            target.add_sw_breakpoint(ENTRY + 4, ArmBreakpointKind::Arm32),
            Ok(true)
        ));
        continue_all(&mut target);

        let reason = stopped(target.run(|| false));
        assert!(matches!(reason, MultiThreadStopReason::SwBreak(tid) if tid == CPU));
        assert_eq!(target.cpu.cycles(), 1);

        // The coprocessor reaches the same address once its start delay ends
        let reason = stopped(target.run(|| false));
        assert!(matches!(reason, MultiThreadStopReason::SwBreak(tid) if tid == COP));
        assert_eq!(target.cpu.cycles(), 25);
    }

    #[test]
    fn test_breakpoint_in_same_step_as_watchpoint() {
        let program = Program::from_elf(TEST_PROGRAM_ELF).unwrap();
        // Both cores start together and execute the same instructions
        let mut target = GdbTarget::new(create_cpu(&program, StackLayout::Split, 0).unwrap());
        assert!(matches!(
            target.add_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::Write),
            Ok(true)
        ));
        // Instruction after the store to `done`
        assert!(matches!(
            target.add_sw_breakpoint(ENTRY + 0x14, ArmBreakpointKind::Arm32),
            Ok(true)
        ));
        continue_all(&mut target);

        // The CPU's store lands it on the breakpoint in the same step the
        // coprocessor's store hits the watchpoint
        let reason = stopped(target.run(|| false));
        assert!(matches!(
            reason,
            MultiThreadStopReason::Watch { tid, kind: WatchKind::Write, .. } if tid == COP
        ));
        assert_eq!(target.cpu.cycles(), 5);

        let reason = stopped(target.run(|| panic!("pending stop must not poll")));
        assert!(matches!(reason, MultiThreadStopReason::SwBreak(tid) if tid == CPU));
        assert_eq!(target.cpu.cycles(), 5);
        assert_eq!(target.cpu.core(CoreId::Cpu).pc(), ENTRY + 0x14);
    }

    #[test]
    fn test_remove_missing_watchpoint() {
        let mut target = target(StackLayout::Split);
        assert!(matches!(
            target.add_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::ReadWrite),
            Ok(true)
        ));
        assert!(matches!(
            target.remove_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::Write),
            Ok(true)
        ));
        // Only the read half is left, so the access watchpoint is not found
        assert!(matches!(
            target.remove_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::ReadWrite),
            Ok(false)
        ));
        assert!(matches!(
            target.remove_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::Read),
            Ok(false)
        ));
    }

    #[test]
    fn test_watchpoint() {
        let mut target = target(StackLayout::Split);
        // `done` of the coprocessor
        assert!(matches!(
            target.add_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::Write),
            Ok(true)
        ));
        continue_all(&mut target);

        let reason = stopped(target.run(|| false));
        assert!(matches!(
            reason,
            MultiThreadStopReason::Watch {
                tid,
                kind: WatchKind::Write,
                addr: 0x0ff7_fff4,
            } if tid == COP
        ));
        assert_eq!(target.cpu.core(CoreId::Cop).pc(), ENTRY + 0x10);

        assert!(matches!(
            target.remove_hw_watchpoint(0x0ff7_fff4, 4, WatchKind::Write),
            Ok(true)
        ));
        let mut polls = 0;
        let event = target.run(|| {
            polls += 1;
            polls > 10
        });
        assert!(matches!(event, RunEvent::IncomingData));
    }

    #[test]
    fn test_interrupt_then_release_waiting_core() {
        let mut target = target(StackLayout::Split);
        continue_all(&mut target);

        // Let the coprocessor finish counting, then interrupt
        let mut polls = 0;
        let event = target.run(|| {
            polls += 1;
            polls > 400
        });
        assert!(matches!(event, RunEvent::IncomingData));
        assert_eq!(target.cpu.core(CoreId::Cop).pc(), ENTRY + 0x7c);

        let mut data = [0u8; 4];
        assert!(target.read_addrs(0x0ff7_fff0, &mut data, COP).is_ok());
        assert_eq!(u32::from_le_bytes(data), 32768);

        // Set `done` of the waiting core by hand
        assert!(target
            .write_addrs(0x0fff_fff4, &1u32.to_le_bytes(), CPU)
            .is_ok());
        let reason = stopped(target.run(|| false));
        assert!(matches!(reason, MultiThreadStopReason::Exited(0)));
    }

    #[test]
    fn test_shared_stack_exit_code() {
        let mut target = target(StackLayout::Shared);
        continue_all(&mut target);
        let reason = stopped(target.run(|| false));
        // 32768 truncated to the 8-bit exit status
        assert!(matches!(reason, MultiThreadStopReason::Exited(0)));
        assert_eq!(target.cpu.core(CoreId::Cpu).read_reg(0), Some(32768));
    }

    #[test]
    fn test_monitor_cmds() {
        let mut target = target(StackLayout::Split);
        assert_eq!(target.exec_monitor_cmd(b"ping"), "pong!\n");
        assert_eq!(
            target.exec_monitor_cmd(b""),
            "Sorry, didn't catch that. Try `monitor ping`!\n"
        );
        assert_eq!(
            target.exec_monitor_cmd(b"frobnicate"),
            "I don't know how to handle 'frobnicate'\n"
        );
        assert_eq!(
            target.exec_monitor_cmd(&[0xff, 0xfe]),
            "command must be valid UTF-8\n"
        );

        target.clear_resume_actions().unwrap();
        target.set_resume_action_step(CPU, None).unwrap();
        for _ in 0..3 {
            target.run(|| false);
        }
        assert_eq!(
            target.exec_monitor_cmd(b"cycles"),
            "3 system steps since reset\n"
        );

        let cores = target.exec_monitor_cmd(b"cores");
        let lines: Vec<_> = cores.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "CPU (tid 1): pc=0x5555000c r0=0x0 cpsr=nzcv arm User instructions=3 running"
        );
        assert!(lines[1].starts_with("COP (tid 2): pc=0x55550000"));
        assert!(lines[1].ends_with("instructions=0 stalled"));

        assert_eq!(target.exec_monitor_cmd(b"reset"), "both cores reset\n");
        assert_eq!(target.cpu.cycles(), 0);
        assert_eq!(target.cpu.core(CoreId::Cpu).pc(), ENTRY);
    }

    #[test]
    fn test_thread_extra_info() {
        let mut target = target(StackLayout::Shared);
        let mut buf = [0u8; 64];
        let len = target.thread_extra_info(COP, &mut buf).unwrap();
        assert_eq!(&buf[..len], b"COP (CPU_ID 0x55)");

        continue_all(&mut target);
        stopped(target.run(|| false));
        let len = target.thread_extra_info(CPU, &mut buf).unwrap();
        assert_eq!(&buf[..len], b"CPU (CPU_ID 0xaa), halted");

        let mut short = [0u8; 3];
        assert_eq!(target.thread_extra_info(CPU, &mut short), Ok(3));
        assert_eq!(&short, b"CPU");
        assert_eq!(
            target.thread_extra_info(tid(5), &mut buf),
            Err("specified invalid core")
        );
    }

    #[test]
    fn test_into_cpu_drops_watchpoints() {
        let mut target = target(StackLayout::Shared);
        assert!(matches!(
            target.add_hw_watchpoint(0x0fff_fff4, 4, WatchKind::ReadWrite),
            Ok(true)
        ));
        let mut cpu = target.into_cpu();
        let mut event = None;
        while event.is_none() {
            event = cpu.step(None);
        }
        assert_eq!(event, Some((CoreId::Cpu, StepAction::Halted)));
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    arm_core.rs

Abstract:

    File contains a single ARMv4T core and its register access helpers.

--*/

use crate::types::Cpsr;
use armv4t_emu::{reg, Memory, Mode};
use mcemu_types::{ArmData, CoreId};

/// Link register value installed at reset. A core whose PC reaches this
/// address has returned from its entry routine.
pub const HLE_RETURN_ADDR: u32 = 0x1234_5678;

/// User mode with IRQ and FIQ enabled, ARM state
const CPSR_RESET_VAL: u32 = 0x10;

/// One ARMv4T core. Instruction decode and execution are delegated to
/// `armv4t_emu`.
pub struct ArmCore {
    id: CoreId,
    cpu: armv4t_emu::Cpu,
    halted: bool,
    cycles: u64,
}

impl ArmCore {
    /// Number of registers addressable through `read_reg`/`write_reg`
    pub const NUM_REGS: u8 = 17;

    pub fn new(id: CoreId, entry: u32, sp: u32) -> Self {
        let mut core = Self {
            id,
            cpu: armv4t_emu::Cpu::new(),
            halted: false,
            cycles: 0,
        };
        core.reset(entry, sp);
        core
    }

    /// Put the core back in its start state: user mode, `PC = entry`,
    /// `SP = sp`, `LR = HLE_RETURN_ADDR`.
    pub fn reset(&mut self, entry: u32, sp: u32) {
        self.cpu = armv4t_emu::Cpu::new();
        self.cpu.reg_set(Mode::User, reg::SP, sp);
        self.cpu.reg_set(Mode::User, reg::LR, HLE_RETURN_ADDR);
        self.cpu.reg_set(Mode::User, reg::PC, entry);
        self.cpu.reg_set(Mode::User, reg::CPSR, CPSR_RESET_VAL);
        self.halted = false;
        self.cycles = 0;
    }

    pub fn id(&self) -> CoreId {
        self.id
    }

    /// Read register `n` of the current mode's bank. 0..=12 are the general
    /// purpose registers, then SP, LR, PC and CPSR.
    pub fn read_reg(&self, n: u8) -> Option<ArmData> {
        (n < Self::NUM_REGS).then(|| self.cpu.reg_get(self.cpu.mode(), n))
    }

    /// Write register `n` of the current mode's bank. Returns false if `n`
    /// does not name a register.
    pub fn write_reg(&mut self, n: u8, val: ArmData) -> bool {
        if n >= Self::NUM_REGS {
            return false;
        }
        let mode = self.cpu.mode();
        self.cpu.reg_set(mode, n, val);
        true
    }

    pub fn pc(&self) -> u32 {
        self.cpu.reg_get(self.cpu.mode(), reg::PC)
    }

    pub fn set_pc(&mut self, pc: u32) {
        let mode = self.cpu.mode();
        self.cpu.reg_set(mode, reg::PC, pc);
    }

    pub fn cpsr(&self) -> Cpsr {
        Cpsr(self.cpu.reg_get(self.cpu.mode(), reg::CPSR))
    }

    pub fn thumb_mode(&self) -> bool {
        self.cpu.thumb_mode()
    }

    /// True once the core has returned to `HLE_RETURN_ADDR`
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Instructions executed since reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Execute one instruction. Returns false without executing if the core
    /// is halted.
    pub(crate) fn step(&mut self, mem: &mut impl Memory) -> bool {
        if self.halted {
            return false;
        }
        self.cpu.step(mem);
        self.cycles += 1;
        if self.pc() == HLE_RETURN_ADDR {
            log::debug!("{} returned, r0={:#x}", self.id, self.cpu.reg_get(Mode::User, 0));
            self.halted = true;
        }
        true
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the dual-core ARMv4T emulator.

--*/

mod cli;
mod gdb;
mod loader;

use crate::gdb::gdb_state::{self, Listen};
use crate::gdb::gdb_target::GdbTarget;
use crate::loader::Program;
use anyhow::{bail, Context};
use clap::Parser;
use gdbstub::stub::DisconnectReason;
use mcemu_cpu::{ArmInstr, BusFault, Cpu, CpuArgs, InstrTracer, StepAction};
use mcemu_periph::{SocBus, SocBusArgs, StackLayout};
use mcemu_types::CoreId;
use simple_logger::SimpleLogger;
use std::fs::File;
use std::io::{BufWriter, Write};

/// CPU_ID test program, run when no image is given
pub(crate) static TEST_PROGRAM_ELF: &[u8] = include_bytes!("../../test_bin/test.elf");

/// Build the SoC, load `program` and point both cores at its entry
pub(crate) fn create_cpu(
    program: &Program,
    layout: StackLayout,
    cop_start_delay: u32,
) -> anyhow::Result<Cpu<SocBus>> {
    let mut bus = SocBus::new(SocBusArgs::default()).context("Failed to build memory map")?;
    program.load_into(&mut bus)?;

    let stack_tops = CoreId::ALL.map(|id| bus.stack_top(id, layout));
    log::info!(
        "{layout:?} stacks: CPU sp={:#010x}, COP sp={:#010x}",
        stack_tops[0],
        stack_tops[1]
    );

    Ok(Cpu::new(
        bus,
        CpuArgs {
            entry: program.entry,
            stack_tops,
            cop_start_delay,
        },
    ))
}

/// How a free run ended
#[derive(Debug, PartialEq, Eq)]
enum RunOutcome {
    /// A core returned from the entry routine
    Returned { core: CoreId, value: u32 },

    Fault(BusFault),

    /// The system step limit was reached
    CycleLimit,
}

// CPU Main Loop (free_run no GDB)
fn free_run(
    cpu: &mut Cpu<SocBus>,
    mut instr_tracer: Option<&mut InstrTracer>,
    max_cycles: Option<u64>,
) -> RunOutcome {
    loop {
        if max_cycles.is_some_and(|max| cpu.cycles() >= max) {
            return RunOutcome::CycleLimit;
        }

        match cpu.step(instr_tracer.as_deref_mut()) {
            None | Some((_, StepAction::Continue | StepAction::Break)) => continue,
            Some((core, StepAction::Halted)) => {
                let value = cpu.core(core).read_reg(0).unwrap_or_default();
                return RunOutcome::Returned { core, value };
            }
            Some((_, StepAction::Fatal)) => {
                if let Some(fault) = cpu.fault() {
                    return RunOutcome::Fault(*fault);
                }
            }
        }
    }
}

fn write_trace(
    out: &mut impl Write,
    core: CoreId,
    pc: u32,
    instr: ArmInstr,
) -> std::io::Result<()> {
    writeln!(out, "{core} 0x{pc:08x} {instr}")
}

fn run_to_completion(cpu: &mut Cpu<SocBus>, args: &cli::Args) -> anyhow::Result<RunOutcome> {
    let outcome = match &args.trace {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create trace file {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let tracer: &mut InstrTracer = &mut |core, pc, instr| {
                let _ = write_trace(&mut out, core, pc, instr);
            };
            let outcome = free_run(cpu, Some(tracer), args.max_cycles);
            out.flush()?;
            outcome
        }
        None => free_run(cpu, None, args.max_cycles),
    };
    Ok(outcome)
}

fn report(cpu: &Cpu<SocBus>, outcome: RunOutcome) -> anyhow::Result<()> {
    match outcome {
        RunOutcome::Returned { core, value } => {
            println!("Program completed on {core}. Return value: {value}");
        }
        RunOutcome::CycleLimit => {
            println!("Stopped after {} system steps", cpu.cycles());
            for id in CoreId::ALL {
                let core = cpu.core(id);
                println!(
                    "{id}: pc=0x{:08x} r0={}",
                    core.pc(),
                    core.read_reg(0).unwrap_or_default()
                );
            }
        }
        RunOutcome::Fault(fault) => bail!("Emulation stopped: {fault}"),
    }
    Ok(())
}

fn listen_addr(args: &cli::Args) -> Option<Listen> {
    #[cfg(unix)]
    if let Some(path) = &args.uds {
        return Some(Listen::Uds(path.clone()));
    }
    args.gdb_port.map(Listen::Tcp)
}

fn load_program(args: &cli::Args) -> anyhow::Result<Program> {
    let Some(path) = &args.image else {
        log::info!("no image given, running the built-in CPU_ID test program");
        return Program::from_elf(TEST_PROGRAM_ELF);
    };

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match args.load_addr {
        Some(load_addr) => Ok(Program::from_raw(&bytes, load_addr)),
        None => Program::from_elf(&bytes)
            .with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let _ = SimpleLogger::new().with_level(args.log_level).init();

    let program = load_program(&args)?;
    let layout = match args.shared_stack {
        true => StackLayout::Shared,
        false => StackLayout::Split,
    };
    let mut cpu = create_cpu(&program, layout, args.cop_start_delay)?;

    // Check if Optional GDB connection is requested
    if let Some(listen) = listen_addr(&args) {
        let mut gdb_target = GdbTarget::new(cpu);
        let reason = gdb_state::wait_for_gdb_run(&mut gdb_target, listen)?;
        if !matches!(reason, DisconnectReason::Disconnect) {
            return Ok(());
        }

        log::info!("resuming free run");
        cpu = gdb_target.into_cpu();
    }

    let outcome = run_to_completion(&mut cpu, &args)?;
    report(&cpu, outcome)
}

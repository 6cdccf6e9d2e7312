/*++

Licensed under the Apache-2.0 license.

File Name:

    loader.rs

Abstract:

    File contains loading of program images into the SoC memory map.

--*/

use anyhow::{bail, Context};
use elf::abi::{EM_ARM, PT_LOAD};
use elf::endian::AnyEndian;
use elf::file::Class;
use elf::ElfBytes;
use mcemu_periph::SocBus;

/// Contiguous bytes placed at a fixed address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub addr: u32,
    pub data: Vec<u8>,
}

/// Program image ready to be copied into memory
#[derive(Debug, Clone)]
pub struct Program {
    pub segments: Vec<Segment>,
    pub entry: u32,
}

impl Program {
    /// Parse a 32-bit little-endian ARM executable. Every non-empty `PT_LOAD`
    /// segment is placed at its physical address, zero-filled up to its
    /// in-memory size.
    pub fn from_elf(elf_bytes: &[u8]) -> anyhow::Result<Self> {
        let elf_file = ElfBytes::<AnyEndian>::minimal_parse(elf_bytes)
            .with_context(|| "Failed to parse elf file")?;

        if !matches!(elf_file.ehdr.class, Class::ELF32) {
            bail!("ELF file is not 32-bit");
        }
        if !matches!(elf_file.ehdr.endianness, AnyEndian::Little) {
            bail!("ELF file is not little-endian");
        }
        if elf_file.ehdr.e_machine != EM_ARM {
            bail!(
                "ELF file targets machine {}, expected ARM ({EM_ARM})",
                elf_file.ehdr.e_machine
            );
        }

        let Some(phdrs) = elf_file.segments() else {
            bail!("ELF file has no segments");
        };

        let mut segments = vec![];
        for phdr in phdrs.iter().filter(|p| p.p_type == PT_LOAD) {
            if phdr.p_memsz == 0 {
                continue;
            }
            let mut data = elf_file
                .segment_data(&phdr)
                .with_context(|| format!("Failed to read segment at {:#010x}", phdr.p_paddr))?
                .to_vec();
            data.resize(usize::try_from(phdr.p_memsz)?, 0);
            segments.push(Segment {
                addr: u32::try_from(phdr.p_paddr)?,
                data,
            });
        }
        if segments.is_empty() {
            bail!("ELF file has no LOAD segments");
        }

        Ok(Self {
            segments,
            entry: u32::try_from(elf_file.ehdr.e_entry)?,
        })
    }

    /// Treat `bytes` as a flat image that starts executing at its first byte
    pub fn from_raw(bytes: &[u8], load_addr: u32) -> Self {
        Self {
            segments: vec![Segment {
                addr: load_addr,
                data: bytes.to_vec(),
            }],
            entry: load_addr,
        }
    }

    /// Copy every segment into `bus`
    pub fn load_into(&self, bus: &mut SocBus) -> anyhow::Result<()> {
        for segment in &self.segments {
            log::info!(
                "loading {:#x} bytes into {} at {:#010x}",
                segment.data.len(),
                bus.region_name(segment.addr).unwrap_or("unmapped memory"),
                segment.addr
            );
            if let Err(addr) = bus.load(segment.addr, &segment.data) {
                bail!(
                    "Segment at {:#010x} ({:#x} bytes) does not fit in memory: {addr:#010x} is not writable",
                    segment.addr,
                    segment.data.len()
                );
            }
        }
        log::info!("entry point {:#010x}", self.entry);
        Ok(())
    }
}

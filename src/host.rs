/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! This module defines the interfaces between a host and the Cpu.
#[cfg(feature = "std")] use core::fmt;
use crate::opconsts::RST_38H_OPCODE;

/// The T-state building blocks of the Z80 machine cycles.
pub mod cycles {
    /// An op-code fetch (M1) cycle T-states.
    pub const M1_CYCLE: u32 = 4;
    /// A memory read/write cycle T-states.
    pub const MEMRW_CYCLE: u32 = 3;
    /// A total number of T-states for an I/O cycle.
    pub const IO_CYCLE: u32 = 4;
    /// Internal delay of computing the `(IX+d)` or `(IY+d)` address after the displacement fetch.
    pub const INDEX_DELAY: u32 = 5;
    /// A discarded `0xDD` or `0xFD` prefix fetch.
    pub const PREFIX_CYCLE: u32 = 4;
    /// A single HALT cycle: a NOP-like fetch repeated while the Cpu is halted.
    pub const HALT_CYCLE: u32 = 4;
    /// A maskable interrupt acknowledge cycle T-states (M1 with 2 extra wait states).
    pub const IRQ_CYCLE: u32 = 6;
    /// A non-maskable interrupt response: the dummy M1 fetch, an internal T-state and the PC push.
    pub const NMI_CYCLE: u32 = M1_CYCLE + 1 + 2 * MEMRW_CYCLE;
    /// The maskable interrupt response in mode 1.
    pub const IM1_CYCLE: u32 = IRQ_CYCLE + 1 + 2 * MEMRW_CYCLE;
    /// The maskable interrupt response in mode 2, including the vector read.
    pub const IM2_CYCLE: u32 = IRQ_CYCLE + 1 + 4 * MEMRW_CYCLE;
    /// Mode 0 response adds this many T-states to the cost of the instruction put on the bus.
    pub const IM0_EXTRA: u32 = IRQ_CYCLE - M1_CYCLE;
}

/// An interface to the memory.
pub trait Memory {
    /// Used by the Cpu to read from the memory.
    /// For the M1 cycles (op-code fetches) [Memory::read_opcode] is used instead.
    fn read_mem(&self, addr: u16) -> u8;
    /// Used by the Cpu to read 2 bytes of memory in LE order.
    #[inline]
    fn read_mem16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read_mem(addr), self.read_mem(addr.wrapping_add(1))])
    }
    /// Used by the Cpu for writing to the memory. The default implementation ignores writes
    /// as a ROM would.
    #[inline]
    fn write_mem(&mut self, _addr: u16, _value: u8) {}
    /// Used by the Cpu during M1 cycle for reading op-code. `ir` is the memory refresh
    /// address put on the bus afterwards.
    ///
    /// Can be used for ROM traps etc.
    #[inline]
    fn read_opcode(&mut self, pc: u16, _ir: u16) -> u8 {
        self.read_mem(pc)
    }
}

/// I/O operations.
pub trait Io {
    /// Used by the Cpu to read data from the I/O port. The default returns an idle bus value.
    #[inline]
    fn read_io(&mut self, _port: u16) -> u8 { 0xFF }
    /// Used by the Cpu to write data to the I/O port.
    #[inline]
    fn write_io(&mut self, _port: u16, _data: u8) {}
    /// The byte an interrupting device puts on the data bus while the interrupt is being acknowledged.
    ///
    /// Mode 0 executes it as an op-code, mode 2 uses it as the low byte of the vector address.
    #[inline]
    fn irq_data(&mut self, _pc: u16) -> u8 { RST_38H_OPCODE }
    /// Called when a `RETI` instruction is being executed, before the return address is popped,
    /// so a daisy chain controller can set up another interrupt if necessary.
    /// The given address points immediately after the `RETI` op-code.
    #[inline]
    fn reti(&mut self, _address: u16) {}
}

/// The whole host side of the Cpu as seen by the instruction handlers.
pub trait Bus: Memory + Io {}

impl<T: Memory + Io + ?Sized> Bus for T {}

/// A flat 64 KiB RAM together with a 64 K I/O port latch.
///
/// Values written to ports are latched and returned by subsequent reads of the same port.
#[cfg(feature = "std")]
#[derive(Clone, PartialEq, Eq)]
pub struct Ram64 {
    mem: Box<[u8]>,
    ports: Box<[u8]>,
    /// The byte put on the data bus while acknowledging an interrupt.
    pub bus_data: u8,
    /// The address following the most recently executed `RETI`.
    pub last_reti: Option<u16>,
}

#[cfg(feature = "std")]
impl Default for Ram64 {
    fn default() -> Self {
        Ram64 {
            mem: vec![0; 0x10000].into_boxed_slice(),
            ports: vec![0xFF; 0x10000].into_boxed_slice(),
            bus_data: RST_38H_OPCODE,
            last_reti: None
        }
    }
}

#[cfg(feature = "std")]
impl fmt::Debug for Ram64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ram64")
         .field("bus_data", &self.bus_data)
         .field("last_reti", &self.last_reti)
         .finish_non_exhaustive()
    }
}

#[cfg(feature = "std")]
impl Ram64 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates memory with `code` loaded at `org`.
    pub fn with_code(org: u16, code: &[u8]) -> Self {
        let mut ram = Self::default();
        ram.load(org, code);
        ram
    }

    /// Copies `code` into memory at `org`, wrapping around the end of the address space.
    pub fn load(&mut self, org: u16, code: &[u8]) {
        let mut addr = org;
        for &byte in code {
            self.mem[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    pub fn mem(&self) -> &[u8] {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }

    /// Returns the value latched at `port`.
    pub fn port(&self, port: u16) -> u8 {
        self.ports[port as usize]
    }

    pub fn set_port(&mut self, port: u16, data: u8) {
        self.ports[port as usize] = data;
    }
}

#[cfg(feature = "std")]
impl Memory for Ram64 {
    #[inline]
    fn read_mem(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    #[inline]
    fn write_mem(&mut self, addr: u16, value: u8) {
        self.mem[addr as usize] = value;
    }
}

#[cfg(feature = "std")]
impl Io for Ram64 {
    #[inline]
    fn read_io(&mut self, port: u16) -> u8 {
        self.ports[port as usize]
    }

    #[inline]
    fn write_io(&mut self, port: u16, data: u8) {
        self.ports[port as usize] = data;
    }

    fn irq_data(&mut self, _pc: u16) -> u8 {
        self.bus_data
    }

    fn reti(&mut self, address: u16) {
        self.last_reti = Some(address);
    }
}

/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    z80core is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    z80core is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
/*! # Z80 core

`z80core` crate provides a ZiLOG Z80 Cpu core exact to the instruction and to the T-state,
for the home computer emulators to be built upon.

```text
  _______
=|       |=
=|       |=                    ___________
=|  Cpu  |=                   |           |
=|       |= \                 |           |
=|  Z80  |= <--------------> =|    Bus    |=:::::
=|       |= /                 |           |
=|       |=                   |___________|
=|_______|=
```

The emulated computer drives the [Z80] by calling [Z80::step] repeatedly. Each step executes
a single instruction (or accepts an interrupt, or idles in the halted state) and returns
the number of T-states it took. The Cpu also keeps the total count of T-states, which other
emulated devices can schedule themselves against.

The Cpu accesses the rest of the computer via the [Bus] trait, which is a combination of
the [Memory] and [Io] traits. Only [Memory::read_mem] is required to be implemented, the rest
of the methods have reasonable defaults. A flat 64 KiB RAM, [host::Ram64], is provided as
a reference implementation.

Instructions are dispatched via [op-code tables](z80::tables), one for each op-code universe
selected by the prefixes: unprefixed, `CB`, `ED`, `DD`, `FD`, `DD CB` and `FD CB`. An index
prefix followed by an op-code without an indexed form executes the unprefixed instruction,
adding 4 T-states for the ignored prefix.

Run time selectable behaviour is described by [CpuConfig].

## Logging

The crate logs via the [log](https://crates.io/crates/log) facade. Debug builds trace each
executed instruction with the `Trace` level.

## Example

```
use z80core::*;
use host::Ram64;

// Computes the 10th Fibonacci number in A.
let code = [
    0x06, 0x09,       // LD   B,9
    0x3E, 0x01,       // LD   A,1
    0x0E, 0x00,       // LD   C,0
    0x51,             // LD   D,C   ; loop:
    0x4F,             // LD   C,A
    0x82,             // ADD  A,D
    0x10, 0xFB,       // DJNZ loop
    0x76              // HALT
];
let mut ram = Ram64::with_code(0, &code);
let mut cpu = Z80::new();
while !cpu.is_halt() {
    cpu.step(&mut ram);
}
assert_eq!(cpu.get_acc(), 55);
assert_eq!(cpu.get_pc(), code.len() as u16);
assert_eq!(cpu.tacts(), 7 + 7 + 7 + 9*(4 + 4 + 4) + 8*13 + 8 + 4);
```
*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod cpu;
pub mod host;
pub mod z80;

pub use cpu::*;
pub use host::{Bus, Io, Memory};
pub use z80::{Z80, CpuConfig, EiPolicy, Flavour};

/// An address of the NMI routine.
pub const NMI_RESTART: u16 = 0x66;

/// Selected Z80 op-codes.
///
/// For example a convenient return value from [Io::irq_data].
pub mod opconsts {
    #[allow(unused_imports)]
    use crate::Prefix;
    /// Bit instructions op-code prefix.
    pub const CB_PREFIX     : u8 = 0xCB;
    /// Extended op-code prefix.
    pub const ED_PREFIX     : u8 = 0xED;
    /// [Prefix::Xdd] prefix.
    pub const DD_PREFIX     : u8 = 0xDD;
    /// [Prefix::Yfd] prefix.
    pub const FD_PREFIX     : u8 = 0xFD;
    /// No operation.
    pub const NOP_OPCODE    : u8 = 0x00;
    /// Halt execution.
    pub const HALT_OPCODE   : u8 = 0x76;
    /// Disable interrupts.
    pub const DI_OPCODE     : u8 = 0xF3;
    /// Enable interrupts.
    pub const EI_OPCODE     : u8 = 0xFB;
    /// Return from subroutine.
    pub const RET_OPCODE    : u8 = 0xC9;
    /// The documented `RETI` op-code.
    pub const RETI_OPCODE_T2: (u8, u8) = (ED_PREFIX, 0x4D);
    /// The documented `RETN` op-code.
    pub const RETN_OPCODE_T2: (u8, u8) = (ED_PREFIX, 0x45);
    /// Call a subroutine.
    pub const CALL_OPCODE   : u8 = 0xCD;
    /// Branch to an absolute address.
    pub const JP_OPCODE     : u8 = 0xC3;
    /// Branch to a relative address.
    pub const JR_OPCODE     : u8 = 0x18;
    /// Decrement `B` and branch to a relative address unless `B=0`.
    pub const DJNZ_OPCODE   : u8 = 0x10;
    /// Call a system subroutine at `0x00`.
    pub const RST_00H_OPCODE: u8 = 0xC7;
    /// Call a system subroutine at `0x08`.
    pub const RST_08H_OPCODE: u8 = 0xCF;
    /// Call a system subroutine at `0x10`.
    pub const RST_10H_OPCODE: u8 = 0xD7;
    /// Call a system subroutine at `0x18`.
    pub const RST_18H_OPCODE: u8 = 0xDF;
    /// Call a system subroutine at `0x20`.
    pub const RST_20H_OPCODE: u8 = 0xE7;
    /// Call a system subroutine at `0x28`.
    pub const RST_28H_OPCODE: u8 = 0xEF;
    /// Call a system subroutine at `0x30`.
    pub const RST_30H_OPCODE: u8 = 0xF7;
    /// Call a system subroutine at `0x38`.
    pub const RST_38H_OPCODE: u8 = 0xFF;
    /// The target of `RST 38h` and of the interrupt in mode 1.
    pub const RST_38H_ADDRESS: u16 = 0x38;
}

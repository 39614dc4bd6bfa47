/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! Op-code dispatch tables.
//!
//! There is a separate table of 256 entries for each op-code universe: unprefixed, `CB`, `ED`,
//! `DD`, `FD`, `DD CB` and `FD CB`. The tables are computed at compile time.
//!
//! Each entry declares the total number of T-states the instruction takes, including all of its
//! prefix and op-code fetches, when no conditional extra is involved. Handlers only report
//! the T-states added on a taken branch or a repeated block operation.
//!
//! Entries of the index tables that have no indexed form are copies of the unprefixed entries
//! with 4 extra T-states for the ignored prefix fetch. They are marked as fallbacks.
use core::convert::TryFrom;
use core::fmt;

use crate::cpu::Prefix;
use crate::host::{Bus, cycles::*};
use super::Z80;
use super::internal::{HlReg, Hl, Ix, Iy};

/// The signature of instruction handlers.
///
/// The third argument is the op-code itself. The returned value is the number of T-states
/// to be added to the cost declared by the table entry.
pub(crate) type Handler = fn(&mut Z80, &mut dyn Bus, u8) -> u32;

/// An ignored index prefix fetch.
const PREFIX: u8 = PREFIX_CYCLE as u8;
/// `ED` op-code fetches followed by an I/O cycle.
const ED_IO: u8 = (2 * M1_CYCLE + IO_CYCLE) as u8;
/// A prefixed op-code fetch, the displacement read, the address computation and a memory access.
const INDEXED: u8 = (2 * M1_CYCLE + 2 * MEMRW_CYCLE + INDEX_DELAY) as u8;
/// [INDEXED] followed by an internal cycle and a memory write.
const INDEXED_RMW: u8 = INDEXED + 1 + MEMRW_CYCLE as u8;

/// How the instruction accesses its operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddrMode {
    /// No operands or the operands are implied by the op-code.
    Implied,
    /// Register operands only.
    Register,
    /// An 8-bit immediate operand follows the op-code.
    Immediate,
    /// A 16-bit immediate operand follows the op-code.
    ImmediateExtended,
    /// A signed displacement relative to PC follows the op-code.
    Relative,
    /// Memory addressed by a register pair.
    RegisterIndirect,
    /// Memory addressed by a 16-bit immediate address.
    Extended,
    /// Memory addressed by an index register and a displacement.
    Indexed(Prefix),
    /// An index register or one of its halves.
    IndexRegister(Prefix),
    /// An I/O port.
    Port,
    /// A prefix: the instruction continues in another table.
    Escape
}

/// A single entry of an op-code table.
#[derive(Clone, Copy)]
pub struct Opcode {
    pub(crate) exec: Handler,
    tacts: u8,
    mode: AddrMode,
    mnemonic: &'static str,
    fallback: bool
}

impl Opcode {
    /// The number of T-states declared for the instruction.
    ///
    /// For conditional instructions this is the cost of the not taken path.
    /// Escape entries declare 0, the cost is declared by the entry of the next table.
    #[inline]
    pub fn tacts(&self) -> u32 {
        self.tacts as u32
    }

    #[inline]
    pub fn mode(&self) -> AddrMode {
        self.mode
    }

    /// The instruction mnemonic without operands.
    #[inline]
    pub fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    /// Returns `true` if this index table entry executes the unprefixed instruction.
    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opcode")
         .field("tacts", &self.tacts)
         .field("mode", &self.mode)
         .field("mnemonic", &self.mnemonic)
         .field("fallback", &self.fallback)
         .finish()
    }
}

/// Op-code universes selected by the op-code prefixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Universe {
    Main,
    Cb,
    Ed,
    Dd,
    Fd,
    DdCb,
    FdCb
}

/// Converts a sequence of prefix bytes into the op-code universe.
impl TryFrom<&[u8]> for Universe {
    type Error = ();

    fn try_from(prefix: &[u8]) -> Result<Self, Self::Error> {
        match prefix {
            []           => Ok(Universe::Main),
            [0xCB]       => Ok(Universe::Cb),
            [0xED]       => Ok(Universe::Ed),
            [0xDD]       => Ok(Universe::Dd),
            [0xFD]       => Ok(Universe::Fd),
            [0xDD, 0xCB] => Ok(Universe::DdCb),
            [0xFD, 0xCB] => Ok(Universe::FdCb),
            _ => Err(())
        }
    }
}

/// Returns the table entry of `code` in the given universe.
pub fn opcode(universe: Universe, code: u8) -> &'static Opcode {
    let table = match universe {
        Universe::Main => &MAIN,
        Universe::Cb   => &CB,
        Universe::Ed   => &ED,
        Universe::Dd   => &DD,
        Universe::Fd   => &FD,
        Universe::DdCb => &DDCB,
        Universe::FdCb => &FDCB,
    };
    &table[code as usize]
}

/// Resolves a complete sequence of op-code bytes into the table entry of its last op-code.
///
/// The sequence is what [Z80::last_opcodes] returns, so the `DD CB d op` form is recognized
/// with its displacement byte.
pub fn resolve(bytes: &[u8]) -> Option<&'static Opcode> {
    let (prefix, code) = match bytes {
        [0xDD|0xFD, 0xCB, _, code] => (&bytes[..2], *code),
        [prefix @ .., code] => (prefix, *code),
        [] => return None
    };
    Universe::try_from(prefix).ok().map(|universe| opcode(universe, code))
}

const ALU: [&str; 8] = ["ADD", "ADC", "SUB", "SBC", "AND", "XOR", "OR", "CP"];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
const ACC: [&str; 8] = ["RLCA", "RRCA", "RLA", "RRA", "DAA", "CPL", "SCF", "CCF"];
const BLOCK: [[&str; 4]; 4] = [["LDI",  "CPI",  "INI",  "OUTI"],
                               ["LDD",  "CPD",  "IND",  "OUTD"],
                               ["LDIR", "CPIR", "INIR", "OTIR"],
                               ["LDDR", "CPDR", "INDR", "OTDR"]];

const fn op(exec: Handler, tacts: u8, mode: AddrMode, mnemonic: &'static str) -> Opcode {
    Opcode { exec, tacts, mode, mnemonic, fallback: false }
}

const NOP: Opcode = op(Z80::instr_nop, 4, AddrMode::Implied, "NOP");

macro_rules! opcode_table {
    ($entry:ident) => {{
        let mut table = [NOP; 256];
        let mut code = 0;
        while code < 256 {
            table[code] = $entry(code as u8);
            code += 1;
        }
        table
    }};
}

pub(crate) static MAIN: [Opcode; 256] = opcode_table!(main_entry);
pub(crate) static CB: [Opcode; 256] = opcode_table!(cb_entry);
pub(crate) static ED: [Opcode; 256] = opcode_table!(ed_entry);
pub(crate) static DD: [Opcode; 256] = opcode_table!(dd_entry);
pub(crate) static FD: [Opcode; 256] = opcode_table!(fd_entry);
pub(crate) static DDCB: [Opcode; 256] = opcode_table!(ddcb_entry);
pub(crate) static FDCB: [Opcode; 256] = opcode_table!(fdcb_entry);

/*
    The op-code bits are decoded as follows:

    | x x | y y y | z z z |
            p p q
*/
const fn main_entry(code: u8) -> Opcode {
    use AddrMode::*;
    let (x, y, z) = (code >> 6, (code >> 3) & 7, code & 7);
    let (p, q) = (y >> 1, y & 1);
    match x {
        0 => match z {
            0 => match y {
                0 => NOP,
                1 => op(Z80::instr_ex_af_af, 4, Register, "EX"),
                2 => op(Z80::instr_djnz, 8, Relative, "DJNZ"),
                3 => op(Z80::instr_jr, 12, Relative, "JR"),
                _ => op(Z80::instr_jr_cc, 7, Relative, "JR"),
            },
            1 if q == 0 => op(Z80::instr_ld_rr_nn::<Hl>, 10, ImmediateExtended, "LD"),
            1 => op(Z80::instr_add_hl_rr::<Hl>, 11, Register, "ADD"),
            2 => match y {
                0|2 => op(Z80::instr_ld_rr_a, 7, RegisterIndirect, "LD"),
                1|3 => op(Z80::instr_ld_a_rr, 7, RegisterIndirect, "LD"),
                4 => op(Z80::instr_ld_mem_hl::<Hl>, 16, Extended, "LD"),
                5 => op(Z80::instr_ld_hl_mem::<Hl>, 16, Extended, "LD"),
                6 => op(Z80::instr_ld_mem_a, 13, Extended, "LD"),
                _ => op(Z80::instr_ld_a_mem, 13, Extended, "LD"),
            },
            3 if q == 0 => op(Z80::instr_inc_rr::<Hl>, 6, Register, "INC"),
            3 => op(Z80::instr_dec_rr::<Hl>, 6, Register, "DEC"),
            4 if y == 6 => op(Z80::instr_inc_mem::<Hl>, 11, RegisterIndirect, "INC"),
            4 => op(Z80::instr_inc_r::<Hl>, 4, Register, "INC"),
            5 if y == 6 => op(Z80::instr_dec_mem::<Hl>, 11, RegisterIndirect, "DEC"),
            5 => op(Z80::instr_dec_r::<Hl>, 4, Register, "DEC"),
            6 if y == 6 => op(Z80::instr_ld_mem_n::<Hl>, 10, RegisterIndirect, "LD"),
            6 => op(Z80::instr_ld_r_n::<Hl>, 7, Immediate, "LD"),
            _ => op(Z80::instr_acc_op, 4, Implied, ACC[y as usize]),
        },
        1 => match (y, z) {
            (6, 6) => op(Z80::instr_halt, 4, Implied, "HALT"),
            (_, 6) => op(Z80::instr_ld_r_mem::<Hl>, 7, RegisterIndirect, "LD"),
            (6, _) => op(Z80::instr_ld_mem_r::<Hl>, 7, RegisterIndirect, "LD"),
            _ => op(Z80::instr_ld_r_r::<Hl>, 4, Register, "LD"),
        },
        2 if z == 6 => op(Z80::instr_alu_mem::<Hl>, 7, RegisterIndirect, ALU[y as usize]),
        2 => op(Z80::instr_alu_r::<Hl>, 4, Register, ALU[y as usize]),
        _ => match z {
            0 => op(Z80::instr_ret_cc, 5, Implied, "RET"),
            1 if q == 0 => op(Z80::instr_pop::<Hl>, 10, Register, "POP"),
            1 => match p {
                0 => op(Z80::instr_ret, 10, Implied, "RET"),
                1 => op(Z80::instr_exx, 4, Implied, "EXX"),
                2 => op(Z80::instr_jp_hl::<Hl>, 4, Register, "JP"),
                _ => op(Z80::instr_ld_sp_hl::<Hl>, 6, Register, "LD"),
            },
            2 => op(Z80::instr_jp_cc, 10, ImmediateExtended, "JP"),
            3 => match y {
                0 => op(Z80::instr_jp, 10, ImmediateExtended, "JP"),
                1 => op(Z80::instr_escape_cb, 0, Escape, "CB"),
                2 => op(Z80::instr_out_n_a, (M1_CYCLE + MEMRW_CYCLE + IO_CYCLE) as u8, Port, "OUT"),
                3 => op(Z80::instr_in_a_n, (M1_CYCLE + MEMRW_CYCLE + IO_CYCLE) as u8, Port, "IN"),
                4 => op(Z80::instr_ex_sp_hl::<Hl>, 19, RegisterIndirect, "EX"),
                5 => op(Z80::instr_ex_de_hl, 4, Register, "EX"),
                6 => op(Z80::instr_di, 4, Implied, "DI"),
                _ => op(Z80::instr_ei, 4, Implied, "EI"),
            },
            4 => op(Z80::instr_call_cc, 10, ImmediateExtended, "CALL"),
            5 if q == 0 => op(Z80::instr_push::<Hl>, 11, Register, "PUSH"),
            5 => match p {
                0 => op(Z80::instr_call, 17, ImmediateExtended, "CALL"),
                1 => op(Z80::instr_escape_index::<Ix>, 0, Escape, "DD"),
                2 => op(Z80::instr_escape_ed, 0, Escape, "ED"),
                _ => op(Z80::instr_escape_index::<Iy>, 0, Escape, "FD"),
            },
            6 => op(Z80::instr_alu_n, 7, Immediate, ALU[y as usize]),
            _ => op(Z80::instr_rst, 11, Implied, "RST"),
        }
    }
}

const fn cb_entry(code: u8) -> Opcode {
    use AddrMode::*;
    let (x, y, z) = (code >> 6, (code >> 3) & 7, code & 7);
    match (x, z) {
        (0, 6) => op(Z80::instr_rot_mem, 15, RegisterIndirect, ROT[y as usize]),
        (0, _) => op(Z80::instr_rot_r, 8, Register, ROT[y as usize]),
        (1, 6) => op(Z80::instr_bit_mem, 12, RegisterIndirect, "BIT"),
        (1, _) => op(Z80::instr_bit_r, 8, Register, "BIT"),
        (2, 6) => op(Z80::instr_res_set_mem, 15, RegisterIndirect, "RES"),
        (2, _) => op(Z80::instr_res_set_r, 8, Register, "RES"),
        (_, 6) => op(Z80::instr_res_set_mem, 15, RegisterIndirect, "SET"),
        _ => op(Z80::instr_res_set_r, 8, Register, "SET"),
    }
}

const fn ed_entry(code: u8) -> Opcode {
    use AddrMode::*;
    const NOP_ED: Opcode = op(Z80::instr_nop, 8, Implied, "NOP");
    let (x, y, z) = (code >> 6, (code >> 3) & 7, code & 7);
    let q = y & 1;
    match x {
        1 => match z {
            0 => op(Z80::instr_in_r_c, ED_IO, Port, "IN"),
            1 => op(Z80::instr_out_c_r, ED_IO, Port, "OUT"),
            2 if q == 0 => op(Z80::instr_adc_sbc_hl_rr, 15, Register, "SBC"),
            2 => op(Z80::instr_adc_sbc_hl_rr, 15, Register, "ADC"),
            3 if q == 0 => op(Z80::instr_ld_mem_rr, 20, Extended, "LD"),
            3 => op(Z80::instr_ld_rr_mem, 20, Extended, "LD"),
            4 => op(Z80::instr_neg, 8, Implied, "NEG"),
            5 if y == 1 => op(Z80::instr_retn, 14, Implied, "RETI"),
            5 => op(Z80::instr_retn, 14, Implied, "RETN"),
            6 => op(Z80::instr_im, 8, Implied, "IM"),
            _ => match y {
                0..=3 => op(Z80::instr_ld_ir, 9, Register, "LD"),
                4 => op(Z80::instr_rrd_rld, 18, RegisterIndirect, "RRD"),
                5 => op(Z80::instr_rrd_rld, 18, RegisterIndirect, "RLD"),
                _ => NOP_ED,
            }
        },
        2 if z <= 3 && y >= 4 => {
            let mnemonic = BLOCK[(y - 4) as usize][z as usize];
            match z {
                0 => op(Z80::instr_ldx, 16, RegisterIndirect, mnemonic),
                1 => op(Z80::instr_cpx, 16, RegisterIndirect, mnemonic),
                2 => op(Z80::instr_inx, 16, Port, mnemonic),
                _ => op(Z80::instr_outx, 16, Port, mnemonic),
            }
        }
        _ => NOP_ED
    }
}

/// The unprefixed entry with the ignored prefix fetch added.
const fn fallback(code: u8) -> Opcode {
    let entry = main_entry(code);
    Opcode { tacts: entry.tacts + PREFIX, fallback: true, ..entry }
}

/// Is the register operand H or L.
const fn is_half(r: u8) -> bool {
    r == 4 || r == 5
}

const fn index_entry<I: HlReg>(prefix: Prefix, code: u8) -> Opcode {
    use AddrMode::*;
    let (y, z) = ((code >> 3) & 7, code & 7);
    match code {
        0x09|0x19|0x29|0x39 => op(Z80::instr_add_hl_rr::<I>, 15, IndexRegister(prefix), "ADD"),
        0x21 => op(Z80::instr_ld_rr_nn::<I>, 14, IndexRegister(prefix), "LD"),
        0x22 => op(Z80::instr_ld_mem_hl::<I>, 20, Extended, "LD"),
        0x2A => op(Z80::instr_ld_hl_mem::<I>, 20, Extended, "LD"),
        0x23 => op(Z80::instr_inc_rr::<I>, 10, IndexRegister(prefix), "INC"),
        0x2B => op(Z80::instr_dec_rr::<I>, 10, IndexRegister(prefix), "DEC"),
        0x24|0x2C => op(Z80::instr_inc_r::<I>, 8, IndexRegister(prefix), "INC"),
        0x25|0x2D => op(Z80::instr_dec_r::<I>, 8, IndexRegister(prefix), "DEC"),
        0x26|0x2E => op(Z80::instr_ld_r_n::<I>, 11, IndexRegister(prefix), "LD"),
        0x34 => op(Z80::instr_inc_mem::<I>, INDEXED_RMW, Indexed(prefix), "INC"),
        0x35 => op(Z80::instr_dec_mem::<I>, INDEXED_RMW, Indexed(prefix), "DEC"),
        0x36 => op(Z80::instr_ld_mem_n::<I>, INDEXED, Indexed(prefix), "LD"),
        0x76 => fallback(code),
        0x40..=0x7F if z == 6 => op(Z80::instr_ld_r_mem::<I>, INDEXED, Indexed(prefix), "LD"),
        0x40..=0x7F if y == 6 => op(Z80::instr_ld_mem_r::<I>, INDEXED, Indexed(prefix), "LD"),
        0x40..=0x7F if is_half(y) || is_half(z) => {
            op(Z80::instr_ld_r_r::<I>, 8, IndexRegister(prefix), "LD")
        }
        0x80..=0xBF if z == 6 => op(Z80::instr_alu_mem::<I>, INDEXED, Indexed(prefix), ALU[y as usize]),
        0x80..=0xBF if is_half(z) => {
            op(Z80::instr_alu_r::<I>, 8, IndexRegister(prefix), ALU[y as usize])
        }
        0xCB => op(Z80::instr_escape_index_cb::<I>, 0, Escape, "CB"),
        0xE1 => op(Z80::instr_pop::<I>, 14, IndexRegister(prefix), "POP"),
        0xE3 => op(Z80::instr_ex_sp_hl::<I>, 23, IndexRegister(prefix), "EX"),
        0xE5 => op(Z80::instr_push::<I>, 15, IndexRegister(prefix), "PUSH"),
        0xE9 => op(Z80::instr_jp_hl::<I>, 8, IndexRegister(prefix), "JP"),
        0xF9 => op(Z80::instr_ld_sp_hl::<I>, 10, IndexRegister(prefix), "LD"),
        // another index prefix supersedes this one
        0xDD|0xFD => Opcode { exec: Z80::instr_chain_prefix, ..fallback(code) },
        _ => fallback(code)
    }
}

const fn index_cb_entry(prefix: Prefix, code: u8) -> Opcode {
    use AddrMode::*;
    let (x, y) = (code >> 6, (code >> 3) & 7);
    match x {
        0 => op(Z80::instr_rot_idx, INDEXED_RMW, Indexed(prefix), ROT[y as usize]),
        1 => op(Z80::instr_bit_idx, INDEXED + 1, Indexed(prefix), "BIT"),
        2 => op(Z80::instr_res_set_idx, INDEXED_RMW, Indexed(prefix), "RES"),
        _ => op(Z80::instr_res_set_idx, INDEXED_RMW, Indexed(prefix), "SET"),
    }
}

const fn dd_entry(code: u8) -> Opcode {
    index_entry::<Ix>(Prefix::Xdd, code)
}

const fn fd_entry(code: u8) -> Opcode {
    index_entry::<Iy>(Prefix::Yfd, code)
}

const fn ddcb_entry(code: u8) -> Opcode {
    index_cb_entry(Prefix::Xdd, code)
}

const fn fdcb_entry(code: u8) -> Opcode {
    index_cb_entry(Prefix::Yfd, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bytes: &[u8]) -> &'static Opcode {
        resolve(bytes).unwrap()
    }

    #[test]
    fn universe_works() {
        assert_eq!(Universe::try_from(&[][..]), Ok(Universe::Main));
        assert_eq!(Universe::try_from(&[0xCB][..]), Ok(Universe::Cb));
        assert_eq!(Universe::try_from(&[0xED][..]), Ok(Universe::Ed));
        assert_eq!(Universe::try_from(&[0xDD][..]), Ok(Universe::Dd));
        assert_eq!(Universe::try_from(&[0xFD][..]), Ok(Universe::Fd));
        assert_eq!(Universe::try_from(&[0xDD, 0xCB][..]), Ok(Universe::DdCb));
        assert_eq!(Universe::try_from(&[0xFD, 0xCB][..]), Ok(Universe::FdCb));
        assert_eq!(Universe::try_from(&[0xED, 0xCB][..]), Err(()));
        assert_eq!(Universe::try_from(&[0x00][..]), Err(()));
        assert!(resolve(&[]).is_none());
        assert!(resolve(&[0xDD, 0xED, 0x44]).is_none());
        assert_eq!(entry(&[0xFD, 0xCB, 0x80, 0x46]).mnemonic(), "BIT");
        assert_eq!(entry(&[0xFD, 0xCB, 0x80, 0x46]).tacts(), 20);
    }

    #[test]
    fn main_table_works() {
        let costs: &[(u8, u32, &str)] = &[
            (0x00, 4, "NOP"), (0x01, 10, "LD"), (0x02, 7, "LD"), (0x03, 6, "INC"),
            (0x08, 4, "EX"), (0x09, 11, "ADD"), (0x10, 8, "DJNZ"), (0x18, 12, "JR"),
            (0x20, 7, "JR"), (0x22, 16, "LD"), (0x27, 4, "DAA"), (0x32, 13, "LD"),
            (0x34, 11, "INC"), (0x36, 10, "LD"), (0x3F, 4, "CCF"), (0x46, 7, "LD"),
            (0x70, 7, "LD"), (0x76, 4, "HALT"), (0x78, 4, "LD"), (0x86, 7, "ADD"),
            (0x9F, 4, "SBC"), (0xBE, 7, "CP"), (0xC0, 5, "RET"), (0xC1, 10, "POP"),
            (0xC3, 10, "JP"), (0xC4, 10, "CALL"), (0xC5, 11, "PUSH"), (0xC6, 7, "ADD"),
            (0xC9, 10, "RET"), (0xCD, 17, "CALL"), (0xD3, 11, "OUT"), (0xD9, 4, "EXX"),
            (0xDB, 11, "IN"), (0xE3, 19, "EX"), (0xE9, 4, "JP"), (0xEB, 4, "EX"),
            (0xF3, 4, "DI"), (0xF9, 6, "LD"), (0xFB, 4, "EI"), (0xFF, 11, "RST"),
        ];
        for &(code, tacts, mnemonic) in costs {
            let op = opcode(Universe::Main, code);
            assert_eq!(op.tacts(), tacts, "{:02x}", code);
            assert_eq!(op.mnemonic(), mnemonic, "{:02x}", code);
            assert!(!op.is_fallback());
        }
        for (code, mnemonic) in [(0xCB, "CB"), (0xDD, "DD"), (0xED, "ED"), (0xFD, "FD")] {
            let op = opcode(Universe::Main, code);
            assert_eq!(op.tacts(), 0);
            assert_eq!(op.mode(), AddrMode::Escape);
            assert_eq!(op.mnemonic(), mnemonic);
        }
        assert_eq!(opcode(Universe::Main, 0x3A).mode(), AddrMode::Extended);
        assert_eq!(opcode(Universe::Main, 0x28).mode(), AddrMode::Relative);
        assert_eq!(opcode(Universe::Main, 0xDB).mode(), AddrMode::Port);
    }

    #[test]
    fn prefixed_tables_work() {
        let costs: &[(&[u8], u32, &str)] = &[
            (&[0xCB, 0x00], 8, "RLC"), (&[0xCB, 0x06], 15, "RLC"), (&[0xCB, 0x36], 15, "SLL"),
            (&[0xCB, 0x46], 12, "BIT"), (&[0xCB, 0x7F], 8, "BIT"), (&[0xCB, 0x86], 15, "RES"),
            (&[0xCB, 0xFF], 8, "SET"),
            (&[0xED, 0x40], 12, "IN"), (&[0xED, 0x71], 12, "OUT"), (&[0xED, 0x42], 15, "SBC"),
            (&[0xED, 0x7A], 15, "ADC"), (&[0xED, 0x43], 20, "LD"), (&[0xED, 0x7B], 20, "LD"),
            (&[0xED, 0x44], 8, "NEG"), (&[0xED, 0x7C], 8, "NEG"), (&[0xED, 0x45], 14, "RETN"),
            (&[0xED, 0x4D], 14, "RETI"), (&[0xED, 0x5E], 8, "IM"), (&[0xED, 0x47], 9, "LD"),
            (&[0xED, 0x5F], 9, "LD"), (&[0xED, 0x67], 18, "RRD"), (&[0xED, 0x6F], 18, "RLD"),
            (&[0xED, 0x77], 8, "NOP"), (&[0xED, 0xA0], 16, "LDI"), (&[0xED, 0xB8], 16, "LDDR"),
            (&[0xED, 0xA9], 16, "CPD"), (&[0xED, 0xB2], 16, "INIR"), (&[0xED, 0xBB], 16, "OTDR"),
            (&[0xED, 0xA4], 8, "NOP"), (&[0xED, 0x00], 8, "NOP"), (&[0xED, 0xFF], 8, "NOP"),
            (&[0xDD, 0x09], 15, "ADD"), (&[0xDD, 0x21], 14, "LD"), (&[0xDD, 0x22], 20, "LD"),
            (&[0xDD, 0x23], 10, "INC"), (&[0xDD, 0x24], 8, "INC"), (&[0xFD, 0x2E], 11, "LD"),
            (&[0xDD, 0x34], 23, "INC"), (&[0xFD, 0x36], 19, "LD"), (&[0xDD, 0x46], 19, "LD"),
            (&[0xDD, 0x66], 19, "LD"), (&[0xFD, 0x74], 19, "LD"), (&[0xDD, 0x44], 8, "LD"),
            (&[0xFD, 0x6F], 8, "LD"), (&[0xDD, 0x86], 19, "ADD"), (&[0xFD, 0xBD], 8, "CP"),
            (&[0xDD, 0xE1], 14, "POP"), (&[0xDD, 0xE3], 23, "EX"), (&[0xFD, 0xE5], 15, "PUSH"),
            (&[0xDD, 0xE9], 8, "JP"), (&[0xFD, 0xF9], 10, "LD"),
            (&[0xDD, 0xCB, 0x00, 0x06], 23, "RLC"), (&[0xDD, 0xCB, 0x00, 0x01], 23, "RLC"),
            (&[0xFD, 0xCB, 0x00, 0x7E], 20, "BIT"), (&[0xFD, 0xCB, 0x00, 0xC0], 23, "SET"),
        ];
        for &(bytes, tacts, mnemonic) in costs {
            let op = entry(bytes);
            assert_eq!(op.tacts(), tacts, "{:02x?}", bytes);
            assert_eq!(op.mnemonic(), mnemonic, "{:02x?}", bytes);
            assert!(!op.is_fallback(), "{:02x?}", bytes);
        }
        assert_eq!(entry(&[0xDD, 0x46]).mode(), AddrMode::Indexed(Prefix::Xdd));
        assert_eq!(entry(&[0xFD, 0x21]).mode(), AddrMode::IndexRegister(Prefix::Yfd));
        assert_eq!(entry(&[0xDD, 0xCB]).mode(), AddrMode::Escape);
    }

    #[test]
    fn fallback_entries_work() {
        let indexable = |code: u8| -> bool {
            let (x, y, z) = (code >> 6, (code >> 3) & 7, code & 7);
            match code {
                0x09|0x19|0x29|0x39|0x21|0x22|0x2A|0x23|0x2B|0x24|0x2C|0x25|0x2D|0x26|0x2E|
                0x34|0x35|0x36|0xCB|0xE1|0xE3|0xE5|0xE9|0xF9 => true,
                0x76 => false,
                _ => (x == 1 && (y >= 4 && y <= 6 || z >= 4 && z <= 6)) ||
                     (x == 2 && z >= 4 && z <= 6)
            }
        };
        let mut fallbacks = 0;
        for universe in [Universe::Dd, Universe::Fd] {
            for code in 0..=255u8 {
                let op = opcode(universe, code);
                if indexable(code) {
                    assert!(!op.is_fallback(), "{:?} {:02x}", universe, code);
                    continue;
                }
                fallbacks += 1;
                let main = opcode(Universe::Main, code);
                assert!(op.is_fallback(), "{:?} {:02x}", universe, code);
                assert_eq!(op.tacts(), main.tacts() + 4, "{:?} {:02x}", universe, code);
                assert_eq!(op.mnemonic(), main.mnemonic());
                assert_eq!(op.mode(), main.mode());
            }
        }
        assert_eq!(fallbacks, 2 * (256 - 86));
        assert_eq!(opcode(Universe::Dd, 0x00).tacts(), 8);
        assert_eq!(opcode(Universe::Fd, 0x76).mnemonic(), "HALT");
        assert_eq!(opcode(Universe::Dd, 0xFD).tacts(), 4);
        assert_eq!(opcode(Universe::Dd, 0xED).tacts(), 4);
        for code in 0..=255u8 {
            assert!(!opcode(Universe::Main, code).is_fallback());
            assert!(!opcode(Universe::Cb, code).is_fallback());
            assert!(!opcode(Universe::Ed, code).is_fallback());
            assert!(!opcode(Universe::DdCb, code).is_fallback());
        }
    }

    #[test]
    fn costs_follow_machine_cycles() {
        let indexed = 2 * M1_CYCLE + 2 * MEMRW_CYCLE + INDEX_DELAY;
        assert_eq!(indexed, 19);
        for universe in [Universe::Dd, Universe::Fd] {
            for code in [0x46, 0x70, 0x36, 0x86, 0xBE] {
                assert_eq!(opcode(universe, code).tacts(), indexed, "{:02x}", code);
            }
            assert_eq!(opcode(universe, 0x34).tacts(), indexed + 1 + MEMRW_CYCLE);
            assert_eq!(opcode(universe, 0x00).tacts(), M1_CYCLE + PREFIX_CYCLE);
        }
        for universe in [Universe::DdCb, Universe::FdCb] {
            assert_eq!(opcode(universe, 0x06).tacts(), indexed + 1 + MEMRW_CYCLE);
            assert_eq!(opcode(universe, 0x46).tacts(), indexed + 1);
            assert_eq!(opcode(universe, 0xC6).tacts(), indexed + 1 + MEMRW_CYCLE);
        }
        assert_eq!(opcode(Universe::Ed, 0x78).tacts(), 2 * M1_CYCLE + IO_CYCLE);
        assert_eq!(opcode(Universe::Main, 0xDB).tacts(), M1_CYCLE + MEMRW_CYCLE + IO_CYCLE);
    }
}

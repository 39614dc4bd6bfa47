/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! Arithmetic, logic, bit and block operations.
//!
//! All Flags involved instructions use these functions to alter the Flags state.
use crate::cpu::CpuFlags;

const HALF8_MASK_HI: u8 = 0xF0;
const HALF8_MASK_LO: u8 = 0x0F;

/// Flags left intact by operations that only touch H, N, C and the undocumented bits.
const SZP: CpuFlags = CpuFlags::S.union(CpuFlags::Z).union(CpuFlags::PV);

#[inline]
fn add_carry(val: u8, add: u8, cf: bool, flags: &mut CpuFlags) -> u8 {
    let sum = val as u16 + add as u16 + cf as u16;
    let rval = sum as u8;
    *flags = CpuFlags::szxy(rval) |
             CpuFlags::half(val, add, rval) |
             CpuFlags::overflow_add(val, add, rval) |
             CpuFlags::carry(sum > 0xFF);
    rval
}

#[inline]
fn sub_carry(val: u8, sub: u8, cf: bool, flags: &mut CpuFlags) -> u8 {
    let diff = (val as u16).wrapping_sub(sub as u16).wrapping_sub(cf as u16);
    let rval = diff as u8;
    *flags = CpuFlags::szxy(rval) |
             CpuFlags::half(val, sub, rval) |
             CpuFlags::overflow_sub(val, sub, rval) |
             CpuFlags::carry(diff > 0xFF) |
             CpuFlags::N;
    rval
}

#[inline]
pub fn add(val: u8, add: u8, flags: &mut CpuFlags) -> u8 {
    add_carry(val, add, false, flags)
}

#[inline]
pub fn adc(val: u8, add: u8, flags: &mut CpuFlags) -> u8 {
    add_carry(val, add, flags.cf(), flags)
}

#[inline]
pub fn sub(val: u8, sub: u8, flags: &mut CpuFlags) -> u8 {
    sub_carry(val, sub, false, flags)
}

#[inline]
pub fn sbc(val: u8, sub: u8, flags: &mut CpuFlags) -> u8 {
    sub_carry(val, sub, flags.cf(), flags)
}

/// Like [sub] but the result is discarded and bits 3 and 5 come from the operand.
#[inline]
pub fn cp(val: u8, cmp: u8, flags: &mut CpuFlags) {
    sub_carry(val, cmp, false, flags);
    flags.remove(CpuFlags::XY);
    flags.insert(CpuFlags::xy(cmp));
}

#[inline]
pub fn and(val: u8, arg: u8, flags: &mut CpuFlags) -> u8 {
    let rval = val & arg;
    *flags = CpuFlags::szxyp(rval) | CpuFlags::H;
    rval
}

#[inline]
pub fn xor(val: u8, arg: u8, flags: &mut CpuFlags) -> u8 {
    let rval = val ^ arg;
    *flags = CpuFlags::szxyp(rval);
    rval
}

#[inline]
pub fn or(val: u8, arg: u8, flags: &mut CpuFlags) -> u8 {
    let rval = val | arg;
    *flags = CpuFlags::szxyp(rval);
    rval
}

#[inline]
pub fn inc(val: u8, flags: &mut CpuFlags) -> u8 {
    let rval = val.wrapping_add(1);
    *flags = CpuFlags::szxy(rval) |
             CpuFlags::when(rval & HALF8_MASK_LO == 0, CpuFlags::H) |
             CpuFlags::when(val == 0x7F, CpuFlags::V) |
             (*flags & CpuFlags::C);
    rval
}

#[inline]
pub fn dec(val: u8, flags: &mut CpuFlags) -> u8 {
    let rval = val.wrapping_sub(1);
    *flags = CpuFlags::szxy(rval) |
             CpuFlags::when(val & HALF8_MASK_LO == 0, CpuFlags::H) |
             CpuFlags::when(val == 0x80, CpuFlags::V) |
             CpuFlags::N |
             (*flags & CpuFlags::C);
    rval
}

#[inline]
pub fn neg(acc: u8, flags: &mut CpuFlags) -> u8 {
    sub(0, acc, flags)
}

#[inline]
pub fn cpl(acc: u8, flags: &mut CpuFlags) -> u8 {
    let rval = !acc;
    *flags = (*flags & (SZP|CpuFlags::C)) |
             CpuFlags::xy(rval) |
             CpuFlags::H | CpuFlags::N;
    rval
}

/// Bits 3 and 5 are copied from the Accumulator.
#[inline]
pub fn scf(acc: u8, flags: &mut CpuFlags) {
    *flags = (*flags & SZP) | CpuFlags::xy(acc) | CpuFlags::C;
}

/// The previous Carry lands in the Half Carry. Bits 3 and 5 are copied from the Accumulator.
#[inline]
pub fn ccf(acc: u8, flags: &mut CpuFlags) {
    let cf = flags.cf();
    *flags = (*flags & SZP) |
             CpuFlags::xy(acc) |
             CpuFlags::when(cf, CpuFlags::H) |
             CpuFlags::carry(!cf);
}

#[inline]
pub fn daa(acc: u8, flags: &mut CpuFlags) -> u8 {
    let cf0 = flags.cf();
    let hf0 = flags.hf();
    let nf0 = flags.nf();
    let low_nibble = acc & HALF8_MASK_LO;
    let mut diff = 0;
    if hf0 || low_nibble > 9 {
        diff |= 0x06;
    }
    let cf = cf0 || acc > 0x99;
    if cf {
        diff |= 0x60;
    }
    let (res, hf) = if nf0 {
        (acc.wrapping_sub(diff), hf0 && low_nibble < 6)
    }
    else {
        (acc.wrapping_add(diff), low_nibble > 9)
    };
    *flags = CpuFlags::szxyp(res) |
             CpuFlags::when(hf, CpuFlags::H) |
             CpuFlags::when(nf0, CpuFlags::N) |
             CpuFlags::carry(cf);
    res
}

#[inline]
fn rot_acc(rval: u8, cf: bool, flags: &mut CpuFlags) -> u8 {
    *flags = (*flags & SZP) | CpuFlags::xy(rval) | CpuFlags::carry(cf);
    rval
}

#[inline]
pub fn rlca(acc: u8, flags: &mut CpuFlags) -> u8 {
    rot_acc(acc.rotate_left(1), acc & 0x80 != 0, flags)
}

#[inline]
pub fn rrca(acc: u8, flags: &mut CpuFlags) -> u8 {
    rot_acc(acc.rotate_right(1), acc & 1 != 0, flags)
}

#[inline]
pub fn rla(acc: u8, flags: &mut CpuFlags) -> u8 {
    rot_acc(acc << 1 | flags.cf() as u8, acc & 0x80 != 0, flags)
}

#[inline]
pub fn rra(acc: u8, flags: &mut CpuFlags) -> u8 {
    rot_acc(acc >> 1 | (flags.cf() as u8) << 7, acc & 1 != 0, flags)
}

#[inline]
fn shift(rval: u8, cf: bool, flags: &mut CpuFlags) -> u8 {
    *flags = CpuFlags::szxyp(rval) | CpuFlags::carry(cf);
    rval
}

#[inline]
pub fn rlc(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val.rotate_left(1), val & 0x80 != 0, flags)
}

#[inline]
pub fn rrc(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val.rotate_right(1), val & 1 != 0, flags)
}

#[inline]
pub fn rl(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val << 1 | flags.cf() as u8, val & 0x80 != 0, flags)
}

#[inline]
pub fn rr(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val >> 1 | (flags.cf() as u8) << 7, val & 1 != 0, flags)
}

#[inline]
pub fn sla(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val << 1, val & 0x80 != 0, flags)
}

/// Undocumented: shifts left filling bit 0 with 1.
#[inline]
pub fn sll(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val << 1 | 1, val & 0x80 != 0, flags)
}

#[inline]
pub fn sra(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(((val as i8) >> 1) as u8, val & 1 != 0, flags)
}

#[inline]
pub fn srl(val: u8, flags: &mut CpuFlags) -> u8 {
    shift(val >> 1, val & 1 != 0, flags)
}

/// Returns `(acc, (HL))`.
#[inline]
pub fn rld(acc: u8, oth: u8, flags: &mut CpuFlags) -> (u8, u8) {
    let racc = (acc & HALF8_MASK_HI) | (oth >> 4);
    let roth = (oth << 4) | (acc & HALF8_MASK_LO);
    *flags = CpuFlags::szxyp(racc) | (*flags & CpuFlags::C);
    (racc, roth)
}

/// Returns `(acc, (HL))`.
#[inline]
pub fn rrd(acc: u8, oth: u8, flags: &mut CpuFlags) -> (u8, u8) {
    let racc = (acc & HALF8_MASK_HI) | (oth & HALF8_MASK_LO);
    let roth = (acc << 4) | (oth >> 4);
    *flags = CpuFlags::szxyp(racc) | (*flags & CpuFlags::C);
    (racc, roth)
}

/// `b35` is the source of the undocumented bits: the tested register itself, or MEMPTR's MSB
/// when testing memory.
#[inline]
pub fn bit(n: u32, val: u8, b35: u8, flags: &mut CpuFlags) {
    debug_assert!(n <= 7);
    let res = val & (1 << n);
    *flags = CpuFlags::when(res == 0, CpuFlags::Z|CpuFlags::P) |
             CpuFlags::from_bits_truncate(res) & CpuFlags::S |
             CpuFlags::xy(b35) |
             CpuFlags::H |
             (*flags & CpuFlags::C);
}

#[inline]
pub fn res(b: u32, v: u8) -> u8 { !(1 << b) & v }

#[inline]
pub fn set(b: u32, v: u8) -> u8 {  (1 << b) | v }

#[inline]
pub fn add16(val: u16, add: u16, flags: &mut CpuFlags) -> u16 {
    let (rval, cf) = val.overflowing_add(add);
    *flags = (*flags & SZP) |
             CpuFlags::half16(val, add, rval) |
             CpuFlags::xy((rval >> 8) as u8) |
             CpuFlags::carry(cf);
    rval
}

#[inline]
fn flags16(val: u16, arg: u16, rval: u16, vf: bool, cf: bool) -> CpuFlags {
    CpuFlags::sxy((rval >> 8) as u8) |
    CpuFlags::when(rval == 0, CpuFlags::Z) |
    CpuFlags::half16(val, arg, rval) |
    CpuFlags::when(vf, CpuFlags::V) |
    CpuFlags::carry(cf)
}

#[inline]
pub fn adc16(val: u16, add: u16, flags: &mut CpuFlags) -> u16 {
    let sum = val as u32 + add as u32 + flags.cf() as u32;
    let rval = sum as u16;
    let vf = (val ^ rval) & (add ^ rval) & 0x8000 != 0;
    *flags = flags16(val, add, rval, vf, sum > 0xFFFF);
    rval
}

#[inline]
pub fn sbc16(val: u16, sub: u16, flags: &mut CpuFlags) -> u16 {
    let diff = (val as u32).wrapping_sub(sub as u32).wrapping_sub(flags.cf() as u32);
    let rval = diff as u16;
    let vf = (val ^ sub) & (val ^ rval) & 0x8000 != 0;
    *flags = flags16(val, sub, rval, vf, diff > 0xFFFF) | CpuFlags::N;
    rval
}

/// `LD A,I` and `LD A,R`: P/V reflects IFF2.
#[inline]
pub fn ld_a_ir(ir: u8, iff2: bool, flags: &mut CpuFlags) {
    *flags = CpuFlags::szxy(ir) |
             CpuFlags::when(iff2, CpuFlags::PV) |
             (*flags & CpuFlags::C);
}

/// `IN r,(C)` and `IN (C)`.
#[inline]
pub fn io(val: u8, flags: &mut CpuFlags) {
    *flags = CpuFlags::szxyp(val) | (*flags & CpuFlags::C);
}

/// Undocumented bits of the block transfer and search instructions:
/// bit 3 of `n` goes to X, bit 1 of `n` goes to Y.
#[inline]
fn block_op_xy(n: u8) -> CpuFlags {
    CpuFlags::from_bits_truncate(n & CpuFlags::X.bits() | (n << 4) & CpuFlags::Y.bits())
}

/// `LDI`, `LDD`, `LDIR` and `LDDR`; `val` is the transferred byte.
#[inline]
pub fn ldx(acc: u8, val: u8, bc_is_zero: bool, flags: &mut CpuFlags) {
    *flags = (*flags & (CpuFlags::S|CpuFlags::Z|CpuFlags::C)) |
             block_op_xy(val.wrapping_add(acc)) |
             CpuFlags::when(!bc_is_zero, CpuFlags::PV);
}

/// `CPI`, `CPD`, `CPIR` and `CPDR`. Returns `true` if a match was found.
#[inline]
pub fn cpx(acc: u8, cmp: u8, bc_is_zero: bool, flags: &mut CpuFlags) -> bool {
    let res = acc.wrapping_sub(cmp);
    let hf = CpuFlags::half(acc, cmp, res);
    let n = res.wrapping_sub(hf.hf() as u8);
    *flags = CpuFlags::sxy(res) & CpuFlags::S |
             CpuFlags::when(res == 0, CpuFlags::Z) |
             hf |
             block_op_xy(n) |
             CpuFlags::when(!bc_is_zero, CpuFlags::PV) |
             CpuFlags::N |
             (*flags & CpuFlags::C);
    res == 0
}

/// Block I/O instructions.
///
/// * `io` is the transferred byte,
/// * `b` is the value of B after it was decreased,
/// * `m` is the value added to `io` to derive H, C and P/V: the adjusted C for `INI`/`IND`,
///   and L after the HL update for `OUTI`/`OUTD`.
#[inline]
pub fn iox(io: u8, b: u8, m: u8, flags: &mut CpuFlags) {
    let (k, hcf) = io.overflowing_add(m);
    *flags = CpuFlags::szxy(b) |
             CpuFlags::when(io & 0x80 != 0, CpuFlags::N) |
             CpuFlags::when(hcf, CpuFlags::H|CpuFlags::C) |
             CpuFlags::parity(k & 7 ^ b);
}

/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! The Flags register bits and the helpers that build them.
use bitflags::bitflags;

bitflags! {
    /// Z80 Flags register.
    ///
    /// Bits 3 and 5 ([CpuFlags::X] and [CpuFlags::Y]) are not documented by Zilog,
    /// but they are computed by every flag modifying operation anyway.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CpuFlags: u8 {
        /// Sign Flag.
        const S  = 0b1000_0000;
        /// Zero Flag.
        const Z  = 0b0100_0000;
        /// Undocumented bit 5 of the Flags.
        const Y  = 0b0010_0000;
        /// Half Carry Flag.
        const H  = 0b0001_0000;
        /// Undocumented bit 3 of the Flags.
        const X  = 0b0000_1000;
        /// Parity/Overflow Flag.
        const PV = 0b0000_0100;
        /// Add/Subtract Flag.
        const N  = 0b0000_0010;
        /// Carry Flag.
        const C  = 0b0000_0001;
        /// An alias of [CpuFlags::PV] when used as parity.
        const P  = Self::PV.bits();
        /// An alias of [CpuFlags::PV] when used as overflow.
        const V  = Self::PV.bits();
        /// Both undocumented bits.
        const XY = Self::X.bits() | Self::Y.bits();
        /// Flags copied verbatim from a result: sign and both undocumented bits.
        const SXY = Self::S.bits() | Self::XY.bits();
    }
}

impl CpuFlags {
    /// Returns a value of the Sign Flag.
    #[inline]
    pub fn sf(self) -> bool {
        self.contains(CpuFlags::S)
    }

    /// Returns a value of the Zero Flag.
    #[inline]
    pub fn zf(self) -> bool {
        self.contains(CpuFlags::Z)
    }

    /// Returns a value of the Half Carry Flag.
    #[inline]
    pub fn hf(self) -> bool {
        self.contains(CpuFlags::H)
    }

    /// Returns a value of the Parity/Overflow Flag.
    #[inline]
    pub fn pvf(self) -> bool {
        self.contains(CpuFlags::PV)
    }

    /// Returns a value of the Add/Subtract Flag.
    #[inline]
    pub fn nf(self) -> bool {
        self.contains(CpuFlags::N)
    }

    /// Returns a value of the Carry Flag.
    #[inline]
    pub fn cf(self) -> bool {
        self.contains(CpuFlags::C)
    }

    /// Returns `flag` if `cond` is `true`, otherwise no flags.
    #[inline]
    pub fn when(cond: bool, flag: CpuFlags) -> Self {
        if cond { flag } else { CpuFlags::empty() }
    }

    /// Bits 7, 5 and 3 of `res` copied into S, Y and X.
    #[inline]
    pub fn sxy(res: u8) -> Self {
        Self::from_bits_truncate(res) & CpuFlags::SXY
    }

    /// Bits 5 and 3 of `res` copied into Y and X.
    #[inline]
    pub fn xy(res: u8) -> Self {
        Self::from_bits_truncate(res) & CpuFlags::XY
    }

    /// S, Z, Y and X derived from an 8-bit result.
    #[inline]
    pub fn szxy(res: u8) -> Self {
        Self::sxy(res) | Self::when(res == 0, CpuFlags::Z)
    }

    /// S, Z, Y, X and P (even parity) derived from an 8-bit result.
    #[inline]
    pub fn szxyp(res: u8) -> Self {
        Self::szxy(res) | Self::parity(res)
    }

    /// [CpuFlags::P] if the number of set bits in `res` is even.
    #[inline]
    pub fn parity(res: u8) -> Self {
        Self::when(res.count_ones() & 1 == 0, CpuFlags::P)
    }

    /// [CpuFlags::C] if `cf` is `true`.
    #[inline]
    pub fn carry(cf: bool) -> Self {
        Self::when(cf, CpuFlags::C)
    }

    /// [CpuFlags::H] if bit 4 of `a ^ b ^ res` is set, i.e. there was a carry
    /// or borrow out of bit 3 while computing `res` from `a` and `b`.
    #[inline]
    pub fn half(a: u8, b: u8, res: u8) -> Self {
        Self::from_bits_truncate((a ^ b ^ res) & CpuFlags::H.bits())
    }

    /// [CpuFlags::H] for a 16-bit operation: a carry or borrow out of bit 11.
    #[inline]
    pub fn half16(a: u16, b: u16, res: u16) -> Self {
        Self::half((a >> 8) as u8, (b >> 8) as u8, (res >> 8) as u8)
    }

    /// [CpuFlags::V] for `res = a + b (+ carry)`: operand signs equal, result sign differs.
    #[inline]
    pub fn overflow_add(a: u8, b: u8, res: u8) -> Self {
        Self::when((a ^ res) & (b ^ res) & 0x80 != 0, CpuFlags::V)
    }

    /// [CpuFlags::V] for `res = a - b (- carry)`: operand signs differ, result sign differs from `a`.
    #[inline]
    pub fn overflow_sub(a: u8, b: u8, res: u8) -> Self {
        Self::when((a ^ b) & (a ^ res) & 0x80 != 0, CpuFlags::V)
    }
}

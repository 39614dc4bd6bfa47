/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! This module contains various op-code bits parsing methods and their enum representations.
#![allow(clippy::inconsistent_digit_grouping)]
use core::fmt;
#[cfg(feature = "serde")] use serde::{Serialize, Deserialize};
use super::flags::CpuFlags;

/// An index prefix enum that modifies behaviour of the next op-code.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Prefix {
    Xdd  = 0xDD,
    Yfd  = 0xFD
}

impl core::convert::TryFrom<u8> for Prefix {
    type Error = ();

    #[inline(always)]
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0xDD => Ok(Prefix::Xdd),
            0xFD => Ok(Prefix::Yfd),
            _ => Err(())
        }
    }
}

/// Displays prefix as a corresponding register pair.
impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Prefix::Xdd  => "IX",
            Prefix::Yfd  => "IY",
        })
    }
}

macro_rules! reg_enum_mask_try_from {
    ($name:ident & ($mask:expr) {$($n:ident = $e:expr;)*}) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($n = $e,)*
        }

        impl core::convert::TryFrom<u8> for $name {
            type Error = ();

            #[inline(always)]
            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value & ($mask) {
                    $($e => Ok($name::$n),)*
                    _ => Err(())
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(match self {
                    $($name::$n => stringify!($n),)*
                })
            }
        }
    };
}

/// The items must be listed in the order of their masked values, covering all of them,
/// because conversion indexes a variant list with the masked and shifted value.
macro_rules! reg_enum_mask_from {
    ($vis:vis $name:ident & ($mask:expr) >> $shift:literal {$($n:ident = $e:expr;)*}) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $($n = $e,)*
        }

        impl From<u8> for $name {
            #[inline(always)]
            fn from(value: u8) -> Self {
                const VARIANTS: &[$name] = &[$($name::$n,)*];
                VARIANTS[((value & ($mask)) >> $shift) as usize]
            }
        }

        impl From<$name> for &str {
            #[inline(always)]
            fn from(value: $name) -> Self {
                match value {
                    $($name::$n => stringify!($n),)*
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(<&str>::from(*self))
            }
        }
    };
}

reg_enum_mask_try_from!{
    Reg8 & (0b111) {
        B = 0b000;
        C = 0b001;
        D = 0b010;
        E = 0b011;
        H = 0b100;
        L = 0b101;
        // (HL)|n = 0b110;
        A = 0b111;
    }
}

reg_enum_mask_from!{
pub StkReg16  & (0b00_11_0000) >> 4 {
            BC = 0b00_00_0000;
            DE = 0b00_01_0000;
            HL = 0b00_10_0000;
            AF = 0b00_11_0000;
    }
}

reg_enum_mask_from!{
pub Reg16 & (0b00_11_0000) >> 4 {
        BC = 0b00_00_0000;
        DE = 0b00_01_0000;
        HL = 0b00_10_0000;
        SP = 0b00_11_0000;
    }
}

reg_enum_mask_from!{
pub(crate)
    Ops8   & (0b00_111_000) >> 3 {
        ADD = 0b00_000_000;
        ADC = 0b00_001_000;
        SUB = 0b00_010_000;
        SBC = 0b00_011_000;
        AND = 0b00_100_000;
        XOR = 0b00_101_000;
        OR  = 0b00_110_000;
        CP  = 0b00_111_000;
    }
}

reg_enum_mask_from!{
pub(crate)
    Rot    & (0b00_111_000) >> 3 {
        RLC = 0b00_000_000;
        RRC = 0b00_001_000;
        RL  = 0b00_010_000;
        RR  = 0b00_011_000;
        SLA = 0b00_100_000;
        SRA = 0b00_101_000;
        SLL = 0b00_110_000;
        SRL = 0b00_111_000;
    }
}

reg_enum_mask_from!{
pub Condition
           & (0b00_111_000) >> 3 {
        NZ  = 0b00_000_000;
        Z   = 0b00_001_000;
        NC  = 0b00_010_000;
        C   = 0b00_011_000;
        PO  = 0b00_100_000;
        PE  = 0b00_101_000;
        P   = 0b00_110_000;
        M   = 0b00_111_000;
    }
}

impl Condition {
    /// Parses JR cc OPCODE into one of the conditional variant.
    #[inline]
    pub(crate) fn from_jr_subset(code: u8) -> Self {
        Condition::from(code & 0b00_011_000)
    }

    #[inline]
    pub fn is_satisfied(self, flags: CpuFlags) -> bool {
        match self {
            Condition::NZ => !flags.zf(),
            Condition::Z  =>  flags.zf(),
            Condition::NC => !flags.cf(),
            Condition::C  =>  flags.cf(),
            Condition::PO => !flags.pvf(),
            Condition::PE =>  flags.pvf(),
            Condition::P  => !flags.sf(),
            Condition::M  =>  flags.sf(),
        }
    }
}

impl core::str::FromStr for Condition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NZ" => Ok(Condition::NZ),
            "Z"  => Ok(Condition::Z),
            "NC" => Ok(Condition::NC),
            "C"  => Ok(Condition::C),
            "PO" => Ok(Condition::PO),
            "PE" => Ok(Condition::PE),
            "P"  => Ok(Condition::P),
            "M"  => Ok(Condition::M),
            _ => Err(())
        }
    }
}

impl Reg8 {
    /// Converts bits 3..=5 of code into a Reg8 operand.
    ///
    /// The op-code tables never route the `(HL)` encoding (`0b110`) here, it decodes as [Reg8::A].
    #[inline(always)]
    pub(crate) fn operand_b5_3(code: u8) -> Reg8 {
        Reg8::operand_b2_0(code >> 3)
    }

    /// Converts bits 0..=2 of code into a Reg8 operand.
    ///
    /// The op-code tables never route the `(HL)` encoding (`0b110`) here, it decodes as [Reg8::A].
    #[inline(always)]
    pub(crate) fn operand_b2_0(code: u8) -> Reg8 {
        Reg8::try_from(code).unwrap_or(Reg8::A)
    }
}

/// Parses bits 3..=5 of the `BIT`, `RES` and `SET` op-codes as a bit number.
#[inline(always)]
pub(crate) fn parse_code_bitnum(code: u8) -> u32 {
    ((code >> 3) & 7) as u32
}

/// Parses RST instruction code as an absolute target address.
#[inline(always)]
pub(crate) fn parse_restart_address(code: u8) -> u16 {
    (code & 0b00_111_000) as u16
}

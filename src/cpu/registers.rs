/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! This module contains cpu registers related building blocks.
use core::fmt;
#[cfg(feature = "serde")] use serde::{Serialize, Deserialize, Serializer, de::{
                                            self, Deserializer, Visitor, SeqAccess}};

/// The interrupt mode enum.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum InterruptMode {
    #[default]
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
}

impl core::convert::TryFrom<u8> for InterruptMode {
    type Error = ();

    #[inline]
    fn try_from(im: u8) -> Result<Self, Self::Error> {
        match im {
            0 => Ok(InterruptMode::Mode0),
            1 => Ok(InterruptMode::Mode1),
            2 => Ok(InterruptMode::Mode2),
            _ => Err(())
        }
    }
}

impl From<InterruptMode> for u8 {
    fn from(im: InterruptMode) -> u8 {
        im as u8
    }
}

/// A register pair: a single 16-bit store that can also be accessed as two independent
/// 8-bit halves (MSB/LSB).
///
/// Both halves are views over the same value, so writing a half is immediately visible
/// through the 16-bit accessor and vice versa.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct RegisterPair(u16);

/// A block of BC, DE and HL registers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub(crate) struct GeneralRegisters {
    pub(crate) bc: RegisterPair,
    pub(crate) de: RegisterPair,
    pub(crate) hl: RegisterPair
}

/// A block of IX and IY registers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub(crate) struct IndexRegisters {
    pub(crate) ix: RegisterPair,
    pub(crate) iy: RegisterPair
}

impl RegisterPair {
    #[inline]
    pub const fn new(val: u16) -> Self {
        RegisterPair(val)
    }

    #[inline]
    pub fn get16(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn set16(&mut self, val: u16) {
        self.0 = val;
    }

    #[inline]
    pub fn get8hi(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub fn get8lo(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub fn set8hi(&mut self, val: u8) {
        self.0 = self.0 & 0x00FF | (val as u16) << 8;
    }

    #[inline]
    pub fn set8lo(&mut self, val: u8) {
        self.0 = self.0 & 0xFF00 | val as u16;
    }

    /// Returns `(MSB, LSB)`.
    #[inline]
    pub fn get(self) -> (u8, u8) {
        (self.get8hi(), self.get8lo())
    }

    #[inline]
    pub fn set(&mut self, hi: u8, lo: u8) {
        self.0 = u16::from_be_bytes([hi, lo]);
    }

    #[inline]
    pub fn inc16(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    #[inline]
    pub fn dec16(&mut self) {
        self.0 = self.0.wrapping_sub(1);
    }

    /// Adds a signed 8-bit displacement, as in `(IX+d)`, and returns the new value.
    #[inline]
    pub fn offset(self, d: u8) -> u16 {
        self.0.wrapping_add(d as i8 as u16)
    }

    /// Subtracts 1 from the 16-bit register and returns true if the result is 0.
    #[inline]
    pub fn dec16_is_zero(&mut self) -> bool {
        self.dec16();
        self.0 == 0
    }

    /// Applies op to the 8-bit high half value and modifies it in place.
    #[inline]
    pub fn op8hi<F: FnOnce(u8) -> u8>(&mut self, op: F) {
        self.set8hi(op(self.get8hi()));
    }

    /// Applies op to the 8-bit low half value and modifies it in place.
    #[inline]
    pub fn op8lo<F: FnOnce(u8) -> u8>(&mut self, op: F) {
        self.set8lo(op(self.get8lo()));
    }
}

impl From<u16> for RegisterPair {
    fn from(uint: u16) -> Self {
        RegisterPair(uint)
    }
}

impl From<RegisterPair> for u16 {
    fn from(pair: RegisterPair) -> Self {
        pair.0
    }
}

impl fmt::Debug for RegisterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(feature = "serde")]
impl Serialize for RegisterPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer
    {
        serializer.serialize_u16(self.0)
    }
}

#[cfg(feature = "serde")]
struct RegisterPairVisitor;

#[cfg(feature = "serde")]
impl<'de> Visitor<'de> for RegisterPairVisitor {
    type Value = RegisterPair;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a 16-bit unsigned integer, a [MSB, LSB] pair or a hex string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        u16::try_from(value).map(RegisterPair)
                            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        u16::try_from(value).map(RegisterPair)
                            .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where A: SeqAccess<'de>
    {
        let hi: u8 = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let lo: u8 = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(1, &self))?;
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self))
        }
        Ok(RegisterPair(u16::from_be_bytes([hi, lo])))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
        let body = s.strip_prefix('$')
                    .or_else(|| s.strip_prefix("0x"))
                    .unwrap_or(s);
        u16::from_str_radix(body, 16).map(RegisterPair)
                                     .map_err(|_| E::invalid_value(de::Unexpected::Str(s), &self))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for RegisterPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(RegisterPairVisitor)
        }
        else {
            deserializer.deserialize_u16(RegisterPairVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::TryFrom;

    #[cfg(feature = "serde")]
    #[test]
    fn registers_serde() {
        let regs: RegisterPair = serde_json::from_str("[0,0]").unwrap();
        assert_eq!(regs, RegisterPair::default());
        let regs: RegisterPair = serde_json::from_str("0").unwrap();
        assert_eq!(regs, RegisterPair::default());
        assert!(serde_json::from_str::<RegisterPair>("65536").is_err());
        assert!(serde_json::from_str::<RegisterPair>("-1").is_err());
        assert!(serde_json::from_str::<RegisterPair>("[1,2,3]").is_err());
        let mut regs = GeneralRegisters::default();
        regs.hl.set16(42);
        regs.bc.set16(776);
        regs.de.set16(u16::MAX);
        let serialized = serde_json::to_string(&regs).unwrap();
        assert_eq!(serialized, r#"{"bc":776,"de":65535,"hl":42}"#);
        let regs_de: GeneralRegisters = serde_json::from_str(&serialized).unwrap();
        assert_eq!(regs, regs_de);
        let regs_de: GeneralRegisters = serde_json::from_str(r#"{"bc":[3,8],"de":"FFFF","hl":[0,42]}"#).unwrap();
        assert_eq!(regs, regs_de);
        let regs_de: GeneralRegisters = serde_json::from_str(r#"{"bc":"308","de":"$ffff","hl":"0x2A"}"#).unwrap();
        assert_eq!(regs, regs_de);

        let encoded: Vec<u8> = bincode::serialize(&regs).unwrap();
        assert_eq!(encoded.len(), 6);
        let regs_de: GeneralRegisters = bincode::deserialize(&encoded).unwrap();
        assert_eq!(regs, regs_de);
    }

    #[test]
    fn registers_work() {
        let mut regs = RegisterPair::default();
        assert_eq!(regs.get16(), 0u16);
        assert_eq!(regs.get(), (0u8, 0u8));
        regs.set16(0xA542);
        assert_eq!(regs.get(), (0xA5, 0x42));
        regs.set(0xFF, 0x33);
        assert_eq!(regs.get16(), 0xFF33);
        regs.set8hi(1);
        assert_eq!(regs.get16(), 0x0133);
        regs.set8lo(255);
        assert_eq!(regs.get16(), 0x01FF);
        assert_eq!(regs.get8hi(), 1);
        assert_eq!(regs.get8lo(), 255);
        regs.inc16();
        assert_eq!(regs.get16(), 0x0200);
        regs.dec16();
        assert_eq!(regs.get16(), 0x01FF);
        regs.op8lo(|v| v.wrapping_add(1));
        assert_eq!(regs.get16(), 0x0100);
        regs.op8hi(|v| v.wrapping_sub(2));
        assert_eq!(regs.get16(), 0xFF00);
        regs.set16(2);
        assert!(!regs.dec16_is_zero());
        assert_eq!(regs.get16(), 1);
        assert!(regs.dec16_is_zero());
        assert!(!regs.dec16_is_zero());
        assert_eq!(regs.get16(), 0xFFFF);
        regs.inc16();
        assert_eq!(regs.get16(), 0);
    }

    #[test]
    fn register_offset_wraps() {
        let regs = RegisterPair::new(0x1000);
        assert_eq!(regs.offset(0x7F), 0x107F);
        assert_eq!(regs.offset(0x80), 0x0F80);
        assert_eq!(regs.offset(0xFF), 0x0FFF);
        assert_eq!(RegisterPair::new(0xFFFF).offset(1), 0);
        assert_eq!(RegisterPair::new(0).offset(0xFE), 0xFFFE);
    }

    #[test]
    fn interrupt_mode_works() {
        assert_eq!(InterruptMode::default(), InterruptMode::Mode0);
        assert_eq!(InterruptMode::try_from(2), Ok(InterruptMode::Mode2));
        assert_eq!(InterruptMode::try_from(3), Err(()));
        assert_eq!(u8::from(InterruptMode::Mode1), 1);
    }
}

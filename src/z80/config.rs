/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! Run time selectable differences of the emulated Cpu.
//!
//! See: https://faqwiki.zxnet.co.uk/wiki/Z80#Differences_between_NMOS_and_CMOS_Z80s
#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// When the maskable and non-maskable interrupts may be accepted after `EI`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EiPolicy {
    /// `EI` enables interrupts at once; a pending interrupt is accepted at the very next step.
    #[default]
    Immediate,
    /// As on the real silicon: no interrupt is accepted on the step boundary directly following `EI`.
    Delayed
}

/// The technology of the emulated chip.
///
/// Only affects undocumented behaviour.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Flavour {
    /// Zilog Z80 NMOS.
    #[default]
    Nmos,
    /// Zilog Z80 CMOS.
    Cmos
}

impl Flavour {
    /// The value actually put on the data bus while executing the undocumented instruction `OUT (C),(HL)`
    /// (`ED 71`), usually described as `OUT (C),0`.
    #[inline]
    pub fn constant_out_data(self) -> u8 {
        match self {
            Flavour::Nmos => 0x00,
            Flavour::Cmos => 0xFF,
        }
    }
}

/// The Cpu configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CpuConfig {
    pub ei_policy: EiPolicy,
    pub flavour: Flavour
}

impl CpuConfig {
    pub fn with_ei_policy(mut self, ei_policy: EiPolicy) -> Self {
        self.ei_policy = ei_policy;
        self
    }

    pub fn with_flavour(mut self, flavour: Flavour) -> Self {
        self.flavour = flavour;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_works() {
        let config = CpuConfig::default();
        assert_eq!(config.ei_policy, EiPolicy::Immediate);
        assert_eq!(config.flavour, Flavour::Nmos);
        assert_eq!(config.flavour.constant_out_data(), 0);
        let config = config.with_flavour(Flavour::Cmos).with_ei_policy(EiPolicy::Delayed);
        assert_eq!(config.flavour.constant_out_data(), 0xFF);
        assert_eq!(config.ei_policy, EiPolicy::Delayed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_serde() {
        let config: CpuConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CpuConfig::default());
        let config: CpuConfig = serde_json::from_str(r#"{"eiPolicy":"delayed"}"#).unwrap();
        assert_eq!(config, CpuConfig { ei_policy: EiPolicy::Delayed, flavour: Flavour::Nmos });
        let config: CpuConfig = serde_json::from_str(r#"{"flavour":"cmos"}"#).unwrap();
        assert_eq!(config.flavour, Flavour::Cmos);
        assert_eq!(serde_json::to_string(&config).unwrap(), r#"{"eiPolicy":"immediate","flavour":"cmos"}"#);
        assert!(serde_json::from_str::<CpuConfig>(r#"{"flavour":"bm1"}"#).is_err());
    }
}

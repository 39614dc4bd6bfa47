/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! The Z80 Cpu.
//!
//! Each call to [Z80::step] executes a single instruction, accepts an interrupt or idles
//! in the halted state, and returns the number of T-states it took.
mod config;
mod instructions;
mod internal;
mod ops;
pub mod tables;

use core::mem::{replace, swap};

use arrayvec::ArrayVec;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

use crate::cpu::*;
use crate::host::*;
pub use config::*;
use internal::{Ix, Iy};
use tables::MAIN;

/// The Z80 Cpu state: the register file, the interrupt state and the T-state counter.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
#[derive(Clone, Debug)]
pub struct Z80 {
    af: RegisterPair,
    af_alt: RegisterPair,
    regs: GeneralRegisters,
    regs_alt: GeneralRegisters,
    index: IndexRegisters,
    pc: RegisterPair,
    sp: RegisterPair,
    memptr: RegisterPair,
    ir: RegisterPair,
    im: InterruptMode,
    iff1: bool,
    iff2: bool,
    halt: bool,
    last_ei: bool,
    prefix: Option<Prefix>,
    int_pending: bool,
    nmi_pending: bool,
    tacts: u64,
    config: CpuConfig,
    #[cfg_attr(feature = "serde", serde(skip))]
    opcodes: ArrayVec<u8, 4>
}

impl Default for Z80 {
    fn default() -> Self {
        Z80::new()
    }
}

/// Compares the Cpu state, ignoring the op-codes of the last step.
impl PartialEq for Z80 {
    fn eq(&self, other: &Self) -> bool {
        self.af == other.af &&
        self.af_alt == other.af_alt &&
        self.regs == other.regs &&
        self.regs_alt == other.regs_alt &&
        self.index == other.index &&
        self.pc == other.pc &&
        self.sp == other.sp &&
        self.memptr == other.memptr &&
        self.ir == other.ir &&
        self.im == other.im &&
        self.iff1 == other.iff1 &&
        self.iff2 == other.iff2 &&
        self.halt == other.halt &&
        self.last_ei == other.last_ei &&
        self.prefix == other.prefix &&
        self.int_pending == other.int_pending &&
        self.nmi_pending == other.nmi_pending &&
        self.tacts == other.tacts &&
        self.config == other.config
    }
}

impl Eq for Z80 {}

impl Z80 {
    /// Creates a new instance of Z80 with the state just after `RESET`.
    pub fn new() -> Self {
        Z80::with_config(CpuConfig::default())
    }

    /// Creates a new instance of Z80 with the given configuration and the state just after `RESET`.
    pub fn with_config(config: CpuConfig) -> Self {
        let mut cpu = Z80 {
            af: RegisterPair::default(),
            af_alt: RegisterPair::default(),
            regs: GeneralRegisters::default(),
            regs_alt: GeneralRegisters::default(),
            index: IndexRegisters::default(),
            pc: RegisterPair::default(),
            sp: RegisterPair::default(),
            memptr: RegisterPair::default(),
            ir: RegisterPair::default(),
            im: InterruptMode::default(),
            iff1: false,
            iff2: false,
            halt: false,
            last_ei: false,
            prefix: None,
            int_pending: false,
            nmi_pending: false,
            tacts: 0,
            config,
            opcodes: ArrayVec::new()
        };
        cpu.reset();
        cpu
    }

    /// Returns the current run time configuration.
    #[inline]
    pub fn config(&self) -> CpuConfig {
        self.config
    }

    /// Changes the run time configuration. Takes effect from the next step.
    #[inline]
    pub fn set_config(&mut self, config: CpuConfig) {
        self.config = config;
    }

    /// Resets the Cpu to the power-on state.
    ///
    /// `AF`, `AF'` and `SP` are set to `0xFFFF`, all the other registers to 0.
    /// Interrupts are disabled, the interrupt mode is 0, the T-state counter is 0
    /// and pending interrupt requests are cancelled. The configuration is kept.
    pub fn reset(&mut self) {
        self.af.set16(0xFFFF);
        self.af_alt.set16(0xFFFF);
        self.regs = GeneralRegisters::default();
        self.regs_alt = GeneralRegisters::default();
        self.index = IndexRegisters::default();
        self.pc.set16(0);
        self.sp.set16(0xFFFF);
        self.memptr.set16(0);
        self.ir.set16(0);
        self.im = InterruptMode::Mode0;
        self.iff1 = false;
        self.iff2 = false;
        self.halt = false;
        self.last_ei = false;
        self.prefix = None;
        self.int_pending = false;
        self.nmi_pending = false;
        self.tacts = 0;
        self.opcodes.clear();
        debug!("reset");
    }

    /// Executes a single step and returns the number of T-states it took.
    ///
    /// A step is one of:
    ///
    /// * the response to an accepted interrupt,
    /// * an idle op-code fetch while the Cpu is halted,
    /// * an execution of a single instruction,
    /// * a fetch of an index prefix immediately followed by another index prefix.
    ///   The instruction continues in the next step, in which no interrupt is accepted.
    pub fn step(&mut self, bus: &mut dyn Bus) -> u32 {
        self.opcodes.clear();
        let pc = self.pc.get16();
        let after_ei = replace(&mut self.last_ei, false);
        let cost = if let Some(prefix) = self.prefix.take() {
            let code = prefix as u8;
            let _ = self.opcodes.try_push(code);
            match prefix {
                Prefix::Xdd => self.instr_escape_index::<Ix>(bus, code),
                Prefix::Yfd => self.instr_escape_index::<Iy>(bus, code),
            }
        }
        else if let Some(cost) = self.accept_interrupt(bus, after_ei) {
            cost
        }
        else if self.halt {
            self.inc_r();
            cycles::HALT_CYCLE
        }
        else {
            let code = self.fetch_opcode(bus);
            self.execute(bus, &MAIN[code as usize], code)
        };
        self.tacts = self.tacts.wrapping_add(cost as u64);
        self.trace_step(pc, cost);
        cost
    }

    #[allow(unused_variables)]
    #[inline(always)]
    fn trace_step(&self, pc: u16, cost: u32) {
        #[cfg(debug_assertions)]
        {
            if log::log_enabled!(log::Level::Trace) {
                let mnemonic = tables::resolve(&self.opcodes).map_or("", |op| op.mnemonic());
                log::trace!("{:04x}: {:<4} {:02x?} {}T", pc, mnemonic, self.opcodes.as_slice(), cost);
            }
        }
    }

    /// Returns the T-state counter: the sum of T-states of all the steps since the last reset.
    #[inline]
    pub fn tacts(&self) -> u64 {
        self.tacts
    }

    /// Sets the T-state counter, e.g. when the host starts a new frame.
    #[inline]
    pub fn set_tacts(&mut self, tacts: u64) {
        self.tacts = tacts;
    }

    /// Requests a maskable interrupt. The request stays pending until accepted or cancelled.
    #[inline]
    pub fn request_irq(&mut self) {
        self.int_pending = true;
    }

    /// Withdraws a pending maskable interrupt request.
    #[inline]
    pub fn cancel_irq(&mut self) {
        self.int_pending = false;
    }

    #[inline]
    pub fn is_irq_pending(&self) -> bool {
        self.int_pending
    }

    /// Requests a non-maskable interrupt. The request is cleared when accepted.
    #[inline]
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    #[inline]
    pub fn is_nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    /// Returns the op-code bytes executed by the last step.
    ///
    /// Includes prefixes and the displacement of the `DD CB d op` form. Empty if the Cpu was halted.
    #[inline]
    pub fn last_opcodes(&self) -> &[u8] {
        &self.opcodes
    }

    /// Returns the index prefix carried over to the next step, if any.
    #[inline]
    pub fn get_prefix(&self) -> Option<Prefix> {
        self.prefix
    }

    #[inline]
    pub fn get_pc(&self) -> u16 {
        self.pc.get16()
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc.set16(pc);
    }

    #[inline]
    pub fn get_sp(&self) -> u16 {
        self.sp.get16()
    }

    #[inline]
    pub fn set_sp(&mut self, sp: u16) {
        self.sp.set16(sp);
    }

    #[inline]
    pub fn get_acc(&self) -> u8 {
        self.af.get8hi()
    }

    #[inline]
    pub fn set_acc(&mut self, val: u8) {
        self.af.set8hi(val);
    }

    #[inline]
    pub fn get_flags(&self) -> CpuFlags {
        CpuFlags::from_bits_retain(self.af.get8lo())
    }

    #[inline]
    pub fn set_flags(&mut self, flags: CpuFlags) {
        self.af.set8lo(flags.bits());
    }

    #[inline]
    pub fn get_i(&self) -> u8 {
        self.ir.get8hi()
    }

    #[inline]
    pub fn set_i(&mut self, i: u8) {
        self.ir.set8hi(i);
    }

    /// Returns the memory refresh register R, including its bit 7.
    #[inline]
    pub fn get_r(&self) -> u8 {
        self.ir.get8lo()
    }

    #[inline]
    pub fn set_r(&mut self, r: u8) {
        self.ir.set8lo(r);
    }

    /// Returns the value put on the address bus during the memory refresh: `I << 8 | R`.
    #[inline]
    pub fn get_ir(&self) -> u16 {
        self.ir.get16()
    }

    /// Returns the internal MEMPTR (also known as WZ) register.
    #[inline]
    pub fn get_memptr(&self) -> u16 {
        self.memptr.get16()
    }

    #[inline]
    pub fn set_memptr(&mut self, memptr: u16) {
        self.memptr.set16(memptr);
    }

    /// Returns an 8-bit register. `H` and `L` are read from the halves of the index register
    /// selected by `prefix`.
    pub fn get_reg(&self, reg: Reg8, prefix: Option<Prefix>) -> u8 {
        match (reg, prefix) {
            (Reg8::B, _) => self.regs.bc.get8hi(),
            (Reg8::C, _) => self.regs.bc.get8lo(),
            (Reg8::D, _) => self.regs.de.get8hi(),
            (Reg8::E, _) => self.regs.de.get8lo(),
            (Reg8::H, None) => self.regs.hl.get8hi(),
            (Reg8::L, None) => self.regs.hl.get8lo(),
            (Reg8::H, Some(prefix)) => self.index16_ref(prefix).get8hi(),
            (Reg8::L, Some(prefix)) => self.index16_ref(prefix).get8lo(),
            (Reg8::A, _) => self.af.get8hi(),
        }
    }

    /// Sets an 8-bit register. `H` and `L` are written to the halves of the index register
    /// selected by `prefix`.
    pub fn set_reg(&mut self, dst: Reg8, prefix: Option<Prefix>, val: u8) {
        match (dst, prefix) {
            (Reg8::B, _) => self.regs.bc.set8hi(val),
            (Reg8::C, _) => self.regs.bc.set8lo(val),
            (Reg8::D, _) => self.regs.de.set8hi(val),
            (Reg8::E, _) => self.regs.de.set8lo(val),
            (Reg8::H, None) => self.regs.hl.set8hi(val),
            (Reg8::L, None) => self.regs.hl.set8lo(val),
            (Reg8::H, Some(prefix)) => self.index16_mut(prefix).set8hi(val),
            (Reg8::L, Some(prefix)) => self.index16_mut(prefix).set8lo(val),
            (Reg8::A, _) => self.af.set8hi(val),
        }
    }

    /// Returns a register pair as a tuple of `(MSB, LSB)`.
    #[inline]
    pub fn get_reg2(&self, src: StkReg16) -> (u8, u8) {
        self.stkreg16_ref(src).get()
    }

    #[inline]
    pub fn get_alt_reg2(&self, src: StkReg16) -> (u8, u8) {
        self.stkreg16_alt_ref(src).get()
    }

    #[inline]
    pub fn get_reg16(&self, src: StkReg16) -> u16 {
        self.stkreg16_ref(src).get16()
    }

    #[inline]
    pub fn get_alt_reg16(&self, src: StkReg16) -> u16 {
        self.stkreg16_alt_ref(src).get16()
    }

    #[inline]
    pub fn set_reg2(&mut self, dst: StkReg16, hi: u8, lo: u8) {
        self.stkreg16_mut(dst).set(hi, lo);
    }

    #[inline]
    pub fn set_reg16(&mut self, dst: StkReg16, val: u16) {
        self.stkreg16_mut(dst).set16(val);
    }

    #[inline]
    pub fn get_index2(&self, prefix: Prefix) -> (u8, u8) {
        self.index16_ref(prefix).get()
    }

    #[inline]
    pub fn get_index16(&self, prefix: Prefix) -> u16 {
        self.index16_ref(prefix).get16()
    }

    #[inline]
    pub fn set_index2(&mut self, prefix: Prefix, hi: u8, lo: u8) {
        self.index16_mut(prefix).set(hi, lo);
    }

    #[inline]
    pub fn set_index16(&mut self, prefix: Prefix, val: u16) {
        self.index16_mut(prefix).set16(val);
    }

    /// Swaps `AF` with `AF'`.
    #[inline]
    pub fn ex_af_af(&mut self) {
        swap(&mut self.af, &mut self.af_alt);
    }

    /// Swaps `BC`, `DE` and `HL` with their alternates.
    #[inline]
    pub fn exx(&mut self) {
        swap(&mut self.regs, &mut self.regs_alt);
    }

    #[inline]
    pub fn is_halt(&self) -> bool {
        self.halt
    }

    /// Enters the halted state, as if `HALT` was executed.
    #[inline]
    pub fn halt(&mut self) {
        self.halt = true;
    }

    /// Returns `(IFF1, IFF2)`.
    #[inline]
    pub fn get_iffs(&self) -> (bool, bool) {
        (self.iff1, self.iff2)
    }

    #[inline]
    pub fn set_iffs(&mut self, iff1: bool, iff2: bool) {
        self.iff1 = iff1;
        self.iff2 = iff2;
    }

    #[inline]
    pub fn get_im(&self) -> InterruptMode {
        self.im
    }

    #[inline]
    pub fn set_im(&mut self, im: InterruptMode) {
        self.im = im;
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn reset_works() {
        let mut cpu = Z80::new();
        assert_eq!(cpu.get_reg16(StkReg16::AF), 0xFFFF);
        assert_eq!(cpu.get_alt_reg16(StkReg16::AF), 0xFFFF);
        assert_eq!(cpu.get_sp(), 0xFFFF);
        assert_eq!(cpu.get_pc(), 0);
        assert_eq!(cpu.get_ir(), 0);
        assert_eq!(cpu.get_iffs(), (false, false));
        assert_eq!(cpu.get_im(), InterruptMode::Mode0);
        assert_eq!(cpu.tacts(), 0);
        assert!(!cpu.is_halt());
        assert_eq!(cpu, Z80::default());
        cpu.set_pc(0x1234);
        cpu.set_reg16(StkReg16::HL, 0x5678);
        cpu.set_index16(Prefix::Yfd, 0x9ABC);
        cpu.set_iffs(true, true);
        cpu.set_im(InterruptMode::Mode2);
        cpu.set_tacts(1000);
        cpu.request_irq();
        cpu.halt();
        cpu.reset();
        assert_eq!(cpu, Z80::new());
        let cpu = Z80::with_config(CpuConfig::default().with_flavour(Flavour::Cmos));
        assert_ne!(cpu, Z80::new());
        assert_eq!(cpu.config().flavour, Flavour::Cmos);
    }

    #[test]
    fn registers_access_works() {
        let mut cpu = Z80::new();
        cpu.set_reg2(StkReg16::BC, 0x12, 0x34);
        assert_eq!(cpu.get_reg(Reg8::B, None), 0x12);
        assert_eq!(cpu.get_reg(Reg8::C, Some(Prefix::Xdd)), 0x34);
        cpu.set_index2(Prefix::Xdd, 0xAB, 0xCD);
        cpu.set_reg16(StkReg16::HL, 0x5566);
        assert_eq!(cpu.get_reg(Reg8::H, Some(Prefix::Xdd)), 0xAB);
        assert_eq!(cpu.get_reg(Reg8::L, Some(Prefix::Xdd)), 0xCD);
        assert_eq!(cpu.get_reg(Reg8::H, Some(Prefix::Yfd)), 0x00);
        assert_eq!(cpu.get_reg(Reg8::L, None), 0x66);
        cpu.set_reg(Reg8::L, Some(Prefix::Yfd), 0x77);
        assert_eq!(cpu.get_index16(Prefix::Yfd), 0x0077);
        assert_eq!(cpu.get_reg16(StkReg16::HL), 0x5566);
        cpu.set_reg(Reg8::H, Some(Prefix::Yfd), 0x88);
        assert_eq!(cpu.get_index2(Prefix::Yfd), (0x88, 0x77));
        cpu.set_acc(0x42);
        cpu.set_flags(CpuFlags::Z|CpuFlags::C);
        assert_eq!(cpu.get_reg16(StkReg16::AF), 0x4241);
        assert_eq!(cpu.get_reg(Reg8::A, None), 0x42);
        cpu.ex_af_af();
        assert_eq!(cpu.get_reg16(StkReg16::AF), 0xFFFF);
        assert_eq!(cpu.get_alt_reg2(StkReg16::AF), (0x42, 0x41));
        cpu.exx();
        assert_eq!(cpu.get_reg16(StkReg16::BC), 0);
        assert_eq!(cpu.get_alt_reg16(StkReg16::BC), 0x1234);
        assert_eq!(cpu.get_alt_reg16(StkReg16::HL), 0x5566);
        assert_eq!(cpu.get_index16(Prefix::Xdd), 0xABCD);
        cpu.set_i(0x3F);
        cpu.set_r(0x85);
        assert_eq!(cpu.get_ir(), 0x3F85);
        cpu.set_memptr(0xBEEF);
        assert_eq!(cpu.get_memptr(), 0xBEEF);
    }

    #[test]
    fn refresh_register_works() {
        let mut cpu = Z80::new();
        cpu.set_r(0xFF);
        cpu.inc_r();
        assert_eq!(cpu.get_r(), 0x80);
        cpu.set_r(0x7F);
        cpu.inc_r();
        assert_eq!(cpu.get_r(), 0x00);
        let mut ram = Ram64::with_code(0, &[0x00, 0xDD, 0x00, 0xCB, 0x00]);
        cpu.step(&mut ram);
        assert_eq!(cpu.get_r(), 1);
        cpu.step(&mut ram);
        assert_eq!(cpu.get_r(), 3);
        cpu.step(&mut ram);
        assert_eq!(cpu.get_r(), 5);
    }

    #[test]
    fn prefix_chain_works() {
        let mut cpu = Z80::new();
        let mut ram = Ram64::with_code(0, &[0xDD, 0xFD, 0xDD, 0xFD, 0x21, 0x34, 0x12]);
        assert_eq!(cpu.step(&mut ram), 4);
        assert_eq!(cpu.get_prefix(), Some(Prefix::Yfd));
        assert_eq!(cpu.last_opcodes(), &[0xDD, 0xFD]);
        assert_eq!(cpu.step(&mut ram), 4);
        assert_eq!(cpu.get_prefix(), Some(Prefix::Xdd));
        assert_eq!(cpu.step(&mut ram), 4);
        assert_eq!(cpu.get_prefix(), Some(Prefix::Yfd));
        assert_eq!(cpu.step(&mut ram), 14);
        assert_eq!(cpu.last_opcodes(), &[0xFD, 0x21]);
        assert_eq!(cpu.get_prefix(), None);
        assert_eq!(cpu.get_index16(Prefix::Yfd), 0x1234);
        assert_eq!(cpu.get_index16(Prefix::Xdd), 0);
        assert_eq!(cpu.get_reg16(StkReg16::HL), 0);
        assert_eq!(cpu.get_pc(), 7);
        assert_eq!(cpu.tacts(), 26);
        assert_eq!(cpu.get_r(), 5);
    }

    #[test]
    fn last_opcodes_work() {
        let mut cpu = Z80::new();
        let mut ram = Ram64::with_code(0, &[0xFD, 0xCB, 0x05, 0xC6, 0xED, 0xB0, 0x76]);
        cpu.set_index16(Prefix::Yfd, 0x1000);
        cpu.set_reg16(StkReg16::BC, 1);
        assert_eq!(cpu.step(&mut ram), 23);
        assert_eq!(cpu.last_opcodes(), &[0xFD, 0xCB, 0x05, 0xC6]);
        assert_eq!(ram.mem()[0x1005], 0x01);
        assert_eq!(cpu.get_memptr(), 0x1005);
        assert_eq!(tables::resolve(cpu.last_opcodes()).unwrap().mnemonic(), "SET");
        assert_eq!(cpu.step(&mut ram), 16);
        assert_eq!(cpu.last_opcodes(), &[0xED, 0xB0]);
        assert_eq!(cpu.step(&mut ram), 4);
        assert_eq!(cpu.last_opcodes(), &[0x76]);
        assert_eq!(cpu.step(&mut ram), 4);
        assert!(cpu.last_opcodes().is_empty());
    }
}

/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! Private methods shared by the instruction handlers: fetching, stack, register access and interrupts.
use log::debug;

use super::*;
use super::tables::{Opcode, MAIN, CB, DD, FD, DDCB, FDCB};
use crate::NMI_RESTART;
use crate::opconsts::RST_38H_ADDRESS;

/// The register pair playing the role of `HL` in the instructions that can be modified
/// by the index prefixes: `HL` itself, `IX` or `IY`.
pub(crate) trait HlReg {
    /// `None` for `HL`.
    const PREFIX: Option<Prefix>;
    /// The table of op-codes following the prefix.
    fn table() -> &'static [Opcode; 256];
    /// The table of bit op-codes following the prefix.
    fn cb_table() -> &'static [Opcode; 256];
    fn pair(cpu: &Z80) -> RegisterPair;
    fn pair_mut(cpu: &mut Z80) -> &mut RegisterPair;
    /// Returns the memory operand address: `(HL)` or `(ii+d)`.
    ///
    /// For the index registers fetches the displacement byte and sets MEMPTR to the address.
    fn operand_addr(cpu: &mut Z80, bus: &mut dyn Bus) -> u16;
}

pub(crate) enum Hl {}
pub(crate) enum Ix {}
pub(crate) enum Iy {}

impl HlReg for Hl {
    const PREFIX: Option<Prefix> = None;

    fn table() -> &'static [Opcode; 256] { &MAIN }

    fn cb_table() -> &'static [Opcode; 256] { &CB }

    #[inline(always)]
    fn pair(cpu: &Z80) -> RegisterPair { cpu.regs.hl }

    #[inline(always)]
    fn pair_mut(cpu: &mut Z80) -> &mut RegisterPair { &mut cpu.regs.hl }

    #[inline(always)]
    fn operand_addr(cpu: &mut Z80, _bus: &mut dyn Bus) -> u16 {
        cpu.regs.hl.get16()
    }
}

macro_rules! impl_index_reg {
    ($name:ident, $prefix:ident, $reg:ident, $table:ident, $cb_table:ident) => {
        impl HlReg for $name {
            const PREFIX: Option<Prefix> = Some(Prefix::$prefix);

            fn table() -> &'static [Opcode; 256] { &$table }

            fn cb_table() -> &'static [Opcode; 256] { &$cb_table }

            #[inline(always)]
            fn pair(cpu: &Z80) -> RegisterPair { cpu.index.$reg }

            #[inline(always)]
            fn pair_mut(cpu: &mut Z80) -> &mut RegisterPair { &mut cpu.index.$reg }

            #[inline(always)]
            fn operand_addr(cpu: &mut Z80, bus: &mut dyn Bus) -> u16 {
                let d = cpu.fetch_imm8(bus);
                let addr = cpu.index.$reg.offset(d);
                cpu.memptr.set16(addr);
                addr
            }
        }
    };
}

impl_index_reg!(Ix, Xdd, ix, DD, DDCB);
impl_index_reg!(Iy, Yfd, iy, FD, FDCB);

/// Determines the direction for the block instruction group.
#[derive(Clone, Copy, Debug)]
#[repr(i8)]
pub(super) enum BlockDelta {
    Increase = 1,
    Decrease = -1
}

impl BlockDelta {
    /// Bit 3 of the block instruction op-code selects the direction.
    #[inline(always)]
    pub(super) fn from_code(code: u8) -> Self {
        if code & 0b0000_1000 == 0 { BlockDelta::Increase } else { BlockDelta::Decrease }
    }

    #[inline(always)]
    pub(super) fn apply(self, val: u16) -> u16 {
        val.wrapping_add(self as i8 as u16)
    }
}

/// Bit 4 of the block instruction op-code makes it repeat.
#[inline(always)]
pub(super) fn is_repeating(code: u8) -> bool {
    code & 0b0001_0000 != 0
}

impl Rot {
    /// Calls one of the appropriate rotate op function.
    #[inline]
    pub(super) fn op(self, v: u8, flags: &mut CpuFlags) -> u8 {
        match self {
            Rot::RLC  => ops::rlc(v, flags),
            Rot::RRC  => ops::rrc(v, flags),
            Rot::RL   => ops::rl(v, flags),
            Rot::RR   => ops::rr(v, flags),
            Rot::SLA  => ops::sla(v, flags),
            Rot::SRA  => ops::sra(v, flags),
            Rot::SLL  => ops::sll(v, flags),
            Rot::SRL  => ops::srl(v, flags)
        }
    }
}

impl Z80 {
    /// Increases the 7 lower bits of the memory refresh register R.
    #[inline(always)]
    pub(super) fn inc_r(&mut self) {
        let r = self.ir.get8lo();
        self.ir.set8lo(r & 0x80 | r.wrapping_add(1) & 0x7F);
    }

    /// Reads the next op-code via PC in an M1 cycle and increases PC and R.
    #[inline]
    pub(super) fn fetch_opcode(&mut self, bus: &mut dyn Bus) -> u8 {
        let pc = self.pc.get16();
        let code = bus.read_opcode(pc, self.ir.get16());
        self.inc_r();
        self.pc.set16(pc.wrapping_add(1));
        let _ = self.opcodes.try_push(code);
        code
    }

    /// Reads the next byte via PC and increases PC.
    #[inline]
    pub(super) fn fetch_imm8(&mut self, bus: &mut dyn Bus) -> u8 {
        let pc = self.pc.get16();
        let val = bus.read_mem(pc);
        self.pc.set16(pc.wrapping_add(1));
        val
    }

    /// Reads the next 2 bytes via PC in LE order and increases PC.
    #[inline]
    pub(super) fn fetch_imm16(&mut self, bus: &mut dyn Bus) -> u16 {
        let pc = self.pc.get16();
        let val = bus.read_mem16(pc);
        self.pc.set16(pc.wrapping_add(2));
        val
    }

    #[inline]
    pub(super) fn push16(&mut self, bus: &mut dyn Bus, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.sp.dec16();
        bus.write_mem(self.sp.get16(), hi);
        self.sp.dec16();
        bus.write_mem(self.sp.get16(), lo);
    }

    #[inline]
    pub(super) fn pop16(&mut self, bus: &mut dyn Bus) -> u16 {
        let sp = self.sp.get16();
        let val = bus.read_mem16(sp);
        self.sp.set16(sp.wrapping_add(2));
        val
    }

    /// Writes 2 bytes in LE order and sets MEMPTR to `addr + 1`.
    #[inline]
    pub(super) fn write_mem16(&mut self, bus: &mut dyn Bus, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        let addr1 = addr.wrapping_add(1);
        bus.write_mem(addr, lo);
        bus.write_mem(addr1, hi);
        self.memptr.set16(addr1);
    }

    /// Reads 2 bytes in LE order and sets MEMPTR to `addr + 1`.
    #[inline]
    pub(super) fn read_mem16(&mut self, bus: &mut dyn Bus, addr: u16) -> u16 {
        self.memptr.set16(addr.wrapping_add(1));
        bus.read_mem16(addr)
    }

    /// Sets PC and MEMPTR to the target address.
    #[inline(always)]
    pub(super) fn jump(&mut self, addr: u16) {
        self.pc.set16(addr);
        self.memptr.set16(addr);
    }

    /// Relative jump: `d` is added to PC pointing after the displacement byte.
    #[inline(always)]
    pub(super) fn jump_rel(&mut self, d: u8) {
        self.jump(self.pc.offset(d));
    }

    #[inline]
    pub(super) fn call(&mut self, bus: &mut dyn Bus, addr: u16) {
        self.push16(bus, self.pc.get16());
        self.jump(addr);
    }

    #[inline]
    pub(super) fn ret(&mut self, bus: &mut dyn Bus) {
        let addr = self.pop16(bus);
        self.jump(addr);
    }

    /// Executes the entry of an op-code table and returns the total number of T-states.
    #[inline(always)]
    pub(super) fn execute(&mut self, bus: &mut dyn Bus, op: &Opcode, code: u8) -> u32 {
        op.tacts() + (op.exec)(self, bus, code)
    }

    /// Returns a value of the 16-bit register with `HL` substituted with `I`.
    #[inline]
    pub(super) fn get_rr<I: HlReg>(&self, rr: Reg16) -> u16 {
        match rr {
            Reg16::BC => self.regs.bc.get16(),
            Reg16::DE => self.regs.de.get16(),
            Reg16::HL => I::pair(self).get16(),
            Reg16::SP => self.sp.get16(),
        }
    }

    /// Returns a mutable reference to the 16-bit register with `HL` substituted with `I`.
    #[inline]
    pub(super) fn rr_mut<I: HlReg>(&mut self, rr: Reg16) -> &mut RegisterPair {
        match rr {
            Reg16::BC => &mut self.regs.bc,
            Reg16::DE => &mut self.regs.de,
            Reg16::HL => I::pair_mut(self),
            Reg16::SP => &mut self.sp,
        }
    }

    #[inline]
    pub(super) fn stkreg16_ref(&self, qq: StkReg16) -> &RegisterPair {
        match qq {
            StkReg16::BC => &self.regs.bc,
            StkReg16::DE => &self.regs.de,
            StkReg16::HL => &self.regs.hl,
            StkReg16::AF => &self.af,
        }
    }

    #[inline]
    pub(super) fn stkreg16_mut(&mut self, qq: StkReg16) -> &mut RegisterPair {
        match qq {
            StkReg16::BC => &mut self.regs.bc,
            StkReg16::DE => &mut self.regs.de,
            StkReg16::HL => &mut self.regs.hl,
            StkReg16::AF => &mut self.af,
        }
    }

    #[inline]
    pub(super) fn stkreg16_alt_ref(&self, qq: StkReg16) -> &RegisterPair {
        match qq {
            StkReg16::BC => &self.regs_alt.bc,
            StkReg16::DE => &self.regs_alt.de,
            StkReg16::HL => &self.regs_alt.hl,
            StkReg16::AF => &self.af_alt,
        }
    }

    #[inline]
    pub(super) fn index16_ref(&self, prefix: Prefix) -> &RegisterPair {
        match prefix {
            Prefix::Xdd => &self.index.ix,
            Prefix::Yfd => &self.index.iy,
        }
    }

    #[inline]
    pub(super) fn index16_mut(&mut self, prefix: Prefix) -> &mut RegisterPair {
        match prefix {
            Prefix::Xdd => &mut self.index.ix,
            Prefix::Yfd => &mut self.index.iy,
        }
    }

    /// Applies `op` to the accumulator, updating the flags.
    #[inline(always)]
    pub(super) fn acc_op<F: FnOnce(u8, &mut CpuFlags) -> u8>(&mut self, op: F) {
        let mut flags = self.get_flags();
        let acc = op(self.af.get8hi(), &mut flags);
        self.af.set(acc, flags.bits());
    }

    /// Modifies the flags only.
    #[inline(always)]
    pub(super) fn flags_op<F: FnOnce(&mut CpuFlags)>(&mut self, op: F) {
        let mut flags = self.get_flags();
        op(&mut flags);
        self.set_flags(flags);
    }

    /// Performs the 8-bit arithmetic or logic operation on the accumulator.
    #[inline]
    pub(super) fn op8(&mut self, op: Ops8, val: u8) {
        match op {
            Ops8::ADD => self.acc_op(|a, flags| ops::add(a, val, flags)),
            Ops8::ADC => self.acc_op(|a, flags| ops::adc(a, val, flags)),
            Ops8::SUB => self.acc_op(|a, flags| ops::sub(a, val, flags)),
            Ops8::SBC => self.acc_op(|a, flags| ops::sbc(a, val, flags)),
            Ops8::AND => self.acc_op(|a, flags| ops::and(a, val, flags)),
            Ops8::XOR => self.acc_op(|a, flags| ops::xor(a, val, flags)),
            Ops8::OR  => self.acc_op(|a, flags| ops::or(a, val, flags)),
            Ops8::CP  => self.acc_op(|a, flags| { ops::cp(a, val, flags); a }),
        }
    }

    /// Applies `op` to the flags and a value read from memory, writes the result back.
    #[inline]
    pub(super) fn mem_op<F: FnOnce(u8, &mut CpuFlags) -> u8>(
            &mut self, bus: &mut dyn Bus, addr: u16, op: F
        ) -> u8
    {
        let mut flags = self.get_flags();
        let val = op(bus.read_mem(addr), &mut flags);
        self.set_flags(flags);
        bus.write_mem(addr, val);
        val
    }

    /// Exchanges the top of the stack with `val` and returns the previous top, which also goes to MEMPTR.
    #[inline]
    pub(super) fn ex_sp(&mut self, bus: &mut dyn Bus, val: u16) -> u16 {
        let sp = self.sp.get16();
        let top = bus.read_mem16(sp);
        let [lo, hi] = val.to_le_bytes();
        bus.write_mem(sp.wrapping_add(1), hi);
        bus.write_mem(sp, lo);
        self.memptr.set16(top);
        top
    }

    #[inline]
    pub(super) fn leave_halt(&mut self) {
        self.halt = false;
    }

    /// Accepts a pending interrupt if the interrupt state allows it.
    ///
    /// Returns the number of T-states the interrupt response took.
    pub(super) fn accept_interrupt(&mut self, bus: &mut dyn Bus, after_ei: bool) -> Option<u32> {
        if after_ei && self.config.ei_policy == EiPolicy::Delayed {
            return None
        }
        if self.nmi_pending {
            self.nmi_pending = false;
            return Some(self.nmi(bus))
        }
        if self.int_pending && self.iff1 {
            self.int_pending = false;
            return Some(self.irq(bus))
        }
        None
    }

    pub(super) fn nmi(&mut self, bus: &mut dyn Bus) -> u32 {
        self.leave_halt();
        self.iff1 = false;
        self.inc_r();
        let pc = self.pc.get16();
        debug!("NMI accepted at {:04x}", pc);
        self.call(bus, NMI_RESTART);
        cycles::NMI_CYCLE
    }

    pub(super) fn irq(&mut self, bus: &mut dyn Bus) -> u32 {
        self.leave_halt();
        self.iff1 = false;
        self.iff2 = false;
        self.inc_r();
        let pc = self.pc.get16();
        let data = bus.irq_data(pc);
        debug!("IRQ accepted in {:?} at {:04x}, bus data: {:02x}", self.im, pc, data);
        match self.im {
            InterruptMode::Mode0 => {
                let _ = self.opcodes.try_push(data);
                cycles::IM0_EXTRA + self.execute(bus, &MAIN[data as usize], data)
            }
            InterruptMode::Mode1 => {
                self.call(bus, RST_38H_ADDRESS);
                cycles::IM1_CYCLE
            }
            InterruptMode::Mode2 => {
                let vector = u16::from_le_bytes([data, self.ir.get8hi()]);
                let addr = bus.read_mem16(vector);
                self.call(bus, addr);
                cycles::IM2_CYCLE
            }
        }
    }
}

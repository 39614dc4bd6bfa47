/*
    z80core: a table driven, T-state exact Z80 CPU core.
    Copyright (C) 2019-2024  Rafal Michalski

    For the full copyright notice, see the lib.rs file.
*/
//! Handlers of all the Z80 instructions referenced by the op-code tables.
//!
//! Every handler receives the op-code that selected it, which is further parsed to recognize
//! the operands, the condition or the kind of an arithmetic or bitwise operation.
//!
//! Handlers generic over [HlReg] serve both the unprefixed op-codes and their indexed forms.
//!
//! A handler returns the number of T-states it took beyond the cost declared by its table entry:
//! 0 unless a conditional branch was taken or a block instruction repeats.
//!
//! All flag modifying operations are delegated to the functions in the z80::ops module.
use log::{debug, trace};

use super::*;
use super::internal::{HlReg, Hl, BlockDelta, is_repeating};
use super::tables::{CB, ED};

/// T-states added by a taken `JR cc`, `DJNZ` or a repeated block instruction.
const JR_TAKEN: u32 = 5;
/// T-states added by a taken `RET cc`.
const RET_TAKEN: u32 = 6;
/// T-states added by a taken `CALL cc`.
const CALL_TAKEN: u32 = 7;
const BLOCK_REPEAT: u32 = 5;

impl Z80 {
//#################################################################################//
//################################### ESCAPES #####################################//
//#################################################################################//

    pub(super) fn instr_escape_cb(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let code = self.fetch_opcode(bus);
        self.execute(bus, &CB[code as usize], code)
    }

    pub(super) fn instr_escape_ed(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let code = self.fetch_opcode(bus);
        self.execute(bus, &ED[code as usize], code)
    }

    pub(super) fn instr_escape_index<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let code = self.fetch_opcode(bus);
        self.execute(bus, &I::table()[code as usize], code)
    }

    /// `DD CB d op`: the displacement and the op-code are read in normal memory cycles.
    pub(super) fn instr_escape_index_cb<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let d = self.fetch_imm8(bus);
        let code = self.fetch_imm8(bus);
        let _ = self.opcodes.try_push(d);
        let _ = self.opcodes.try_push(code);
        self.memptr.set16(I::pair(self).offset(d));
        self.execute(bus, &I::cb_table()[code as usize], code)
    }

    /// An index prefix directly followed by another one. The previous prefix is ignored
    /// and the new one is carried to the next step.
    pub(super) fn instr_chain_prefix(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        self.prefix = Prefix::try_from(code).ok();
        trace!("ignored prefix before: {:02x}", code);
        0
    }

//#################################################################################//
//############################## MISC AND CONTROL #################################//
//#################################################################################//

    pub(super) fn instr_nop(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        0
    }

    pub(super) fn instr_halt(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.halt = true;
        debug!("HALT at {:04x}", self.pc.get16().wrapping_sub(1));
        0
    }

    pub(super) fn instr_di(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.iff1 = false;
        self.iff2 = false;
        0
    }

    pub(super) fn instr_ei(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.iff1 = true;
        self.iff2 = true;
        self.last_ei = true;
        0
    }

    /// `IM 0`, `IM 1`, `IM 2` and their mirrors.
    pub(super) fn instr_im(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        self.im = match (code >> 3) & 3 {
            2 => InterruptMode::Mode1,
            3 => InterruptMode::Mode2,
            _ => InterruptMode::Mode0
        };
        0
    }

    pub(super) fn instr_ex_af_af(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.ex_af_af();
        0
    }

    pub(super) fn instr_exx(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.exx();
        0
    }

    pub(super) fn instr_ex_de_hl(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        core::mem::swap(&mut self.regs.de, &mut self.regs.hl);
        0
    }

    pub(super) fn instr_ex_sp_hl<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let val = I::pair(self).get16();
        let top = self.ex_sp(bus, val);
        I::pair_mut(self).set16(top);
        0
    }

//#################################################################################//
//############################### ACCUMULATOR #####################################//
//#################################################################################//

    /// `RLCA`, `RRCA`, `RLA`, `RRA`, `DAA`, `CPL`, `SCF` and `CCF`.
    pub(super) fn instr_acc_op(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        match code {
            0x07 => self.acc_op(ops::rlca),
            0x0F => self.acc_op(ops::rrca),
            0x17 => self.acc_op(ops::rla),
            0x1F => self.acc_op(ops::rra),
            0x27 => self.acc_op(ops::daa),
            0x2F => self.acc_op(ops::cpl),
            0x37 => self.acc_op(|a, flags| { ops::scf(a, flags); a }),
            _    => self.acc_op(|a, flags| { ops::ccf(a, flags); a }),
        }
        0
    }

    pub(super) fn instr_neg(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.acc_op(ops::neg);
        0
    }

    /// `RRD` and `RLD`.
    pub(super) fn instr_rrd_rld(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let hl = self.regs.hl.get16();
        let mut flags = self.get_flags();
        let (acc, val) = if code == 0x67 {
            ops::rrd(self.af.get8hi(), bus.read_mem(hl), &mut flags)
        }
        else {
            ops::rld(self.af.get8hi(), bus.read_mem(hl), &mut flags)
        };
        self.af.set(acc, flags.bits());
        bus.write_mem(hl, val);
        self.memptr.set16(hl.wrapping_add(1));
        0
    }

    /// `LD I,A`, `LD R,A`, `LD A,I` and `LD A,R`.
    pub(super) fn instr_ld_ir(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let acc = self.af.get8hi();
        match code {
            0x47 => self.ir.set8hi(acc),
            0x4F => self.ir.set8lo(acc),
            _ => {
                let ir = if code == 0x57 { self.ir.get8hi() } else { self.ir.get8lo() };
                let iff2 = self.iff2;
                self.acc_op(|_, flags| { ops::ld_a_ir(ir, iff2, flags); ir });
            }
        }
        0
    }

//#################################################################################//
//################################## 8-BIT LOAD ###################################//
//#################################################################################//

    /// `LD r,r'`; `H` and `L` on either side are substituted with the index halves.
    pub(super) fn instr_ld_r_r<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let val = self.get_reg(Reg8::operand_b2_0(code), I::PREFIX);
        self.set_reg(Reg8::operand_b5_3(code), I::PREFIX, val);
        0
    }

    pub(super) fn instr_ld_r_n<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let n = self.fetch_imm8(bus);
        self.set_reg(Reg8::operand_b5_3(code), I::PREFIX, n);
        0
    }

    /// `LD r,(HL)` and `LD r,(ii+d)`. The target is never an index half.
    pub(super) fn instr_ld_r_mem<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = I::operand_addr(self, bus);
        let val = bus.read_mem(addr);
        self.set_reg(Reg8::operand_b5_3(code), None, val);
        0
    }

    /// `LD (HL),r` and `LD (ii+d),r`. The source is never an index half.
    pub(super) fn instr_ld_mem_r<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = I::operand_addr(self, bus);
        bus.write_mem(addr, self.get_reg(Reg8::operand_b2_0(code), None));
        0
    }

    pub(super) fn instr_ld_mem_n<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = I::operand_addr(self, bus);
        let n = self.fetch_imm8(bus);
        bus.write_mem(addr, n);
        0
    }

    /// `LD (BC),A` and `LD (DE),A`.
    pub(super) fn instr_ld_rr_a(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.get_rr::<Hl>(Reg16::from(code));
        self.ld_mem8_from_a(bus, addr);
        0
    }

    /// `LD A,(BC)` and `LD A,(DE)`.
    pub(super) fn instr_ld_a_rr(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.get_rr::<Hl>(Reg16::from(code));
        self.ld_a_from_mem8(bus, addr);
        0
    }

    pub(super) fn instr_ld_mem_a(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        self.ld_mem8_from_a(bus, addr);
        0
    }

    pub(super) fn instr_ld_a_mem(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        self.ld_a_from_mem8(bus, addr);
        0
    }

    #[inline]
    fn ld_mem8_from_a(&mut self, bus: &mut dyn Bus, addr: u16) {
        let acc = self.af.get8hi();
        bus.write_mem(addr, acc);
        // MEMPTR = A:(addr + 1)
        self.memptr.set(acc, (addr as u8).wrapping_add(1));
    }

    #[inline]
    fn ld_a_from_mem8(&mut self, bus: &mut dyn Bus, addr: u16) {
        self.af.set8hi(bus.read_mem(addr));
        self.memptr.set16(addr.wrapping_add(1));
    }

//#################################################################################//
//################################# 16-BIT LOAD ###################################//
//#################################################################################//

    pub(super) fn instr_ld_rr_nn<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let nn = self.fetch_imm16(bus);
        self.rr_mut::<I>(Reg16::from(code)).set16(nn);
        0
    }

    /// `LD (nn),HL` and `LD (nn),ii`.
    pub(super) fn instr_ld_mem_hl<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        let val = I::pair(self).get16();
        self.write_mem16(bus, addr, val);
        0
    }

    /// `LD HL,(nn)` and `LD ii,(nn)`.
    pub(super) fn instr_ld_hl_mem<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        let val = self.read_mem16(bus, addr);
        I::pair_mut(self).set16(val);
        0
    }

    /// `LD (nn),rr` of the `ED` group.
    pub(super) fn instr_ld_mem_rr(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        let val = self.get_rr::<Hl>(Reg16::from(code));
        self.write_mem16(bus, addr, val);
        0
    }

    /// `LD rr,(nn)` of the `ED` group.
    pub(super) fn instr_ld_rr_mem(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        let val = self.read_mem16(bus, addr);
        self.rr_mut::<Hl>(Reg16::from(code)).set16(val);
        0
    }

    pub(super) fn instr_ld_sp_hl<I: HlReg>(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.sp = I::pair(self);
        0
    }

    /// `PUSH qq`; `HL` substituted with `I`.
    pub(super) fn instr_push<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let val = match StkReg16::from(code) {
            StkReg16::HL => I::pair(self).get16(),
            qq => self.stkreg16_ref(qq).get16()
        };
        self.push16(bus, val);
        0
    }

    /// `POP qq`; `HL` substituted with `I`.
    pub(super) fn instr_pop<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let val = self.pop16(bus);
        match StkReg16::from(code) {
            StkReg16::HL => I::pair_mut(self).set16(val),
            qq => self.stkreg16_mut(qq).set16(val)
        }
        0
    }

//#################################################################################//
//############################## 8-BIT ARITHMETIC #################################//
//#################################################################################//

    pub(super) fn instr_alu_r<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let val = self.get_reg(Reg8::operand_b2_0(code), I::PREFIX);
        self.op8(Ops8::from(code), val);
        0
    }

    pub(super) fn instr_alu_mem<I: HlReg>(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = I::operand_addr(self, bus);
        let val = bus.read_mem(addr);
        self.op8(Ops8::from(code), val);
        0
    }

    pub(super) fn instr_alu_n(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let n = self.fetch_imm8(bus);
        self.op8(Ops8::from(code), n);
        0
    }

    pub(super) fn instr_inc_r<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let reg = Reg8::operand_b5_3(code);
        let mut flags = self.get_flags();
        let val = ops::inc(self.get_reg(reg, I::PREFIX), &mut flags);
        self.set_reg(reg, I::PREFIX, val);
        self.set_flags(flags);
        0
    }

    pub(super) fn instr_dec_r<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let reg = Reg8::operand_b5_3(code);
        let mut flags = self.get_flags();
        let val = ops::dec(self.get_reg(reg, I::PREFIX), &mut flags);
        self.set_reg(reg, I::PREFIX, val);
        self.set_flags(flags);
        0
    }

    pub(super) fn instr_inc_mem<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = I::operand_addr(self, bus);
        self.mem_op(bus, addr, ops::inc);
        0
    }

    pub(super) fn instr_dec_mem<I: HlReg>(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = I::operand_addr(self, bus);
        self.mem_op(bus, addr, ops::dec);
        0
    }

//#################################################################################//
//############################# 16-BIT ARITHMETIC #################################//
//#################################################################################//

    /// `ADD HL,rr` and `ADD ii,rr`; the source `HL` is substituted too.
    pub(super) fn instr_add_hl_rr<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let val = self.get_rr::<I>(Reg16::from(code));
        let hl = I::pair(self).get16();
        let mut flags = self.get_flags();
        let res = ops::add16(hl, val, &mut flags);
        self.set_flags(flags);
        I::pair_mut(self).set16(res);
        self.memptr.set16(hl.wrapping_add(1));
        0
    }

    /// `SBC HL,rr` and `ADC HL,rr`.
    pub(super) fn instr_adc_sbc_hl_rr(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let val = self.get_rr::<Hl>(Reg16::from(code));
        let hl = self.regs.hl.get16();
        let mut flags = self.get_flags();
        let res = if code & 0b0000_1000 == 0 {
            ops::sbc16(hl, val, &mut flags)
        }
        else {
            ops::adc16(hl, val, &mut flags)
        };
        self.set_flags(flags);
        self.regs.hl.set16(res);
        self.memptr.set16(hl.wrapping_add(1));
        0
    }

    pub(super) fn instr_inc_rr<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        self.rr_mut::<I>(Reg16::from(code)).inc16();
        0
    }

    pub(super) fn instr_dec_rr<I: HlReg>(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        self.rr_mut::<I>(Reg16::from(code)).dec16();
        0
    }

//#################################################################################//
//################################## JUMP GROUP ###################################//
//#################################################################################//

    pub(super) fn instr_jp(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        self.jump(addr);
        0
    }

    /// `JP cc,nn`: MEMPTR is set to `nn` even if the jump is not taken.
    pub(super) fn instr_jp_cc(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        self.memptr.set16(addr);
        if Condition::from(code).is_satisfied(self.get_flags()) {
            self.pc.set16(addr);
        }
        0
    }

    /// `JP (HL)` and `JP (ii)`.
    pub(super) fn instr_jp_hl<I: HlReg>(&mut self, _bus: &mut dyn Bus, _code: u8) -> u32 {
        self.pc = I::pair(self);
        0
    }

    pub(super) fn instr_jr(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let d = self.fetch_imm8(bus);
        self.jump_rel(d);
        0
    }

    pub(super) fn instr_jr_cc(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let d = self.fetch_imm8(bus);
        if Condition::from_jr_subset(code).is_satisfied(self.get_flags()) {
            self.jump_rel(d);
            JR_TAKEN
        }
        else {
            0
        }
    }

    pub(super) fn instr_djnz(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let d = self.fetch_imm8(bus);
        let b = self.regs.bc.get8hi().wrapping_sub(1);
        self.regs.bc.set8hi(b);
        if b != 0 {
            self.jump_rel(d);
            JR_TAKEN
        }
        else {
            0
        }
    }

//#################################################################################//
//############################## CALL AND RETURN ##################################//
//#################################################################################//

    pub(super) fn instr_call(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        self.call(bus, addr);
        0
    }

    /// `CALL cc,nn`: MEMPTR is set to `nn` even if the call is not taken.
    pub(super) fn instr_call_cc(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.fetch_imm16(bus);
        self.memptr.set16(addr);
        if Condition::from(code).is_satisfied(self.get_flags()) {
            self.call(bus, addr);
            CALL_TAKEN
        }
        else {
            0
        }
    }

    pub(super) fn instr_ret(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        self.ret(bus);
        0
    }

    pub(super) fn instr_ret_cc(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        if Condition::from(code).is_satisfied(self.get_flags()) {
            self.ret(bus);
            RET_TAKEN
        }
        else {
            0
        }
    }

    /// `RETN`, `RETI` and their mirrors; all of them copy IFF2 to IFF1.
    pub(super) fn instr_retn(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        if code == 0x4D {
            bus.reti(self.pc.get16());
        }
        self.iff1 = self.iff2;
        self.ret(bus);
        0
    }

    pub(super) fn instr_rst(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        self.call(bus, parse_restart_address(code));
        0
    }

//#################################################################################//
//################################## INPUT/OUTPUT #################################//
//#################################################################################//

    pub(super) fn instr_in_a_n(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let n = self.fetch_imm8(bus);
        let port = u16::from_le_bytes([n, self.af.get8hi()]);
        self.af.set8hi(bus.read_io(port));
        self.memptr.set16(port.wrapping_add(1));
        0
    }

    pub(super) fn instr_out_n_a(&mut self, bus: &mut dyn Bus, _code: u8) -> u32 {
        let n = self.fetch_imm8(bus);
        let acc = self.af.get8hi();
        bus.write_io(u16::from_le_bytes([n, acc]), acc);
        // MEMPTR = A:(n + 1)
        self.memptr.set(acc, n.wrapping_add(1));
        0
    }

    /// `IN r,(C)`; the `ED 70` form only sets the flags.
    pub(super) fn instr_in_r_c(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let bc = self.regs.bc.get16();
        let val = bus.read_io(bc);
        self.flags_op(|flags| ops::io(val, flags));
        if code != 0x70 {
            self.set_reg(Reg8::operand_b5_3(code), None, val);
        }
        self.memptr.set16(bc.wrapping_add(1));
        0
    }

    /// `OUT (C),r`; the `ED 71` form outputs a constant depending on the flavour.
    pub(super) fn instr_out_c_r(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let bc = self.regs.bc.get16();
        let val = if code == 0x71 {
            self.config.flavour.constant_out_data()
        }
        else {
            self.get_reg(Reg8::operand_b5_3(code), None)
        };
        bus.write_io(bc, val);
        self.memptr.set16(bc.wrapping_add(1));
        0
    }

//#################################################################################//
//#################################### BLOCK ######################################//
//#################################################################################//

    /// Moves PC back to the beginning of the repeated instruction.
    #[inline]
    fn block_repeat(&mut self) -> u32 {
        let pc = self.pc.get16();
        self.pc.set16(pc.wrapping_sub(2));
        BLOCK_REPEAT
    }

    /// `LDI`, `LDD`, `LDIR` and `LDDR`.
    pub(super) fn instr_ldx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let delta = BlockDelta::from_code(code);
        let hl = self.regs.hl.get16();
        let de = self.regs.de.get16();
        let val = bus.read_mem(hl);
        bus.write_mem(de, val);
        self.regs.hl.set16(delta.apply(hl));
        self.regs.de.set16(delta.apply(de));
        let is_over = self.regs.bc.dec16_is_zero();
        let acc = self.af.get8hi();
        self.flags_op(|flags| ops::ldx(acc, val, is_over, flags));
        if is_repeating(code) && !is_over {
            // MEMPTR = PC + 1
            self.memptr.set16(self.pc.get16().wrapping_sub(1));
            return self.block_repeat()
        }
        0
    }

    /// `CPI`, `CPD`, `CPIR` and `CPDR`.
    pub(super) fn instr_cpx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let delta = BlockDelta::from_code(code);
        let hl = self.regs.hl.get16();
        let val = bus.read_mem(hl);
        self.regs.hl.set16(delta.apply(hl));
        let is_over = self.regs.bc.dec16_is_zero();
        let acc = self.af.get8hi();
        let mut found = false;
        self.flags_op(|flags| found = ops::cpx(acc, val, is_over, flags));
        if is_repeating(code) && !is_over && !found {
            // MEMPTR = PC + 1
            self.memptr.set16(self.pc.get16().wrapping_sub(1));
            return self.block_repeat()
        }
        // MEMPTR = MEMPTR +/- 1
        self.memptr.set16(delta.apply(self.memptr.get16()));
        0
    }

    /// `INI`, `IND`, `INIR` and `INDR`.
    pub(super) fn instr_inx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let delta = BlockDelta::from_code(code);
        let bc = self.regs.bc.get16();
        let val = bus.read_io(bc);
        let hl = self.regs.hl.get16();
        bus.write_mem(hl, val);
        // MEMPTR = BC_before_decrementing_B +/- 1
        self.memptr.set16(delta.apply(bc));
        let (b, c) = self.regs.bc.get();
        let b = b.wrapping_sub(1);
        self.regs.bc.set8hi(b);
        self.regs.hl.set16(delta.apply(hl));
        self.flags_op(|flags| ops::iox(val, b, (delta.apply(c as u16)) as u8, flags));
        if is_repeating(code) && b != 0 {
            return self.block_repeat()
        }
        0
    }

    /// `OUTI`, `OUTD`, `OTIR` and `OTDR`.
    pub(super) fn instr_outx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let delta = BlockDelta::from_code(code);
        let hl = self.regs.hl.get16();
        let val = bus.read_mem(hl);
        let b = self.regs.bc.get8hi().wrapping_sub(1);
        self.regs.bc.set8hi(b);
        let bc = self.regs.bc.get16();
        bus.write_io(bc, val);
        // MEMPTR = BC_after_decrementing_B +/- 1
        self.memptr.set16(delta.apply(bc));
        let hl = delta.apply(hl);
        self.regs.hl.set16(hl);
        self.flags_op(|flags| ops::iox(val, b, hl as u8, flags));
        if is_repeating(code) && b != 0 {
            return self.block_repeat()
        }
        0
    }

//#################################################################################//
//############################ BIT, ROTATE AND SHIFT ##############################//
//#################################################################################//

    pub(super) fn instr_rot_r(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let reg = Reg8::operand_b2_0(code);
        let mut flags = self.get_flags();
        let val = Rot::from(code).op(self.get_reg(reg, None), &mut flags);
        self.set_reg(reg, None, val);
        self.set_flags(flags);
        0
    }

    pub(super) fn instr_rot_mem(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let hl = self.regs.hl.get16();
        self.mem_op(bus, hl, |v, flags| Rot::from(code).op(v, flags));
        0
    }

    pub(super) fn instr_bit_r(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let val = self.get_reg(Reg8::operand_b2_0(code), None);
        self.flags_op(|flags| ops::bit(parse_code_bitnum(code), val, val, flags));
        0
    }

    /// `BIT n,(HL)`: the undocumented flags come from MEMPTR.
    pub(super) fn instr_bit_mem(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let val = bus.read_mem(self.regs.hl.get16());
        let b35 = self.memptr.get8hi();
        self.flags_op(|flags| ops::bit(parse_code_bitnum(code), val, b35, flags));
        0
    }

    /// `RES n,r` and `SET n,r`.
    pub(super) fn instr_res_set_r(&mut self, _bus: &mut dyn Bus, code: u8) -> u32 {
        let reg = Reg8::operand_b2_0(code);
        let val = res_set(code, self.get_reg(reg, None));
        self.set_reg(reg, None, val);
        0
    }

    /// `RES n,(HL)` and `SET n,(HL)`.
    pub(super) fn instr_res_set_mem(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let hl = self.regs.hl.get16();
        let val = res_set(code, bus.read_mem(hl));
        bus.write_mem(hl, val);
        0
    }

    /// `RLC (ii+d)` etc. MEMPTR holds the address. Unless the op-code addresses `(HL)`,
    /// the result is also copied to a register.
    pub(super) fn instr_rot_idx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.memptr.get16();
        let val = self.mem_op(bus, addr, |v, flags| Rot::from(code).op(v, flags));
        self.copy_idx_result(code, val);
        0
    }

    /// `BIT n,(ii+d)`: the undocumented flags come from the address MSB.
    pub(super) fn instr_bit_idx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let val = bus.read_mem(self.memptr.get16());
        let b35 = self.memptr.get8hi();
        self.flags_op(|flags| ops::bit(parse_code_bitnum(code), val, b35, flags));
        0
    }

    /// `RES n,(ii+d)` and `SET n,(ii+d)` with the optional register copy.
    pub(super) fn instr_res_set_idx(&mut self, bus: &mut dyn Bus, code: u8) -> u32 {
        let addr = self.memptr.get16();
        let val = res_set(code, bus.read_mem(addr));
        bus.write_mem(addr, val);
        self.copy_idx_result(code, val);
        0
    }

    #[inline]
    fn copy_idx_result(&mut self, code: u8, val: u8) {
        if code & 7 != 6 {
            self.set_reg(Reg8::operand_b2_0(code), None, val);
        }
    }
}

/// Bit 6 of the op-code selects `SET` over `RES`.
#[inline]
fn res_set(code: u8, val: u8) -> u8 {
    let b = parse_code_bitnum(code);
    if code & 0b0100_0000 == 0 { ops::res(b, val) } else { ops::set(b, val) }
}

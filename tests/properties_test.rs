//! Tests invariants of the Cpu on random inputs.
use rand::prelude::*;
use z80core::{host::Ram64, z80::tables::resolve, *};

fn bcd(n: u8) -> u8 {
    (n / 10) << 4 | n % 10
}

fn run(code: &[u8], setup: impl FnOnce(&mut Z80)) -> Z80 {
    let mut cpu = Z80::new();
    let mut ram = Ram64::with_code(0, code);
    ram.mem_mut()[code.len()] = 0x76;
    setup(&mut cpu);
    while !cpu.is_halt() {
        cpu.step(&mut ram);
    }
    cpu
}

#[test]
fn daa_corrects_bcd_arithmetic() {
    let mut cpu = Z80::new();
    let mut ram = Ram64::new();
    for a in 0..100u8 {
        for b in 0..100u8 {
            // LD A,a; ADD A,b or SUB b; DAA
            for (op, res, carry) in [(0xC6, (a + b) % 100, a + b >= 100),
                                     (0xD6, (100 + a - b) % 100, a < b)] {
                ram.load(0, &[0x3E, bcd(a), op, bcd(b), 0x27]);
                cpu.reset();
                for _ in 0..3 {
                    cpu.step(&mut ram);
                }
                assert_eq!(cpu.get_acc(), bcd(res), "{} {:02x} {}", a, op, b);
                assert_eq!(cpu.get_flags().cf(), carry);
                assert_eq!(cpu.get_flags().nf(), op == 0xD6);
            }
        }
    }
}

#[test]
fn daa_is_idempotent_on_corrected_bytes() {
    let mut cpu = Z80::new();
    let mut ram = Ram64::with_code(0, &[0x27, 0x27]);
    for acc in 0..=255u8 {
        cpu.reset();
        cpu.set_acc(acc);
        cpu.set_flags(CpuFlags::empty());
        cpu.step(&mut ram);
        let corrected = cpu.get_acc();
        cpu.set_flags(CpuFlags::empty());
        cpu.step(&mut ram);
        assert_eq!(cpu.get_acc(), corrected, "{:02x}", acc);
    }
    for n in 0..100 {
        cpu.reset();
        cpu.set_acc(bcd(n));
        cpu.set_flags(CpuFlags::empty());
        cpu.step(&mut ram);
        assert_eq!(cpu.get_acc(), bcd(n));
        assert!(!cpu.get_flags().cf());
    }
}

#[test]
fn inc_dec_preserve_carry() {
    let mut rng = thread_rng();
    for _ in 0..256 {
        let val: u8 = rng.gen();
        let flags = CpuFlags::from_bits_retain(rng.gen());
        // INC B; DEC B; DEC (HL); INC (HL)
        let cpu = run(&[0x04, 0x05, 0x35, 0x34], |cpu| {
            cpu.set_reg2(StkReg16::BC, val, 0);
            cpu.set_reg16(StkReg16::HL, 0x8000);
            cpu.set_flags(flags);
        });
        assert_eq!(cpu.get_reg(Reg8::B, None), val);
        assert_eq!(cpu.get_flags().cf(), flags.cf());
    }
}

#[test]
fn push_pop_round_trip() {
    let mut rng = thread_rng();
    for _ in 0..64 {
        let vals: [u16; 4] = rng.gen();
        let sp: u16 = rng.gen_range(0x4000..0xFFF0);
        // PUSH AF; PUSH BC; PUSH DE; PUSH HL; POP AF; POP BC; POP DE; POP HL
        let cpu = run(&[0xF5, 0xC5, 0xD5, 0xE5, 0xF1, 0xC1, 0xD1, 0xE1], |cpu| {
            cpu.set_sp(sp);
            cpu.set_reg16(StkReg16::AF, vals[0]);
            cpu.set_reg16(StkReg16::BC, vals[1]);
            cpu.set_reg16(StkReg16::DE, vals[2]);
            cpu.set_reg16(StkReg16::HL, vals[3]);
        });
        assert_eq!(cpu.get_sp(), sp);
        assert_eq!(cpu.get_reg16(StkReg16::AF), vals[3]);
        assert_eq!(cpu.get_reg16(StkReg16::BC), vals[2]);
        assert_eq!(cpu.get_reg16(StkReg16::DE), vals[1]);
        assert_eq!(cpu.get_reg16(StkReg16::HL), vals[0]);
        assert_eq!(cpu.tacts(), 4 * 11 + 4 * 10 + 4);
    }
}

#[test]
fn loads_and_jumps_leave_flags_intact() {
    let code = [
        0x41,             // LD   B,C
        0x21, 0x34, 0x12, // LD   HL,0x1234
        0x23,             // INC  HL
        0x0B,             // DEC  BC
        0xEB,             // EX   DE,HL
        0xDD, 0x23,       // INC  IX
        0x31, 0x00, 0x90, // LD   SP,0x9000
        0xCD, 0x11, 0x00, // CALL 0x0011
        0x18, 0x01,       // JR   0x0012
        0xC9,             // RET
        0x77,             // LD   (HL),A
        0xED, 0x47,       // LD   I,A
        0xD9,             // EXX
        0xFB,             // EI
    ];
    let mut rng = thread_rng();
    for _ in 0..256 {
        let bits: u8 = rng.gen();
        let cpu = run(&code, |cpu| cpu.set_flags(CpuFlags::from_bits_retain(bits)));
        assert_eq!(cpu.get_flags().bits(), bits);
    }
}

#[test]
fn step_costs_match_tables() {
    let mut rng = thread_rng();
    let mut cpu = Z80::new();
    let mut ram = Ram64::new();
    for _ in 0..16 {
        rng.fill_bytes(ram.mem_mut());
        cpu.set_pc(rng.gen());
        let mut total = cpu.tacts();
        for _ in 0..1000 {
            if cpu.is_halt() {
                cpu.request_nmi();
            }
            let tacts = cpu.step(&mut ram);
            total += tacts as u64;
            assert_eq!(total, cpu.tacts());
            assert!((4..=25).contains(&tacts), "{:02x?}: {}", cpu.last_opcodes(), tacts);
            if let Some(entry) = resolve(cpu.last_opcodes()) {
                if entry.tacts() != 0 {
                    let extra = tacts - entry.tacts();
                    assert!([0, 5, 6, 7].contains(&extra), "{:02x?}: {}", cpu.last_opcodes(), tacts);
                }
            }
        }
    }
}

#[test]
fn refresh_register_counts_fetches() {
    let mut rng = thread_rng();
    for _ in 0..64 {
        let r: u8 = rng.gen();
        let n: usize = rng.gen_range(1..300);
        let mut cpu = Z80::new();
        let mut ram = Ram64::new();
        cpu.set_r(r);
        for _ in 0..n {
            assert_eq!(cpu.step(&mut ram), 4);
        }
        assert_eq!(cpu.get_r(), r & 0x80 | (r as usize + n) as u8 & 0x7F);
        assert_eq!(cpu.get_ir(), cpu.get_r() as u16);
    }
}

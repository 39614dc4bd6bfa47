//! Runs small programs and checks their results and total T-states.
use z80core::{host::Ram64, *};

/// Runs the Cpu until it halts, returns the number of steps executed.
fn run_until_halt(cpu: &mut Z80, ram: &mut Ram64) -> usize {
    let mut steps = 0;
    let mut total = 0u64;
    while !cpu.is_halt() {
        total += cpu.step(ram) as u64;
        steps += 1;
        assert!(steps < 100_000, "the program never halts");
    }
    assert_eq!(total, cpu.tacts());
    steps
}

#[test]
fn memcpy_works() {
    let mut ram = Ram64::with_code(0, &[
        0x21, 0x00, 0x10, // LD   HL,0x1000
        0x11, 0x00, 0x20, // LD   DE,0x2000
        0x01, 0x00, 0x01, // LD   BC,0x0100
        0xED, 0xB0,       // LDIR
        0x76,             // HALT
    ]);
    for i in 0..0x100 {
        ram.mem_mut()[0x1000 + i] = !(i as u8);
    }
    let mut cpu = Z80::new();
    assert_eq!(run_until_halt(&mut cpu, &mut ram), 3 + 256 + 1);
    assert_eq!(ram.mem()[0x1000..0x1100], ram.mem()[0x2000..0x2100]);
    assert_eq!(cpu.tacts(), 30 + 255 * 21 + 16 + 4);
    assert_eq!(cpu.get_reg16(StkReg16::BC), 0);
    assert!(!cpu.get_flags().pvf());
}

#[test]
fn index_sum_works() {
    let mut ram = Ram64::with_code(0, &[
        0xDD, 0x21, 0x00, 0x30, // LD   IX,0x3000
        0x06, 0x0A,             // LD   B,10
        0xAF,                   // XOR  A
        0xDD, 0x86, 0x00,       // ADD  A,(IX+0)
        0xDD, 0x23,             // INC  IX
        0x10, 0xF9,             // DJNZ 0x0007
        0x32, 0x00, 0x40,       // LD   (0x4000),A
        0x76,                   // HALT
    ]);
    ram.load(0x3000, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    let mut cpu = Z80::new();
    run_until_halt(&mut cpu, &mut ram);
    assert_eq!(ram.mem()[0x4000], 55);
    assert_eq!(cpu.get_index16(Prefix::Xdd), 0x300A);
    assert_eq!(cpu.tacts(), 25 + 10 * (19 + 10) + 9 * 13 + 8 + 13 + 4);
}

#[test]
fn multiplication_works() {
    let code = [
        0x26, 0x0D,       // LD   H,13
        0x1E, 0x0B,       // LD   E,11
        0x2E, 0x00,       // LD   L,0
        0x55,             // LD   D,L
        0x06, 0x08,       // LD   B,8
        0x29,             // ADD  HL,HL
        0x30, 0x01,       // JR   NC,0x000D
        0x19,             // ADD  HL,DE
        0x10, 0xFA,       // DJNZ 0x0009
        0x76,             // HALT
    ];
    let mut ram = Ram64::with_code(0, &code);
    let mut cpu = Z80::new();
    run_until_halt(&mut cpu, &mut ram);
    assert_eq!(cpu.get_reg16(StkReg16::HL), 143);
    assert_eq!(cpu.tacts(), 32 + 8 * 11 + 7 * 13 + 8 + 3 * (7 + 11) + 5 * 12 + 4);

    for (a, b) in [(0u8, 255u8), (255, 255), (16, 16), (200, 3)] {
        let mut ram = Ram64::with_code(0, &code);
        ram.mem_mut()[1] = a;
        ram.mem_mut()[3] = b;
        let mut cpu = Z80::new();
        run_until_halt(&mut cpu, &mut ram);
        assert_eq!(cpu.get_reg16(StkReg16::HL), a as u16 * b as u16);
    }
}

#[test]
fn strlen_works() {
    let mut ram = Ram64::with_code(0, &[
        0x31, 0x00, 0x80, // LD   SP,0x8000
        0x21, 0x00, 0x50, // LD   HL,0x5000
        0xCD, 0x0A, 0x00, // CALL 0x000A
        0x76,             // HALT
        0xAF,             // XOR  A
        0x47,             // LD   B,A
        0x4F,             // LD   C,A
        0xED, 0xB1,       // CPIR
        0x21, 0xFF, 0xFF, // LD   HL,0xFFFF
        0xED, 0x42,       // SBC  HL,BC
        0xC9,             // RET
    ]);
    ram.load(0x5000, b"HELLO\0");
    let mut cpu = Z80::new();
    run_until_halt(&mut cpu, &mut ram);
    assert_eq!(cpu.get_reg16(StkReg16::HL), 5);
    assert_eq!(cpu.get_sp(), 0x8000);
    assert_eq!(cpu.get_pc(), 0x000A);
    assert_eq!(cpu.tacts(), 209);
}

#[test]
fn io_echo_works() {
    // copies 4 bytes from port 0x10 to port 0x20 through memory
    let mut ram = Ram64::with_code(0, &[
        0x21, 0x00, 0x60, // LD   HL,0x6000
        0x01, 0x10, 0x04, // LD   BC,0x0410
        0xED, 0xB2,       // INIR
        0x21, 0x00, 0x60, // LD   HL,0x6000
        0x01, 0x20, 0x04, // LD   BC,0x0420
        0xED, 0xB3,       // OTIR
        0x76,             // HALT
    ]);
    for b in 1..=4u16 {
        ram.set_port(b << 8 | 0x10, b as u8 * 0x11);
    }
    let mut cpu = Z80::new();
    run_until_halt(&mut cpu, &mut ram);
    assert_eq!(&ram.mem()[0x6000..0x6004], &[0x44, 0x33, 0x22, 0x11]);
    // OTIR outputs after decrementing B
    assert_eq!(ram.port(0x0320), 0x44);
    assert_eq!(ram.port(0x0220), 0x33);
    assert_eq!(ram.port(0x0120), 0x22);
    assert_eq!(ram.port(0x0020), 0x11);
    assert_eq!(cpu.tacts(), 2 * (20 + 3 * 21 + 16) + 4);
}

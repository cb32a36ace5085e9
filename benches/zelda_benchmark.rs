//! Adapted from the teacher's `core/benches/zelda_benchmark.rs`. That
//! benchmark loaded a real cartridge dump from disk; this crate ships no
//! ROM fixtures, so the benchmark builds a minimal valid header in memory
//! instead and exercises the same two things: raw `step` throughput and
//! full-framebuffer PPU rendering.

use criterion::{criterion_group, criterion_main, Criterion};
use criterion_cycles_per_byte::CyclesPerByte;
use dmg_core::hardware::cartridge::header::{
    CHECKSUM_ADDR, LOGO_START, LOGO_END, MBC_ID_ADDR, NINTENDO_LOGO, RAM_SIZE_ADDR, ROM_SIZE_ADDR,
    TITLE_START,
};
use dmg_core::Emulator;

fn synthetic_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[LOGO_START..LOGO_END].copy_from_slice(&NINTENDO_LOGO);
    rom[TITLE_START..TITLE_START + 6].copy_from_slice(b"BENCHM");
    rom[MBC_ID_ADDR] = 0x00;
    rom[ROM_SIZE_ADDR] = 0x00;
    rom[RAM_SIZE_ADDR] = 0x00;

    // A tight loop at the entry point: JP back to itself forever, so
    // `step` always has real instructions to decode and branch through.
    rom[0x0100] = 0xC3; // JP 0x0100
    rom[0x0101] = 0x00;
    rom[0x0102] = 0x01;

    let mut checksum: u8 = 0;
    for &byte in &rom[0x0134..0x014D] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    rom[CHECKSUM_ADDR] = checksum;
    rom
}

fn step_benchmark(c: &mut Criterion) {
    let mut emulator = Emulator::init(44_100);
    emulator.load(synthetic_rom(), None).unwrap();

    c.bench_function("step one frame", |b| {
        b.iter(|| emulator.step(dmg_core::FRAME));
    });
}

fn framebuffer_benchmark(c: &mut Criterion) {
    let mut emulator = Emulator::init(44_100);
    emulator.load(synthetic_rom(), None).unwrap();

    let mut group = c.benchmark_group("framebuffer");
    group.bench_function("read lcd() after one frame", |b| {
        b.iter(|| {
            emulator.step(dmg_core::FRAME);
            emulator.lcd().len()
        });
    });
    group.finish();
}

fn step_cycles_per_byte(c: &mut Criterion<CyclesPerByte>) {
    let mut emulator = Emulator::init(44_100);
    emulator.load(synthetic_rom(), None).unwrap();

    c.bench_function("step one frame (cycles/byte)", |b| {
        b.iter(|| emulator.step(dmg_core::FRAME));
    });
}

criterion_group!(benches, step_benchmark, framebuffer_benchmark);

criterion_group!(
    name = cycle_benches;
    config = Criterion::default().with_measurement(CyclesPerByte);
    targets = step_cycles_per_byte
);

criterion_main!(benches, cycle_benches);

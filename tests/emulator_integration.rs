//! Black-box tests against the public `Emulator` facade only, exercising
//! the end-to-end scenarios a host actually drives: load, step a frame,
//! read back video/audio, and feed input. Internal unit tests already
//! cover each component in isolation under `src/`.

use dmg_core::{Emulator, InputKey, LCD_HEIGHT, LCD_WIDTH};

fn synthetic_rom(mbc_id: u8, entry: &[u8]) -> Vec<u8> {
    use dmg_core::hardware::cartridge::header::*;

    let mut rom = vec![0u8; 0x8000];
    rom[LOGO_START..LOGO_END].copy_from_slice(&NINTENDO_LOGO);
    rom[TITLE_START..TITLE_START + 4].copy_from_slice(b"TEST");
    rom[MBC_ID_ADDR] = mbc_id;
    rom[ROM_SIZE_ADDR] = 0x00;
    rom[RAM_SIZE_ADDR] = 0x00;
    rom[HEADER_START..HEADER_START + entry.len()].copy_from_slice(entry);

    let mut checksum: u8 = 0;
    for &byte in &rom[0x0134..0x014D] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    rom[CHECKSUM_ADDR] = checksum;
    rom
}

fn infinite_loop_rom() -> Vec<u8> {
    // JP $0100, forever.
    synthetic_rom(0x00, &[0xC3, 0x00, 0x01])
}

#[test]
fn stepping_a_full_frame_produces_a_stable_sized_framebuffer() {
    let mut emulator = Emulator::init(44_100);
    emulator.load(infinite_loop_rom(), None).unwrap();

    let cycles = emulator.step(dmg_core::FRAME);
    assert!(cycles >= dmg_core::FRAME);

    let lcd = emulator.lcd();
    assert_eq!(lcd.len(), LCD_WIDTH * LCD_HEIGHT * 3, "DMG framebuffer is RGB888");
}

#[test]
fn stepping_many_frames_does_not_panic_or_desync() {
    let mut emulator = Emulator::init(44_100);
    emulator.load(infinite_loop_rom(), None).unwrap();

    for _ in 0..5 {
        emulator.step(dmg_core::FRAME);
    }
}

#[test]
fn audio_samples_accumulate_while_stepping() {
    let mut emulator = Emulator::init(44_100);
    emulator.load(infinite_loop_rom(), None).unwrap();

    emulator.step(dmg_core::CPU_CLOCK / 10);

    let mut out = [0.0f32; 4096];
    let written = emulator.audio_samples(&mut out);
    // The APU starts powered off until the ROM enables it; an infinite
    // `JP` loop never touches NR52, so no samples are expected yet, but
    // draining must never panic regardless of what accumulated.
    assert!(written <= out.len());
}

#[test]
fn press_then_release_every_button_does_not_panic() {
    let mut emulator = Emulator::init(44_100);
    emulator.load(infinite_loop_rom(), None).unwrap();

    for button in
        [InputKey::Right, InputKey::Left, InputKey::Up, InputKey::Down, InputKey::A, InputKey::B, InputKey::Select, InputKey::Start]
    {
        emulator.press_button(button);
        emulator.step(16);
        emulator.release_button(button);
    }
}

#[test]
fn loading_a_rom_with_a_bad_logo_is_rejected() {
    let mut rom = infinite_loop_rom();
    rom[0x0104] ^= 0xFF;

    let mut emulator = Emulator::init(44_100);
    assert!(emulator.load(rom, None).is_err());
}

#[test]
fn mbc1_cartridge_loads_with_supplied_ram() {
    use pretty_assertions::assert_eq;

    let rom = synthetic_rom(0x03, &[0xC3, 0x00, 0x01]); // MBC1+RAM+BATTERY
    let ram = vec![0x42u8; 0x2000];

    let mut emulator = Emulator::init(44_100);
    emulator.load(rom, Some(ram.clone())).unwrap();
    assert_eq!(emulator.battery_ram(), Some(ram.as_slice()));
}

#[test]
fn quit_after_load_is_a_harmless_no_op() {
    let mut emulator = Emulator::init(44_100);
    emulator.load(infinite_loop_rom(), None).unwrap();
    emulator.step(100);
    emulator.quit();
}

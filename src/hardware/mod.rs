//! The hardware components that the bus wires together: cartridge/MBC,
//! CPU, and PPU. (APU registers live under `hardware::apu` and are driven
//! the same way — per-step, off the CPU's returned cycle count.)

pub mod apu;
pub mod cartridge;
pub mod cpu;
pub mod ppu;

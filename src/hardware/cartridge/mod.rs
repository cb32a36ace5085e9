//! Cartridge loading: header parsing, RAM allocation, and wiring the
//! chosen MBC's bank-switching behaviour onto the bus.
//!
//! Grounded on the teacher's `hardware/cartridge/mod.rs`, which pairs a
//! `CartridgeHeader` with a `Box<dyn MBC>`. Since bus handlers here are
//! plain `fn` pointers rather than trait objects (see `bus::mod`), the
//! "dyn MBC" boundary collapses into a single enum (`mbc::MbcState`) that
//! four handler functions dispatch on.

pub mod header;
pub mod mbc;
pub mod mbc3;

use crate::bus::{Bus, ReadHandler, StepCallback, WriteHandler};
use crate::error::LoadError;
use header::CartridgeHeader;
use mbc::MbcState;
use mbc3::{RTC_DAY_HIGH, RTC_DAY_LOW, RTC_HOURS, RTC_MINUTES, RTC_SECONDS};

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;
const MBC2_RAM_SIZE: usize = 512;

pub struct Cartridge {
    pub header: CartridgeHeader,
    rom: Vec<u8>,
    ram: Vec<u8>,
    pub mbc: MbcState,
}

impl Cartridge {
    pub fn load(rom: Vec<u8>, ram: Option<Vec<u8>>) -> Result<Cartridge, LoadError> {
        let header = CartridgeHeader::parse(&rom)?;
        let ram_size = if matches!(header.mbc_kind, header::MbcKind::Mbc2) {
            MBC2_RAM_SIZE
        } else {
            header.ram_banks * RAM_BANK_SIZE
        };
        let ram = ram.unwrap_or_else(|| vec![0xFFu8; ram_size]);
        let mbc = MbcState::new(header.mbc_kind);

        Ok(Cartridge { header, rom, ram, mbc })
    }

    pub fn battery_ram(&self) -> &[u8] {
        &self.ram
    }

    /// Installs this cartridge's four handler functions onto the bus's
    /// chains. Dispatch inside each function reads `bus.cartridge` back
    /// out, since the handlers themselves carry no state.
    pub fn install(
        &self,
        read_chain: &mut Vec<ReadHandler>,
        write_chain: &mut Vec<WriteHandler>,
        step_callbacks: &mut Vec<StepCallback>,
    ) {
        read_chain.push(Self::read_handler);
        write_chain.push(Self::control_write_handler);
        write_chain.push(Self::ram_write_handler);
        step_callbacks.push(Self::rtc_step_handler);
    }

    fn read_handler(bus: &mut Bus, addr: u16) -> Option<u8> {
        let cart = bus.cartridge.as_ref()?;
        match addr {
            0x0000..=0x3FFF => Some(cart.rom.get(addr as usize).copied().unwrap_or(0xFF)),
            0x4000..=0x7FFF => {
                let bank = cart.mbc.rom_bank();
                let offset = bank * ROM_BANK_SIZE + (addr as usize - 0x4000);
                Some(cart.rom.get(offset).copied().unwrap_or(0xFF))
            }
            0xA000..=0xBFFF => {
                if let MbcState::Mbc3 { ram_bank_or_rtc, rtc, .. } = &cart.mbc {
                    if *ram_bank_or_rtc >= 0x08 && *ram_bank_or_rtc <= 0x0C {
                        let reg = match *ram_bank_or_rtc {
                            0x08 => RTC_SECONDS,
                            0x09 => RTC_MINUTES,
                            0x0A => RTC_HOURS,
                            0x0B => RTC_DAY_LOW,
                            _ => RTC_DAY_HIGH,
                        };
                        return Some(rtc.read_latched(reg));
                    }
                }
                if !cart.mbc.ram_enabled() {
                    return Some(0xFF);
                }
                if matches!(cart.mbc, MbcState::Mbc2 { .. }) {
                    let index = (addr as usize - 0xA000) % MBC2_RAM_SIZE;
                    return Some(cart.ram.get(index).copied().unwrap_or(0xFF) | 0xF0);
                }
                let bank = cart.mbc.ram_bank();
                let offset = bank * RAM_BANK_SIZE + (addr as usize - 0xA000);
                Some(cart.ram.get(offset).copied().unwrap_or(0xFF))
            }
            _ => None,
        }
    }

    fn control_write_handler(bus: &mut Bus, addr: u16, value: u8) -> bool {
        let cart = match bus.cartridge.as_mut() {
            Some(c) => c,
            None => return false,
        };
        if addr <= 0x7FFF {
            cart.mbc.write_control(addr, value);
            true
        } else {
            false
        }
    }

    fn ram_write_handler(bus: &mut Bus, addr: u16, value: u8) -> bool {
        let cart = match bus.cartridge.as_mut() {
            Some(c) => c,
            None => return false,
        };
        if !(0xA000..=0xBFFF).contains(&addr) {
            return false;
        }
        if let MbcState::Mbc3 { ram_bank_or_rtc, rtc, .. } = &mut cart.mbc {
            if *ram_bank_or_rtc >= 0x08 && *ram_bank_or_rtc <= 0x0C {
                let reg = match *ram_bank_or_rtc {
                    0x08 => RTC_SECONDS,
                    0x09 => RTC_MINUTES,
                    0x0A => RTC_HOURS,
                    0x0B => RTC_DAY_LOW,
                    _ => RTC_DAY_HIGH,
                };
                rtc.write_live(reg, value);
                return true;
            }
        }
        if !cart.mbc.ram_enabled() {
            return true;
        }
        if matches!(cart.mbc, MbcState::Mbc2 { .. }) {
            let index = (addr as usize - 0xA000) % MBC2_RAM_SIZE;
            if let Some(slot) = cart.ram.get_mut(index) {
                *slot = value & 0x0F;
            }
            return true;
        }
        let bank = cart.mbc.ram_bank();
        let offset = bank * RAM_BANK_SIZE + (addr as usize - 0xA000);
        if let Some(slot) = cart.ram.get_mut(offset) {
            *slot = value;
        }
        true
    }

    fn rtc_step_handler(bus: &mut Bus, cycles: u32) {
        if let Some(cart) = bus.cartridge.as_mut() {
            if let MbcState::Mbc3 { rtc, .. } = &mut cart.mbc {
                rtc.step(cycles, crate::constants::CPU_CLOCK);
            }
        }
    }
}

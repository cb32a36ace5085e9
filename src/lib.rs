//! `dmg-core` is a cycle-accurate core for the original Game Boy (DMG) and
//! Game Boy Color (CGB): CPU, PPU, APU, memory bus with bank switching, and
//! cartridge/MBC handling.
//!
//! ROM loading from disk, battery-RAM persistence, audio output, video
//! presentation and controller event plumbing are deliberately left to the
//! host application; this crate only exposes the narrow interface described
//! in [`Emulator`].

pub mod bus;
pub mod constants;
pub mod emulator;
pub mod error;
pub mod hardware;
pub mod io;

pub use crate::constants::*;
pub use crate::emulator::{Emulator, EmulatorMode, EmulatorOptions, EmulatorOptionsBuilder};
pub use crate::error::{ConfigError, LoadError};
pub use crate::hardware::ppu::palette::DmgColor;
pub use crate::io::joypad::InputKey;

//! Errors surfaced by the core. All of them bubble out of [`crate::Emulator::load`];
//! nothing during [`crate::Emulator::step`] is fallible at this level.

use thiserror::Error;

/// Failures while parsing and validating a cartridge header, or building the
/// MBC it selects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("ROM is too small to contain a cartridge header (got {0} bytes)")]
    RomTooSmall(usize),
    #[error("Nintendo logo in the cartridge header does not match")]
    InvalidLogo,
    #[error("header checksum mismatch: expected {expected:#04X}, computed {computed:#04X}")]
    InvalidChecksum { expected: u8, computed: u8 },
    #[error("unsupported memory bank controller id {0:#04X}")]
    UnsupportedMbc(u8),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures decoding the ROM/RAM size bytes in the cartridge header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported ROM size code {0:#04X}")]
    UnsupportedRomSize(u8),
    #[error("unsupported RAM size code {0:#04X}")]
    UnsupportedRamSize(u8),
}

//! LCDC ($FF40) and STAT ($FF41) bitflags.

use bitflags::bitflags;

bitflags! {
    #[derive(Default)]
    pub struct Lcdc: u8 {
        const BG_WINDOW_ENABLE   = 0b0000_0001;
        const OBJ_ENABLE         = 0b0000_0010;
        const OBJ_SIZE           = 0b0000_0100;
        const BG_MAP_SELECT      = 0b0000_1000;
        const BG_WINDOW_TILESET  = 0b0001_0000;
        const WINDOW_ENABLE      = 0b0010_0000;
        const WINDOW_MAP_SELECT  = 0b0100_0000;
        const LCD_ENABLE         = 0b1000_0000;
    }
}

impl Lcdc {
    pub fn sprite_height(self) -> u8 {
        if self.contains(Lcdc::OBJ_SIZE) {
            16
        } else {
            8
        }
    }

    pub fn bg_map_base(self) -> u16 {
        if self.contains(Lcdc::BG_MAP_SELECT) {
            0x9C00
        } else {
            0x9800
        }
    }

    pub fn window_map_base(self) -> u16 {
        if self.contains(Lcdc::WINDOW_MAP_SELECT) {
            0x9C00
        } else {
            0x9800
        }
    }

    pub fn tile_data_unsigned(self) -> bool {
        self.contains(Lcdc::BG_WINDOW_TILESET)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct StatFlags: u8 {
        const MODE_LOW       = 0b0000_0001;
        const MODE_HIGH      = 0b0000_0010;
        const COINCIDENCE    = 0b0000_0100;
        const HBLANK_INT     = 0b0000_1000;
        const VBLANK_INT     = 0b0001_0000;
        const OAM_INT        = 0b0010_0000;
        const COINCIDENCE_INT = 0b0100_0000;
        const UNUSED         = 0b1000_0000;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamSearch = 2,
    PixelTransfer = 3,
}

impl Mode {
    pub fn bits(self) -> u8 {
        self as u8
    }
}

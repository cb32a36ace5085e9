//! Hardware constants shared across the core.

/// Visible framebuffer width in pixels.
pub const LCD_WIDTH: usize = 160;
/// Visible framebuffer height in pixels.
pub const LCD_HEIGHT: usize = 144;
/// Sharp LR35902 clock rate, in T-cycles per second.
pub const CPU_CLOCK: u32 = 4_194_304;
/// T-cycles in a single scanline.
pub const SCANLINE: u32 = 456;
/// Number of scanlines per frame, including the 10 V-Blank lines.
pub const SCANLINES: u32 = 154;
/// T-cycles in a full frame: `SCANLINE * SCANLINES`.
pub const FRAME: u32 = SCANLINE * SCANLINES;

/// Frame sequencer rate driving length/envelope/sweep clocking.
pub const FRAME_SEQUENCER_RATE: u32 = 512;
/// T-cycles between frame sequencer steps: `CPU_CLOCK / FRAME_SEQUENCER_RATE`.
pub const FRAME_SEQUENCER_CYCLES: u32 = CPU_CLOCK / FRAME_SEQUENCER_RATE;

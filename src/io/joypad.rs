//! P1/JOYP register at $FF00.
//!
//! Grounded on the teacher's `io/joypad.rs` (itself modeled after MoonEye-GB):
//! key state is stored as an inverse bitmask so that "selected but not
//! pressed" reads back as 1, matching the open-drain wiring of the real
//! matrix.

use bitflags::bitflags;

pub const JOYPAD_REGISTER: u16 = 0xFF00;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Eq)]
pub enum InputKey {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl InputKey {
    fn flag(self) -> JoypadFlags {
        match self {
            InputKey::Right | InputKey::A => JoypadFlags::RIGHT_A,
            InputKey::Left | InputKey::B => JoypadFlags::LEFT_B,
            InputKey::Up | InputKey::Select => JoypadFlags::UP_SELECT,
            InputKey::Down | InputKey::Start => JoypadFlags::DOWN_START,
        }
    }

    fn is_direction(self) -> bool {
        matches!(self, InputKey::Right | InputKey::Left | InputKey::Up | InputKey::Down)
    }
}

bitflags! {
    #[derive(Default)]
    struct JoypadFlags: u8 {
        const RIGHT_A        = 0b0000_0001;
        const LEFT_B         = 0b0000_0010;
        const UP_SELECT      = 0b0000_0100;
        const DOWN_START     = 0b0000_1000;
        const DIRECTION_KEYS = 0b0001_0000;
        const BUTTON_KEYS    = 0b0010_0000;
        const UNUSED_6       = 0b0100_0000;
        const UNUSED_7       = 0b1000_0000;
    }
}

#[derive(Debug, Clone)]
pub struct Joypad {
    pressed_buttons: JoypadFlags,
    pressed_directions: JoypadFlags,
    selected_mode: JoypadFlags,
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            pressed_buttons: JoypadFlags::empty(),
            pressed_directions: JoypadFlags::empty(),
            selected_mode: JoypadFlags::from_bits_truncate(0xFF),
        }
    }

    pub fn register(&self) -> u8 {
        !self.current_selection().bits
    }

    fn current_selection(&self) -> JoypadFlags {
        let mut selection = self.selected_mode & (JoypadFlags::DIRECTION_KEYS | JoypadFlags::BUTTON_KEYS);
        if selection.contains(JoypadFlags::BUTTON_KEYS) {
            selection.insert(self.pressed_buttons);
        }
        if selection.contains(JoypadFlags::DIRECTION_KEYS) {
            selection.insert(self.pressed_directions);
        }
        selection
    }

    /// Bits 5-4 are the only writable bits; bits 7-6 always read high.
    pub fn set_register(&mut self, value: u8) {
        self.selected_mode =
            JoypadFlags::from_bits_truncate(!value) & (JoypadFlags::DIRECTION_KEYS | JoypadFlags::BUTTON_KEYS);
    }

    /// Returns `true` if this press is a falling edge on the currently
    /// selected bits (the condition that raises the JOYPAD interrupt).
    pub fn press(&mut self, key: InputKey) -> bool {
        let before = self.current_selection().bits & 0x0F;
        if key.is_direction() {
            self.pressed_directions.insert(key.flag());
        } else {
            self.pressed_buttons.insert(key.flag());
        }
        let after = self.current_selection().bits & 0x0F;
        // A pressed bit is a 1 in our "pressed" masks, but 0 on the real P1
        // register; the edge that raises JOYPAD is bits going from high
        // (not pressed) to low (pressed) as seen by the CPU, i.e. our masks
        // going from 0 to 1 on a selected bit.
        (before & !after) == 0 && before != after
    }

    pub fn release(&mut self, key: InputKey) {
        if key.is_direction() {
            self.pressed_directions.remove(key.flag());
        } else {
            self.pressed_buttons.remove(key.flag());
        }
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_release_roundtrip() {
        let mut pad = Joypad::new();
        pad.set_register(0b1110_1111); // select directions
        let before = pad.register();

        pad.press(InputKey::Up);
        pad.release(InputKey::Up);

        assert_eq!(pad.register(), before);
    }

    #[test]
    fn test_selected_group_only() {
        let mut pad = Joypad::new();
        pad.press(InputKey::A);
        pad.press(InputKey::Up);

        pad.set_register(0b1110_1111); // select directions (bit 4 = 0)
        let directions_reading = pad.register() & 0x0F;
        assert_eq!(directions_reading, !0x04 & 0x0F);

        pad.set_register(0b1101_1111); // select buttons (bit 5 = 0)
        let buttons_reading = pad.register() & 0x0F;
        assert_eq!(buttons_reading, !0x01 & 0x0F);
    }
}

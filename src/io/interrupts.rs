//! The interrupt vector: IE at $FFFF, IF at $FF0F, and the five interrupt
//! kinds in ascending priority.

use bitflags::bitflags;

/// The five interrupt sources, in ascending dispatch priority. `Interrupts::iter`
/// yields them in this order, which is also the order the CPU checks them in.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptKind {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl InterruptKind {
    pub fn iter() -> impl Iterator<Item = InterruptKind> {
        use InterruptKind::*;
        [VBlank, LcdStat, Timer, Serial, Joypad].iter().copied()
    }

    pub fn vector(self) -> u16 {
        0x0040 + 0x08 * self as u16
    }
}

bitflags! {
    #[derive(Default)]
    pub struct InterruptFlags: u8 {
        const VBLANK  = 0b0000_0001;
        const LCD     = 0b0000_0010;
        const TIMER   = 0b0000_0100;
        const SERIAL  = 0b0000_1000;
        const JOYPAD  = 0b0001_0000;
        const UNUSED  = 0b1110_0000;
    }
}

impl InterruptFlags {
    pub fn from_kind(kind: InterruptKind) -> Self {
        InterruptFlags::from_bits_truncate(1 << kind as u8)
    }
}

/// Owns the IE ($FFFF) and IF ($FF0F) registers.
#[derive(Default, Debug, Clone)]
pub struct Interrupts {
    pub interrupt_enable: InterruptFlags,
    pub interrupt_flag: InterruptFlags,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, kind: InterruptKind) {
        self.interrupt_flag.insert(InterruptFlags::from_kind(kind));
    }

    pub fn request_flags(&mut self, flags: InterruptFlags) {
        self.interrupt_flag.insert(flags);
    }

    /// The lowest-numbered pending-and-enabled interrupt, if any.
    pub fn pending(&self) -> Option<InterruptKind> {
        let active = self.interrupt_flag & self.interrupt_enable;
        InterruptKind::iter().find(|k| active.contains(InterruptFlags::from_kind(*k)))
    }

    pub fn any_pending(&self) -> bool {
        !(self.interrupt_flag & self.interrupt_enable).is_empty()
    }

    pub fn clear(&mut self, kind: InterruptKind) {
        self.interrupt_flag.remove(InterruptFlags::from_kind(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_priority_order() {
        let ordered = [
            InterruptKind::VBlank,
            InterruptKind::LcdStat,
            InterruptKind::Timer,
            InterruptKind::Serial,
            InterruptKind::Joypad,
        ];
        for (i, kind) in InterruptKind::iter().enumerate() {
            assert_eq!(ordered[i], kind);
        }
    }

    #[test]
    fn test_pending_picks_lowest_priority() {
        let mut interrupts = Interrupts::new();
        interrupts.interrupt_enable = InterruptFlags::all();
        interrupts.request(InterruptKind::Joypad);
        interrupts.request(InterruptKind::Timer);

        assert_eq!(interrupts.pending(), Some(InterruptKind::Timer));
    }

    #[test]
    fn test_pending_requires_enable() {
        let mut interrupts = Interrupts::new();
        interrupts.request(InterruptKind::VBlank);

        assert_eq!(interrupts.pending(), None);
        assert!(interrupts.any_pending() == false || interrupts.interrupt_enable.is_empty());
    }
}

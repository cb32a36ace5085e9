//! MBC3's real-time clock: five latchable registers {S, M, H, DL, DH}.
//!
//! The original C source (`mbc3.c`) drives this off a per-cycle `step`
//! callback and a zero-then-one write to $6000-$7FFF to latch, but its
//! `step` never checks the DH halt bit and its latch path never actually
//! copies the live counter into the latched register array. Both are
//! bugs in the source; this reimplementation does the latch copy and
//! respects DH bit 6 as specified.

pub const RTC_SECONDS: usize = 0;
pub const RTC_MINUTES: usize = 1;
pub const RTC_HOURS: usize = 2;
pub const RTC_DAY_LOW: usize = 3;
pub const RTC_DAY_HIGH: usize = 4;

const DAY_HIGH_HALT: u8 = 0b0100_0000;
const DAY_HIGH_CARRY: u8 = 0b1000_0000;
const DAY_HIGH_MSB: u8 = 0b0000_0001;

#[derive(Debug, Default, Clone)]
pub struct Rtc {
    live: [u8; 5],
    latched: [u8; 5],
    latch_write_seen_zero: bool,
    sub_second_cycles: u32,
}

impl Rtc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_latched(&self, reg: usize) -> u8 {
        self.latched[reg]
    }

    pub fn write_live(&mut self, reg: usize, value: u8) {
        self.live[reg] = value;
    }

    pub fn read_live(&self, reg: usize) -> u8 {
        self.live[reg]
    }

    /// Latch trigger: a write of 0 followed by a write of 1 to $6000-$7FFF.
    pub fn handle_latch_write(&mut self, value: u8) {
        if value == 0 {
            self.latch_write_seen_zero = true;
        } else if value == 1 && self.latch_write_seen_zero {
            self.latched.copy_from_slice(&self.live);
            self.latch_write_seen_zero = false;
        } else {
            self.latch_write_seen_zero = false;
        }
    }

    /// Accumulates elapsed T-cycles into the live counter, unless halted.
    pub fn step(&mut self, cycles: u32, cpu_clock_hz: u32) {
        if self.live[RTC_DAY_HIGH] & DAY_HIGH_HALT != 0 {
            return;
        }
        self.sub_second_cycles += cycles;
        while self.sub_second_cycles >= cpu_clock_hz {
            self.sub_second_cycles -= cpu_clock_hz;
            self.tick_second();
        }
    }

    fn tick_second(&mut self) {
        self.live[RTC_SECONDS] += 1;
        if self.live[RTC_SECONDS] >= 60 {
            self.live[RTC_SECONDS] = 0;
            self.live[RTC_MINUTES] += 1;
        }
        if self.live[RTC_MINUTES] >= 60 {
            self.live[RTC_MINUTES] = 0;
            self.live[RTC_HOURS] += 1;
        }
        if self.live[RTC_HOURS] >= 24 {
            self.live[RTC_HOURS] = 0;
            let (day, overflowed) = self.live[RTC_DAY_LOW].overflowing_add(1);
            self.live[RTC_DAY_LOW] = day;
            if overflowed {
                let msb = self.live[RTC_DAY_HIGH] & DAY_HIGH_MSB;
                if msb != 0 {
                    self.live[RTC_DAY_HIGH] |= DAY_HIGH_CARRY;
                    self.live[RTC_DAY_HIGH] &= !DAY_HIGH_MSB;
                } else {
                    self.live[RTC_DAY_HIGH] |= DAY_HIGH_MSB;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_requires_zero_then_one() {
        let mut rtc = Rtc::new();
        rtc.write_live(RTC_SECONDS, 42);
        rtc.handle_latch_write(1); // no preceding 0, ignored
        assert_eq!(rtc.read_latched(RTC_SECONDS), 0);

        rtc.handle_latch_write(0);
        rtc.handle_latch_write(1);
        assert_eq!(rtc.read_latched(RTC_SECONDS), 42);
    }

    #[test]
    fn test_halted_rtc_does_not_advance() {
        let mut rtc = Rtc::new();
        rtc.write_live(RTC_DAY_HIGH, DAY_HIGH_HALT);
        rtc.step(4_194_304, 4_194_304);
        assert_eq!(rtc.read_live(RTC_SECONDS), 0);
    }

    #[test]
    fn test_seconds_roll_into_minutes() {
        let mut rtc = Rtc::new();
        rtc.step(4_194_304 * 60, 4_194_304);
        assert_eq!(rtc.read_live(RTC_SECONDS), 0);
        assert_eq!(rtc.read_live(RTC_MINUTES), 1);
    }
}

//! Frame sequencer, four channels, master registers, and stereo sample
//! production.
//!
//! The teacher's core never grew an APU past `channel_features.rs`; this
//! module is written fresh against §4.4, reusing the teacher's
//! `EnvelopeFeature` (see `channel_features.rs`) and following the same
//! "plain struct, `tick`/`trigger`/register accessors" shape the teacher
//! uses for its timer and joypad.

pub mod channel_features;
pub mod noise_channel;
pub mod square_channel;
pub mod wave_channel;

use bitflags::bitflags;
use noise_channel::NoiseChannel;
use square_channel::SquareChannel;
use wave_channel::WaveChannel;

const FRAME_SEQUENCER_PERIOD: u32 = 8192;
const SAMPLE_BUFFER_CAP: usize = 8192;

bitflags! {
    #[derive(Default)]
    struct NR51: u8 {
        const CH1_RIGHT = 0b0000_0001;
        const CH2_RIGHT = 0b0000_0010;
        const CH3_RIGHT = 0b0000_0100;
        const CH4_RIGHT = 0b0000_1000;
        const CH1_LEFT  = 0b0001_0000;
        const CH2_LEFT  = 0b0010_0000;
        const CH3_LEFT  = 0b0100_0000;
        const CH4_LEFT  = 0b1000_0000;
    }
}

pub struct Apu {
    ch1: SquareChannel,
    ch2: SquareChannel,
    ch3: WaveChannel,
    ch4: NoiseChannel,

    enabled: bool,
    nr50: u8,
    nr51: NR51,

    frame_sequencer_step: u8,
    frame_sequencer_counter: u32,

    sample_rate: u32,
    sample_counter: u32,
    samples: Vec<f32>,
}

impl Apu {
    pub fn new(sample_rate: u32) -> Self {
        Apu {
            ch1: SquareChannel::new(true),
            ch2: SquareChannel::new(false),
            ch3: WaveChannel::new(),
            ch4: NoiseChannel::new(),
            enabled: false,
            nr50: 0,
            nr51: NR51::empty(),
            frame_sequencer_step: 0,
            frame_sequencer_counter: 0,
            sample_rate: sample_rate.max(1),
            sample_counter: 0,
            samples: Vec::with_capacity(SAMPLE_BUFFER_CAP),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    pub fn step(&mut self, cycles: u32) {
        if !self.enabled {
            return;
        }
        self.ch1.tick(cycles);
        self.ch2.tick(cycles);
        self.ch3.tick(cycles);
        self.ch4.tick(cycles);

        self.frame_sequencer_counter += cycles;
        while self.frame_sequencer_counter >= FRAME_SEQUENCER_PERIOD {
            self.frame_sequencer_counter -= FRAME_SEQUENCER_PERIOD;
            self.tick_frame_sequencer();
        }

        self.sample_counter += cycles;
        let period = crate::CPU_CLOCK / self.sample_rate;
        while self.sample_counter >= period {
            self.sample_counter -= period;
            self.produce_sample();
        }
    }

    fn tick_frame_sequencer(&mut self) {
        match self.frame_sequencer_step {
            0 | 4 => self.tick_length(),
            2 | 6 => {
                self.tick_length();
                self.ch1.tick_sweep();
            }
            7 => self.tick_envelope(),
            _ => {}
        }
        self.frame_sequencer_step = (self.frame_sequencer_step + 1) & 0x07;
    }

    fn tick_length(&mut self) {
        self.ch1.tick_length();
        self.ch2.tick_length();
        self.ch3.tick_length();
        self.ch4.tick_length();
    }

    fn tick_envelope(&mut self) {
        self.ch1.tick_envelope();
        self.ch2.tick_envelope();
        self.ch4.tick_envelope();
    }

    fn produce_sample(&mut self) {
        let left_vol = ((self.nr50 >> 4) & 0x07) as f32;
        let right_vol = (self.nr50 & 0x07) as f32;

        let channels: [(f32, bool, bool); 4] = [
            (self.ch1.amplitude(), self.nr51.contains(NR51::CH1_LEFT), self.nr51.contains(NR51::CH1_RIGHT)),
            (self.ch2.amplitude(), self.nr51.contains(NR51::CH2_LEFT), self.nr51.contains(NR51::CH2_RIGHT)),
            (self.ch3.amplitude(), self.nr51.contains(NR51::CH3_LEFT), self.nr51.contains(NR51::CH3_RIGHT)),
            (self.ch4.amplitude(), self.nr51.contains(NR51::CH4_LEFT), self.nr51.contains(NR51::CH4_RIGHT)),
        ];

        let mut left_sum = 0.0f32;
        let mut right_sum = 0.0f32;
        for (amplitude, to_left, to_right) in channels.iter() {
            if *to_left {
                left_sum += amplitude;
            }
            if *to_right {
                right_sum += amplitude;
            }
        }

        // Four channels x max volume 15, plus master volume 0-7: normalize
        // into [-1, 1] the same way the teacher's mixers scale PCM output.
        let left = (left_sum * (left_vol + 1.0) / 60.0) - 1.0;
        let right = (right_sum * (right_vol + 1.0) / 60.0) - 1.0;

        if self.samples.len() + 2 > SAMPLE_BUFFER_CAP {
            self.samples.clear();
        }
        self.samples.push(left);
        self.samples.push(right);
    }

    /// Drains the interleaved stereo sample buffer into `out`, returning
    /// the number of f32s copied. If `out` is smaller than the buffer the
    /// remainder is discarded, matching §5's overflow-discard semantics.
    pub fn drain_samples(&mut self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.samples.len());
        out[..count].copy_from_slice(&self.samples[..count]);
        self.samples.clear();
        count
    }

    fn set_enabled(&mut self, enabled: bool) {
        #[cfg(feature = "apu-logging")]
        log::trace!("APU power {}", if enabled { "on" } else { "off" });

        if enabled && !self.enabled {
            self.frame_sequencer_step = 0;
            self.frame_sequencer_counter = 0;
        }
        if !enabled && self.enabled {
            self.ch1 = SquareChannel::new(true);
            self.ch2 = SquareChannel::new(false);
            self.ch3 = WaveChannel::new();
            self.ch4 = NoiseChannel::new();
            self.nr50 = 0;
            self.nr51 = NR51::empty();
        }
        self.enabled = enabled;
    }

    fn status_byte(&self) -> u8 {
        (if self.enabled { 0x80 } else { 0 })
            | 0x70
            | (if self.ch4.enabled { 0x08 } else { 0 })
            | (if self.ch3.enabled { 0x04 } else { 0 })
            | (if self.ch2.enabled { 0x02 } else { 0 })
            | (if self.ch1.enabled { 0x01 } else { 0 })
    }

    pub fn read_register(&self, addr: u16) -> Option<u8> {
        match addr {
            0xFF10 => Some(self.ch1.read_nrx0()),
            0xFF11 => Some(self.ch1.read_nrx1()),
            0xFF12 => Some(self.ch1.read_nrx2()),
            0xFF13 => Some(0xFF),
            0xFF14 => Some(self.ch1.read_nrx4()),
            0xFF16 => Some(self.ch2.read_nrx1()),
            0xFF17 => Some(self.ch2.read_nrx2()),
            0xFF18 => Some(0xFF),
            0xFF19 => Some(self.ch2.read_nrx4()),
            0xFF1A => Some(self.ch3.read_nr30()),
            0xFF1B => Some(0xFF),
            0xFF1C => Some(self.ch3.read_nr32()),
            0xFF1D => Some(0xFF),
            0xFF1E => Some(self.ch3.read_nr34()),
            0xFF20 => Some(0xFF),
            0xFF21 => Some(self.ch4.read_nr42()),
            0xFF22 => Some(self.ch4.read_nr43()),
            0xFF23 => Some(self.ch4.read_nr44()),
            0xFF24 => Some(self.nr50),
            0xFF25 => Some(self.nr51.bits),
            0xFF26 => Some(self.status_byte()),
            0xFF30..=0xFF3F => Some(self.ch3.read_wave_ram(addr)),
            _ => None,
        }
    }

    pub fn write_register(&mut self, addr: u16, value: u8) -> bool {
        if !self.enabled && addr != 0xFF26 && !(0xFF30..=0xFF3F).contains(&addr) {
            return true; // writes to APU registers are ignored while powered off
        }
        match addr {
            0xFF10 => self.ch1.write_nrx0(value),
            0xFF11 => self.ch1.write_nrx1(value),
            0xFF12 => self.ch1.write_nrx2(value),
            0xFF13 => self.ch1.write_nrx3(value),
            0xFF14 => self.ch1.write_nrx4(value),
            0xFF16 => self.ch2.write_nrx1(value),
            0xFF17 => self.ch2.write_nrx2(value),
            0xFF18 => self.ch2.write_nrx3(value),
            0xFF19 => self.ch2.write_nrx4(value),
            0xFF1A => self.ch3.write_nr30(value),
            0xFF1B => self.ch3.write_nr31(value),
            0xFF1C => self.ch3.write_nr32(value),
            0xFF1D => self.ch3.write_nr33(value),
            0xFF1E => self.ch3.write_nr34(value),
            0xFF20 => self.ch4.write_nr41(value),
            0xFF21 => self.ch4.write_nr42(value),
            0xFF22 => self.ch4.write_nr43(value),
            0xFF23 => self.ch4.write_nr44(value),
            0xFF24 => self.nr50 = value,
            0xFF25 => self.nr51 = NR51::from_bits_truncate(value),
            0xFF26 => self.set_enabled(value & 0x80 != 0),
            0xFF30..=0xFF3F => self.ch3.write_wave_ram(addr, value),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_produces_nonzero_sample() {
        let mut apu = Apu::new(44100);
        apu.write_register(0xFF26, 0x80); // power on
        apu.write_register(0xFF12, 0xF0); // max volume, increasing... actually bit3=0 => decreasing from 15
        apu.write_register(0xFF14, 0x80); // trigger, length disabled
        apu.step(crate::CPU_CLOCK / 44100);
        let mut out = [0.0f32; 2];
        let n = apu.drain_samples(&mut out);
        assert_eq!(n, 2);
    }

    #[test]
    fn test_power_off_clears_channels() {
        let mut apu = Apu::new(44100);
        apu.write_register(0xFF26, 0x80);
        apu.write_register(0xFF12, 0xF0);
        apu.write_register(0xFF14, 0x80);
        apu.write_register(0xFF26, 0x00);
        assert_eq!(apu.status_byte() & 0x0F, 0);
    }
}

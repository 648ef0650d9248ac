//! Per-channel controller state (program, bank, mix, pitch, RPN/NRPN).

use log::{debug, trace};

use super::standard::{Standard, StandardSet};

/// Controller numbers the player understands.
pub mod cc {
    pub const BANK_SELECT_MSB: u8 = 0;
    pub const MODULATION: u8 = 1;
    pub const DATA_ENTRY_MSB: u8 = 6;
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const EXPRESSION: u8 = 11;
    pub const BANK_SELECT_LSB: u8 = 32;
    pub const DATA_ENTRY_LSB: u8 = 38;
    pub const SUSTAIN: u8 = 64;
    pub const REVERB_SEND: u8 = 91;
    pub const CHORUS_SEND: u8 = 93;
    pub const NRPN_LSB: u8 = 98;
    pub const NRPN_MSB: u8 = 99;
    pub const RPN_LSB: u8 = 100;
    pub const RPN_MSB: u8 = 101;
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/*
RPN / NRPN
==========

Parameters beyond the 128 controllers are set in two steps: select a
parameter number, then send its value through Data Entry.

  CC101/CC100   RPN  MSB/LSB      registered (same meaning everywhere)
  CC99/CC98     NRPN MSB/LSB      non-registered (vendor specific)
  CC6/CC38      Data Entry MSB/LSB

    B0 65 00   B0 64 00   B0 06 0C      RPN 0 (bend range) = 12 semitones

Selecting one kind deselects the other. 7F/7F is the "null" selection and
makes Data Entry a no-op.

Registered parameters applied here:

  0  pitch bend sensitivity   semitones = data MSB
  1  fine tuning              cents = (data14 - 8192) / 8192 * 100
  2  coarse tuning            semitones = data MSB - 64
  3  GM2 tuning program       logged
  4  GM2 tuning bank          logged

GS and XG NRPNs (vibrato rate/depth/delay, filter cutoff/resonance) are
recorded per channel for inspection but do not change the sound.
*/

const NULL_PARAM: u8 = 0x7F;
pub const DEFAULT_BEND_SENSITIVITY: f32 = 2.0;
pub const DEFAULT_VOLUME: u8 = 100;
pub const CENTER_PAN: u8 = 64;

/// Vendor NRPN values seen on this channel, keyed by meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NrpnParams {
    pub vibrato_rate: Option<u16>,
    pub vibrato_depth: Option<u16>,
    pub vibrato_delay: Option<u16>,
    pub filter_cutoff: Option<u16>,
    pub filter_resonance: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub program: u8,
    pub bank_msb: u8,
    pub bank_lsb: u8,

    /// -8192..=8191
    pub pitch_bend: i16,
    pub bend_sensitivity: f32,
    pub fine_tuning_cents: f32,
    pub coarse_tuning: f32,

    pub sustain: bool,
    pub volume: u8,
    pub pan: u8,
    pub expression: u8,
    pub modulation: u8,
    pub reverb_send: u8,
    pub chorus_send: u8,

    rpn: (u8, u8),
    nrpn: (u8, u8),
    data_entry: (u8, u8),
    pub nrpn_params: NrpnParams,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            program: 0,
            bank_msb: 0,
            bank_lsb: 0,
            pitch_bend: 0,
            bend_sensitivity: DEFAULT_BEND_SENSITIVITY,
            fine_tuning_cents: 0.0,
            coarse_tuning: 0.0,
            sustain: false,
            volume: DEFAULT_VOLUME,
            pan: CENTER_PAN,
            expression: 127,
            modulation: 0,
            reverb_send: 40,
            chorus_send: 0,
            rpn: (NULL_PARAM, NULL_PARAM),
            nrpn: (NULL_PARAM, NULL_PARAM),
            data_entry: (0, 0),
            nrpn_params: NrpnParams::default(),
        }
    }

    /// `(msb << 7) | lsb`
    pub fn bank(&self) -> u16 {
        (u16::from(self.bank_msb) << 7) | u16::from(self.bank_lsb)
    }

    pub fn program_change(&mut self, program: u8) {
        self.program = program.min(127);
    }

    pub fn pitch_bend(&mut self, value: i16) {
        self.pitch_bend = value.clamp(-8192, 8191);
    }

    /// Bend plus tuning, in semitones.
    pub fn pitch_offset(&self) -> f32 {
        (self.pitch_bend as f32 / 8192.0) * self.bend_sensitivity
            + self.coarse_tuning
            + self.fine_tuning_cents / 100.0
    }

    /// Volume times expression, 0..=1.
    pub fn gain(&self) -> f32 {
        (self.volume as f32 / 127.0) * (self.expression as f32 / 127.0)
    }

    /// Selected RPN as a 14-bit number, or `None` when null.
    pub fn selected_rpn(&self) -> Option<u16> {
        param_number(self.rpn)
    }

    pub fn selected_nrpn(&self) -> Option<u16> {
        param_number(self.nrpn)
    }

    /// Apply a control change. `channel` is only used for diagnostics.
    pub fn control_change(
        &mut self,
        channel: u8,
        controller: u8,
        value: u8,
        standards: &StandardSet,
    ) {
        let value = value.min(127);

        match controller {
            cc::BANK_SELECT_MSB => self.bank_msb = value,
            cc::BANK_SELECT_LSB => self.bank_lsb = value,
            cc::MODULATION => self.modulation = value,
            cc::VOLUME => self.volume = value,
            cc::PAN => self.pan = value,
            cc::EXPRESSION => self.expression = value,
            cc::SUSTAIN => self.sustain = value >= 64,
            cc::REVERB_SEND => self.reverb_send = value,
            cc::CHORUS_SEND => self.chorus_send = value,
            cc::RPN_MSB => {
                self.rpn.0 = value;
                self.nrpn = (NULL_PARAM, NULL_PARAM);
            }
            cc::RPN_LSB => {
                self.rpn.1 = value;
                self.nrpn = (NULL_PARAM, NULL_PARAM);
            }
            cc::NRPN_MSB => {
                self.nrpn.0 = value;
                self.rpn = (NULL_PARAM, NULL_PARAM);
            }
            cc::NRPN_LSB => {
                self.nrpn.1 = value;
                self.rpn = (NULL_PARAM, NULL_PARAM);
            }
            cc::DATA_ENTRY_MSB => {
                self.data_entry.0 = value;
                self.apply_data_entry(channel, standards);
            }
            cc::DATA_ENTRY_LSB => {
                self.data_entry.1 = value;
                self.apply_data_entry(channel, standards);
            }
            cc::RESET_ALL_CONTROLLERS => self.reset_controllers(),
            other => trace!("ch {channel}: controller {other} = {value} ignored"),
        }
    }

    /// Controller defaults; program, bank and volume survive.
    pub fn reset_controllers(&mut self) {
        self.pan = CENTER_PAN;
        self.expression = 127;
        self.modulation = 0;
        self.sustain = false;
        self.pitch_bend = 0;
        self.rpn = (NULL_PARAM, NULL_PARAM);
        self.nrpn = (NULL_PARAM, NULL_PARAM);
    }

    fn apply_data_entry(&mut self, channel: u8, standards: &StandardSet) {
        let (msb, lsb) = self.data_entry;
        let data = (u16::from(msb) << 7) | u16::from(lsb);

        if let Some(rpn) = self.selected_rpn() {
            match rpn {
                0 => self.bend_sensitivity = f32::from(msb),
                1 => self.fine_tuning_cents = (f32::from(data) - 8192.0) / 8192.0 * 100.0,
                2 => self.coarse_tuning = f32::from(msb) - 64.0,
                3 if standards.contains(Standard::Gm2) => {
                    debug!("ch {channel}: GM2 tuning program {msb} selected")
                }
                4 if standards.contains(Standard::Gm2) => {
                    debug!("ch {channel}: GM2 tuning bank {msb} selected")
                }
                other => trace!("ch {channel}: RPN 0x{other:04x} ignored"),
            }
        } else if let Some(nrpn) = self.selected_nrpn() {
            for standard in [Standard::Gs, Standard::Xg] {
                if standards.contains(standard) {
                    self.vendor_nrpn(channel, standard, nrpn, data);
                }
            }
        }
    }

    fn vendor_nrpn(&mut self, channel: u8, standard: Standard, nrpn: u16, data: u16) {
        let (slot, label) = match nrpn {
            0x0108 => (&mut self.nrpn_params.vibrato_rate, "vibrato rate"),
            0x0109 => (&mut self.nrpn_params.vibrato_depth, "vibrato depth"),
            0x010A => (&mut self.nrpn_params.vibrato_delay, "vibrato delay"),
            0x0120 => (&mut self.nrpn_params.filter_cutoff, "filter cutoff"),
            0x0121 => (&mut self.nrpn_params.filter_resonance, "filter resonance"),
            _ => return,
        };
        *slot = Some(data);
        debug!("ch {channel}: {} {label} {data}", standard.name());
    }
}

fn param_number((msb, lsb): (u8, u8)) -> Option<u16> {
    if msb == NULL_PARAM && lsb == NULL_PARAM {
        None
    } else {
        Some((u16::from(msb) << 7) | u16::from(lsb))
    }
}

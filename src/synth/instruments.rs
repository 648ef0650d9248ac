//! Built-in instrument definitions for General MIDI and its extensions.
//!
//! Every definition is `'static`: the control thread resolves a
//! `&'static InstrumentDefinition` at note-on and ships the reference to the
//! audio thread inside a `Copy` message, so nothing is cloned or allocated
//! on the way.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::dsp::{envelope::Adsr, filter::FilterType, oscillator::Waveform};

/// Partials beyond the fundamental a voice can hold.
pub const MAX_HARMONICS: usize = 7;

/// Additional partial at `ratio` times the fundamental.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Harmonic {
    pub waveform: Waveform,
    pub ratio: f32,
    pub gain: f32,
}

/// Cutoff envelope: `cutoff = base + amount * base * env`.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterEnvelope {
    pub adsr: Adsr,
    pub amount: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterType,
    pub cutoff_hz: f32,
    pub q: f32,
    pub envelope: Option<FilterEnvelope>,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoParam {
    /// Vibrato, in Hz added to every partial.
    Frequency,
    /// Tremolo, as a fraction of the voice gain.
    Amplitude,
    /// Wah, in Hz added to the cutoff.
    FilterCutoff,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoTarget {
    pub param: LfoParam,
    pub amount: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSpec {
    pub rate_hz: f32,
    pub depth: f32,
    pub targets: &'static [LfoTarget],
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentDefinition {
    pub name: &'static str,
    pub waveform: Waveform,
    pub harmonics: &'static [Harmonic],
    pub envelope: Adsr,
    pub filter: Option<FilterSpec>,
    pub lfo: Option<LfoSpec>,
}

impl InstrumentDefinition {
    pub const fn new(
        name: &'static str,
        waveform: Waveform,
        harmonics: &'static [Harmonic],
        envelope: Adsr,
    ) -> Self {
        Self {
            name,
            waveform,
            harmonics,
            envelope,
            filter: None,
            lfo: None,
        }
    }

    pub const fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    pub const fn with_lfo(mut self, lfo: LfoSpec) -> Self {
        self.lfo = Some(lfo);
        self
    }

    /// Seconds from note-off until the voice is silent.
    pub fn release_seconds(&self) -> f32 {
        let filter_release = self
            .filter
            .and_then(|f| f.envelope)
            .map_or(0.0, |e| e.adsr.release);
        self.envelope.release.max(filter_release)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramEntry {
    pub program: u8,
    pub instrument: InstrumentDefinition,
}

#[derive(Debug, Clone, Copy)]
pub struct BankEntry {
    pub bank: u16,
    pub program: u8,
    pub instrument: InstrumentDefinition,
}

#[derive(Debug, Clone, Copy)]
pub struct DrumEntry {
    pub kit: u8,
    pub note: u8,
    pub instrument: InstrumentDefinition,
}

// A struct literal, so the harmonic slices below promote to 'static
macro_rules! partial {
    ($waveform:ident, $ratio:expr, $gain:expr) => {
        Harmonic {
            waveform: Waveform::$waveform,
            ratio: $ratio,
            gain: $gain,
        }
    };
}

const fn program(program: u8, instrument: InstrumentDefinition) -> ProgramEntry {
    ProgramEntry {
        program,
        instrument,
    }
}

const fn bank(bank: u16, program: u8, instrument: InstrumentDefinition) -> BankEntry {
    BankEntry {
        bank,
        program,
        instrument,
    }
}

const fn drum(kit: u8, note: u8, instrument: InstrumentDefinition) -> DrumEntry {
    DrumEntry {
        kit,
        note,
        instrument,
    }
}

use Waveform::{Saw, Sine, Square, Triangle};

/// Used when a table has nothing at or below the requested program.
pub static FALLBACK: InstrumentDefinition =
    InstrumentDefinition::new("Sine", Sine, &[], Adsr::new(0.01, 0.1, 0.7, 0.3));

const VIBRATO: &[LfoTarget] = &[LfoTarget {
    param: LfoParam::Frequency,
    amount: 1.0,
}];

const TREMOLO: &[LfoTarget] = &[LfoTarget {
    param: LfoParam::Amplitude,
    amount: 1.0,
}];

const WAH: &[LfoTarget] = &[LfoTarget {
    param: LfoParam::FilterCutoff,
    amount: 1.0,
}];

/// General MIDI level 1 programs. Gaps fall back to the nearest program
/// below.
pub static GM_INSTRUMENTS: &[ProgramEntry] = &[
    program(
        0,
        InstrumentDefinition::new(
            "Acoustic Grand Piano",
            Triangle,
            &[partial!(Sine, 2.0, 0.5), partial!(Sine, 4.0, 0.2)],
            Adsr::new(0.02, 0.1, 0.7, 0.3),
        ),
    ),
    program(
        8,
        InstrumentDefinition::new(
            "Celesta",
            Sine,
            &[partial!(Sine, 3.0, 0.3), partial!(Sine, 5.0, 0.1)],
            Adsr::new(0.01, 0.05, 0.5, 0.1),
        ),
    ),
    program(
        11,
        InstrumentDefinition::new(
            "Vibraphone",
            Sine,
            &[partial!(Sine, 4.0, 0.25), partial!(Sine, 10.0, 0.05)],
            Adsr::new(0.005, 0.8, 0.3, 0.6),
        )
        .with_lfo(LfoSpec {
            rate_hz: 5.5,
            depth: 0.3,
            targets: TREMOLO,
        }),
    ),
    program(
        16,
        InstrumentDefinition::new(
            "Hammond Organ",
            Sine,
            &[
                partial!(Sine, 2.0, 0.7),
                partial!(Sine, 3.0, 0.5),
                partial!(Sine, 4.0, 0.3),
            ],
            Adsr::new(0.05, 0.1, 1.0, 0.1),
        ),
    ),
    program(
        24,
        InstrumentDefinition::new(
            "Acoustic Guitar",
            Triangle,
            &[partial!(Sine, 2.0, 0.4), partial!(Triangle, 3.0, 0.2)],
            Adsr::new(0.01, 0.1, 0.6, 0.2),
        ),
    ),
    program(
        32,
        InstrumentDefinition::new(
            "Acoustic Bass",
            Triangle,
            &[partial!(Sine, 2.0, 0.3)],
            Adsr::new(0.05, 0.3, 0.8, 0.4),
        ),
    ),
    program(
        40,
        InstrumentDefinition::new(
            "Violin",
            Saw,
            &[partial!(Sine, 2.0, 0.4), partial!(Sine, 3.0, 0.2)],
            Adsr::new(0.1, 0.2, 0.7, 0.3),
        )
        .with_lfo(LfoSpec {
            rate_hz: 5.8,
            depth: 3.0,
            targets: VIBRATO,
        }),
    ),
    program(
        48,
        InstrumentDefinition::new(
            "Strings Ensemble",
            Saw,
            &[partial!(Sine, 2.0, 0.5), partial!(Saw, 1.01, 0.3)],
            Adsr::new(0.2, 0.3, 0.8, 0.4),
        ),
    ),
    program(
        56,
        InstrumentDefinition::new(
            "Trumpet",
            Square,
            &[partial!(Sine, 2.0, 0.5), partial!(Sine, 3.0, 0.3)],
            Adsr::new(0.05, 0.1, 0.8, 0.1),
        ),
    ),
    program(
        64,
        InstrumentDefinition::new(
            "Soprano Sax",
            Square,
            &[partial!(Sine, 2.0, 0.6), partial!(Sine, 3.0, 0.4)],
            Adsr::new(0.05, 0.1, 0.7, 0.2),
        ),
    ),
    program(
        80,
        InstrumentDefinition::new(
            "Square Lead",
            Square,
            &[partial!(Saw, 1.01, 0.5)],
            Adsr::new(0.01, 0.1, 0.6, 0.2),
        ),
    ),
    program(
        81,
        InstrumentDefinition::new(
            "Sawtooth Lead",
            Saw,
            &[partial!(Saw, 1.005, 0.6)],
            Adsr::new(0.005, 0.15, 0.8, 0.15),
        )
        .with_filter(FilterSpec {
            kind: FilterType::LowPass,
            cutoff_hz: 1_200.0,
            q: 2.0,
            envelope: Some(FilterEnvelope {
                adsr: Adsr::new(0.01, 0.3, 0.3, 0.2),
                amount: 3.0,
            }),
        }),
    ),
    program(
        88,
        InstrumentDefinition::new(
            "New Age Pad",
            Saw,
            &[partial!(Triangle, 2.0, 0.4), partial!(Saw, 0.995, 0.5)],
            Adsr::new(0.4, 0.6, 0.8, 1.2),
        )
        .with_filter(FilterSpec {
            kind: FilterType::LowPass,
            cutoff_hz: 800.0,
            q: 1.5,
            envelope: Some(FilterEnvelope {
                adsr: Adsr::new(0.8, 1.0, 0.5, 1.0),
                amount: 2.0,
            }),
        })
        .with_lfo(LfoSpec {
            rate_hz: 0.6,
            depth: 300.0,
            targets: WAH,
        }),
    ),
];

/// GM2 variation banks (121 piano, 122 organ, 123 guitar).
pub static GM2_VARIATIONS: &[BankEntry] = &[
    bank(
        121,
        0,
        InstrumentDefinition::new(
            "European Grand",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.6),
                partial!(Sine, 4.0, 0.3),
                partial!(Sine, 8.0, 0.1),
            ],
            Adsr::new(0.02, 0.15, 0.8, 0.4),
        ),
    ),
    bank(
        121,
        1,
        InstrumentDefinition::new(
            "Classical Grand",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.5),
                partial!(Triangle, 3.0, 0.3),
                partial!(Sine, 4.0, 0.2),
            ],
            Adsr::new(0.025, 0.12, 0.75, 0.35),
        ),
    ),
    bank(
        121,
        2,
        InstrumentDefinition::new(
            "Studio Grand",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.7),
                partial!(Sine, 4.0, 0.4),
                partial!(Sine, 6.0, 0.15),
            ],
            Adsr::new(0.015, 0.1, 0.7, 0.3),
        ),
    ),
    bank(
        122,
        16,
        InstrumentDefinition::new(
            "Jazz Organ 1",
            Square,
            &[
                partial!(Sine, 2.0, 0.8),
                partial!(Square, 3.0, 0.4),
                partial!(Sine, 4.0, 0.2),
            ],
            Adsr::new(0.01, 0.05, 0.9, 0.1),
        ),
    ),
    bank(
        122,
        17,
        InstrumentDefinition::new(
            "Jazz Organ 2",
            Square,
            &[
                partial!(Sine, 2.0, 0.6),
                partial!(Square, 3.0, 0.6),
                partial!(Triangle, 4.0, 0.3),
            ],
            Adsr::new(0.008, 0.04, 0.95, 0.08),
        ),
    ),
    bank(
        123,
        24,
        InstrumentDefinition::new(
            "Classical Guitar",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.4),
                partial!(Triangle, 3.0, 0.2),
                partial!(Sine, 5.0, 0.1),
            ],
            Adsr::new(0.01, 0.1, 0.4, 0.2),
        ),
    ),
    bank(
        123,
        25,
        InstrumentDefinition::new(
            "Folk Guitar",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.5),
                partial!(Triangle, 3.0, 0.3),
                partial!(Sine, 4.0, 0.15),
            ],
            Adsr::new(0.012, 0.08, 0.45, 0.18),
        ),
    ),
];

/// Roland GS variation banks, consulted once a GS reset has been seen.
pub static GS_VARIATIONS: &[BankEntry] = &[
    bank(
        1,
        0,
        InstrumentDefinition::new(
            "GS Grand Piano",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.6),
                partial!(Sine, 4.0, 0.3),
                partial!(Triangle, 6.0, 0.1),
            ],
            Adsr::new(0.02, 0.12, 0.75, 0.35),
        ),
    ),
    bank(
        1,
        1,
        InstrumentDefinition::new(
            "GS Bright Piano",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.8),
                partial!(Sine, 4.0, 0.5),
                partial!(Sine, 8.0, 0.2),
            ],
            Adsr::new(0.015, 0.1, 0.8, 0.3),
        ),
    ),
    bank(
        8,
        80,
        InstrumentDefinition::new(
            "GS Square Lead",
            Square,
            &[partial!(Square, 2.0, 0.5), partial!(Saw, 3.0, 0.3)],
            Adsr::new(0.005, 0.02, 0.9, 0.05),
        ),
    ),
    bank(
        8,
        81,
        InstrumentDefinition::new(
            "GS Saw Lead",
            Saw,
            &[partial!(Saw, 2.0, 0.6), partial!(Square, 4.0, 0.2)],
            Adsr::new(0.003, 0.015, 0.95, 0.03),
        ),
    ),
];

/// Yamaha XG variation banks, consulted once XG System On has been seen.
pub static XG_VARIATIONS: &[BankEntry] = &[
    bank(
        1,
        0,
        InstrumentDefinition::new(
            "XG Grand Piano",
            Triangle,
            &[
                partial!(Sine, 2.0, 0.65),
                partial!(Sine, 4.0, 0.35),
                partial!(Triangle, 8.0, 0.12),
            ],
            Adsr::new(0.018, 0.11, 0.78, 0.32),
        ),
    ),
    bank(
        127,
        120,
        InstrumentDefinition::new(
            "XG Cutting Noise",
            Square,
            &[partial!(Square, 1.5, 0.8), partial!(Saw, 3.7, 0.4)],
            Adsr::new(0.001, 0.05, 0.1, 0.02),
        ),
    ),
    bank(
        127,
        121,
        InstrumentDefinition::new(
            "XG Cutting Noise 2",
            Saw,
            &[partial!(Square, 2.1, 0.6), partial!(Saw, 4.3, 0.3)],
            Adsr::new(0.002, 0.03, 0.15, 0.015),
        ),
    ),
];

/// Percussion kits on bank 128, keyed by kit (program) and note.
pub static DRUM_KITS: &[DrumEntry] = &[
    drum(
        0,
        36,
        InstrumentDefinition::new(
            "Standard Bass Drum",
            Sine,
            &[partial!(Sine, 0.5, 0.9), partial!(Triangle, 1.0, 0.4)],
            Adsr::new(0.001, 0.12, 0.05, 0.08),
        ),
    ),
    drum(
        0,
        38,
        InstrumentDefinition::new(
            "Standard Snare",
            Square,
            &[partial!(Square, 2.3, 0.6), partial!(Saw, 4.7, 0.4)],
            Adsr::new(0.001, 0.07, 0.1, 0.05),
        ),
    ),
    drum(
        0,
        42,
        InstrumentDefinition::new(
            "Closed Hi-Hat",
            Square,
            &[
                partial!(Square, 5.4, 0.5),
                partial!(Square, 7.9, 0.4),
                partial!(Saw, 11.3, 0.3),
            ],
            Adsr::new(0.001, 0.03, 0.0, 0.02),
        )
        .with_filter(FilterSpec {
            kind: FilterType::HighPass,
            cutoff_hz: 6_000.0,
            q: 0.8,
            envelope: None,
        }),
    ),
    drum(
        0,
        46,
        InstrumentDefinition::new(
            "Open Hi-Hat",
            Square,
            &[
                partial!(Square, 5.4, 0.5),
                partial!(Square, 7.9, 0.4),
                partial!(Saw, 11.3, 0.3),
            ],
            Adsr::new(0.001, 0.25, 0.1, 0.15),
        )
        .with_filter(FilterSpec {
            kind: FilterType::HighPass,
            cutoff_hz: 5_000.0,
            q: 0.8,
            envelope: None,
        }),
    ),
    drum(
        1,
        36,
        InstrumentDefinition::new(
            "Room Bass Drum",
            Sine,
            &[partial!(Sine, 0.5, 0.8), partial!(Triangle, 1.0, 0.6)],
            Adsr::new(0.001, 0.15, 0.1, 0.1),
        ),
    ),
    drum(
        1,
        38,
        InstrumentDefinition::new(
            "Room Snare",
            Square,
            &[partial!(Square, 2.0, 0.7), partial!(Saw, 4.0, 0.4)],
            Adsr::new(0.001, 0.08, 0.2, 0.05),
        ),
    ),
    drum(
        9,
        36,
        InstrumentDefinition::new(
            "Power Bass Drum",
            Sine,
            &[
                partial!(Sine, 0.5, 1.0),
                partial!(Triangle, 1.0, 0.8),
                partial!(Square, 2.0, 0.3),
            ],
            Adsr::new(0.001, 0.2, 0.15, 0.12),
        ),
    ),
    drum(
        9,
        38,
        InstrumentDefinition::new(
            "Power Snare",
            Square,
            &[
                partial!(Square, 2.0, 0.9),
                partial!(Saw, 4.0, 0.6),
                partial!(Square, 8.0, 0.2),
            ],
            Adsr::new(0.001, 0.1, 0.25, 0.06),
        ),
    ),
];

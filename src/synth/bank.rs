use log::trace;

use super::instruments::{
    BankEntry, DrumEntry, InstrumentDefinition, ProgramEntry, DRUM_KITS, FALLBACK,
    GM2_VARIATIONS, GM_INSTRUMENTS, GS_VARIATIONS, XG_VARIATIONS,
};
use super::standard::{Standard, StandardSet};

/// GM2 melodic variation banks.
pub const GM2_VARIATION_BANKS: std::ops::RangeInclusive<u16> = 120..=127;
/// Percussion kits; the program selects the kit.
pub const PERCUSSION_BANK: u16 = 128;

/// Picks an instrument for `(bank, program, note)` at note-on time.
///
/// Precedence:
///   1. GM2 variation (bank 120-127), whenever an entry exists
///   2. GS variation, once GS has been detected
///   3. XG variation, once XG has been detected
///   4. drum kit (bank 128, kit = program, per note)
///   5. General MIDI, walking down from `program` to the first defined one
#[derive(Debug, Clone, Copy)]
pub struct BankResolver {
    gm: &'static [ProgramEntry],
    gm2: &'static [BankEntry],
    gs: &'static [BankEntry],
    xg: &'static [BankEntry],
    drums: &'static [DrumEntry],
}

impl Default for BankResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BankResolver {
    /// Built-in tables.
    pub fn new() -> Self {
        Self {
            gm: GM_INSTRUMENTS,
            gm2: GM2_VARIATIONS,
            gs: GS_VARIATIONS,
            xg: XG_VARIATIONS,
            drums: DRUM_KITS,
        }
    }

    pub fn with_gm(mut self, gm: &'static [ProgramEntry]) -> Self {
        self.gm = gm;
        self
    }

    pub fn with_gm2(mut self, gm2: &'static [BankEntry]) -> Self {
        self.gm2 = gm2;
        self
    }

    pub fn with_gs(mut self, gs: &'static [BankEntry]) -> Self {
        self.gs = gs;
        self
    }

    pub fn with_xg(mut self, xg: &'static [BankEntry]) -> Self {
        self.xg = xg;
        self
    }

    pub fn with_drums(mut self, drums: &'static [DrumEntry]) -> Self {
        self.drums = drums;
        self
    }

    pub fn resolve(
        &self,
        bank: u16,
        program: u8,
        note: u8,
        standards: &StandardSet,
    ) -> &'static InstrumentDefinition {
        if GM2_VARIATION_BANKS.contains(&bank) {
            if let Some(def) = find_bank(self.gm2, bank, program) {
                return def;
            }
        }

        if standards.contains(Standard::Gs) {
            if let Some(def) = find_bank(self.gs, bank, program) {
                return def;
            }
        }

        if standards.contains(Standard::Xg) {
            if let Some(def) = find_bank(self.xg, bank, program) {
                return def;
            }
        }

        if bank == PERCUSSION_BANK {
            if let Some(entry) = self
                .drums
                .iter()
                .find(|e| e.kit == program && e.note == note)
            {
                return &entry.instrument;
            }
        }

        self.general_midi(program)
    }

    /// Nearest defined GM program at or below `program`.
    pub fn general_midi(&self, program: u8) -> &'static InstrumentDefinition {
        let found = self
            .gm
            .iter()
            .filter(|e| e.program <= program)
            .max_by_key(|e| e.program);

        match found {
            Some(entry) => {
                if entry.program != program {
                    trace!("program {program} undefined, using {}", entry.program);
                }
                &entry.instrument
            }
            None => &FALLBACK,
        }
    }
}

fn find_bank(
    table: &'static [BankEntry],
    bank: u16,
    program: u8,
) -> Option<&'static InstrumentDefinition> {
    table
        .iter()
        .find(|e| e.bank == bank && e.program == program)
        .map(|e| &e.instrument)
}

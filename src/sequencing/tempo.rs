//! Tempo map: tick positions to wall-clock milliseconds and back.

/*
Tempo Maps
==========

An SMF stores time in ticks. The header fixes the resolution (PPQN, ticks
per quarter note); Set-Tempo meta events say how long a quarter note lasts
(microseconds per quarter, µs/q). Tempo is piecewise constant, so the map
from ticks to milliseconds is piecewise linear:

    ms = ticks * tempo / (ppqn * 1000)

  ms
   │                        ╱
   │                     ╱        120 BPM  (500 000 µs/q)
   │               ____╱
   │          ____╱               240 BPM  (250 000 µs/q): flatter
   │      ╱╱
   │   ╱╱                         120 BPM  (default before the first change)
   └───────┬──────────┬──────────→ ticks
         change     change

Before the first Set-Tempo the file runs at the default of 500 000 µs/q.
We cache the elapsed milliseconds at every change point, so both directions
are a binary search plus one linear segment.
*/

/// 120 BPM.
pub const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    pub micros_per_quarter: u32,
}

#[derive(Debug, Clone)]
pub struct TempoMap {
    ticks_per_quarter: u16,
    changes: Vec<TempoChange>,
    // Elapsed ms at each change point (parallel to `changes`)
    change_ms: Vec<f64>,
}

impl TempoMap {
    pub fn new(ticks_per_quarter: u16) -> Self {
        Self {
            ticks_per_quarter: ticks_per_quarter.max(1),
            changes: Vec::new(),
            change_ms: Vec::new(),
        }
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// Insert a tempo change. A change at an existing tick replaces it.
    pub fn insert(&mut self, tick: u64, micros_per_quarter: u32) {
        let change = TempoChange {
            tick,
            micros_per_quarter: micros_per_quarter.max(1),
        };

        let idx = match self.changes.binary_search_by_key(&tick, |c| c.tick) {
            Ok(idx) => {
                self.changes[idx] = change;
                idx
            }
            Err(idx) => {
                self.changes.insert(idx, change);
                self.change_ms.insert(idx, 0.0);
                idx
            }
        };

        self.rebuild_from(idx);
    }

    fn rebuild_from(&mut self, start: usize) {
        for i in start..self.changes.len() {
            self.change_ms[i] = if i == 0 {
                self.segment_ms(self.changes[0].tick as f64, DEFAULT_TEMPO)
            } else {
                let prev = self.changes[i - 1];
                self.change_ms[i - 1]
                    + self.segment_ms((self.changes[i].tick - prev.tick) as f64, prev.micros_per_quarter)
            };
        }
    }

    #[inline]
    fn segment_ms(&self, ticks: f64, tempo: u32) -> f64 {
        ticks * tempo as f64 / (self.ticks_per_quarter as f64 * 1000.0)
    }

    #[inline]
    fn segment_ticks(&self, ms: f64, tempo: u32) -> f64 {
        ms * self.ticks_per_quarter as f64 * 1000.0 / tempo as f64
    }

    pub fn ticks_to_ms(&self, ticks: u64) -> f64 {
        self.fractional_ticks_to_ms(ticks as f64)
    }

    /// Changes at or after `ticks` do not contribute; the last change
    /// strictly before it sets the remaining segment's tempo.
    pub fn fractional_ticks_to_ms(&self, ticks: f64) -> f64 {
        let ticks = ticks.max(0.0);
        let idx = self.changes.partition_point(|c| (c.tick as f64) < ticks);

        if idx == 0 {
            return self.segment_ms(ticks, DEFAULT_TEMPO);
        }

        let change = self.changes[idx - 1];
        self.change_ms[idx - 1] + self.segment_ms(ticks - change.tick as f64, change.micros_per_quarter)
    }

    /// Inverse of [`fractional_ticks_to_ms`](Self::fractional_ticks_to_ms).
    /// Returns fractional ticks.
    pub fn ms_to_ticks(&self, ms: f64) -> f64 {
        let ms = ms.max(0.0);
        let idx = self.change_ms.partition_point(|&at| at < ms);

        if idx == 0 {
            return self.segment_ticks(ms, DEFAULT_TEMPO);
        }

        let change = self.changes[idx - 1];
        change.tick as f64 + self.segment_ticks(ms - self.change_ms[idx - 1], change.micros_per_quarter)
    }

    /// Tempo in effect at `tick` (a change at `tick` applies).
    pub fn tempo_at(&self, tick: u64) -> u32 {
        let idx = self.changes.partition_point(|c| c.tick <= tick);
        if idx == 0 {
            DEFAULT_TEMPO
        } else {
            self.changes[idx - 1].micros_per_quarter
        }
    }

    pub fn bpm_at(&self, tick: u64) -> f64 {
        60_000_000.0 / self.tempo_at(tick) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_tempo_is_120_bpm() {
        let map = TempoMap::new(480);
        assert_eq!(map.ticks_to_ms(0), 0.0);
        assert_relative_eq!(map.ticks_to_ms(480), 500.0);
        assert_relative_eq!(map.bpm_at(0), 120.0);
    }

    #[test]
    fn tempo_change_splits_segments() {
        let mut map = TempoMap::new(480);
        map.insert(480, 250_000);

        assert_relative_eq!(map.ticks_to_ms(480), 500.0);
        assert_relative_eq!(map.ticks_to_ms(960), 750.0);
        assert_relative_eq!(map.ms_to_ticks(750.0), 960.0);
        assert_relative_eq!(map.ms_to_ticks(250.0), 240.0);
        assert_eq!(map.tempo_at(479), DEFAULT_TEMPO);
        assert_eq!(map.tempo_at(480), 250_000);
    }

    #[test]
    fn change_at_tick_zero_applies_from_start() {
        let mut map = TempoMap::new(96);
        map.insert(0, 1_000_000);
        assert_eq!(map.ticks_to_ms(0), 0.0);
        assert_relative_eq!(map.ticks_to_ms(96), 1000.0);
        assert_relative_eq!(map.ms_to_ticks(1000.0), 96.0);
    }

    #[test]
    fn reinserting_overwrites_and_stays_sorted() {
        let mut map = TempoMap::new(480);
        map.insert(960, 400_000);
        map.insert(0, 600_000);
        map.insert(480, 300_000);
        map.insert(480, 250_000);

        let ticks: Vec<u64> = map.changes().iter().map(|c| c.tick).collect();
        assert_eq!(ticks, vec![0, 480, 960]);
        assert_eq!(map.tempo_at(480), 250_000);

        // 480 @ 600k + 480 @ 250k + 480 @ 400k
        assert_relative_eq!(map.ticks_to_ms(1440), 600.0 + 250.0 + 400.0);
    }

    #[test]
    fn single_tempo_round_trip() {
        for &(ppq, tempo) in &[(480u16, 500_000u32), (96, 333_333), (960, 1_250_000)] {
            let mut map = TempoMap::new(ppq);
            map.insert(0, tempo);
            for ms in [0.0, 0.5, 1.0, 17.3, 999.9, 12_345.6, 600_000.0] {
                let back = map.fractional_ticks_to_ms(map.ms_to_ticks(ms));
                assert!((back - ms).abs() < 1e-6, "round trip {ms} -> {back}");
            }
        }
    }

    #[test]
    fn conversion_is_monotonic_across_changes() {
        let mut map = TempoMap::new(120);
        map.insert(100, 200_000);
        map.insert(250, 900_000);
        map.insert(251, 50_000);

        let mut last = -1.0;
        for tick in 0..600 {
            let ms = map.ticks_to_ms(tick);
            assert!(ms >= last, "tick {tick}: {ms} < {last}");
            last = ms;
        }

        let mut last_ticks = -1.0;
        for step in 0..400 {
            let ticks = map.ms_to_ticks(step as f64 * 5.0);
            assert!(ticks >= last_ticks);
            last_ticks = ticks;
        }
    }

    #[test]
    fn negative_time_clamps_to_zero() {
        let map = TempoMap::new(480);
        assert_eq!(map.ms_to_ticks(-50.0), 0.0);
        assert_eq!(map.fractional_ticks_to_ms(-3.0), 0.0);
    }
}

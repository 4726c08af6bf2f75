//! FIG carousel repetition rate analysis.

use std::collections::{BTreeMap, BTreeSet};

const FRAME_DURATION: f64 = 24e-3;

#[derive(Debug, Default)]
struct FigRateInfo {
    /// Frame numbers in which the FIG is present.
    frames_present: Vec<u32>,
    /// Frame numbers in which a complete set for that FIG has been sent.
    frames_complete: Vec<u32>,
    /// Which FIBs this FIG was seen in.
    in_fib: BTreeSet<u8>,
}

/// Tracks per-FIG repetition intervals across frames, keyed by FIG
/// type and extension.
#[derive(Debug, Default)]
pub struct RateStatistics {
    fig_rates: BTreeMap<(u8, u8), FigRateInfo>,
    current_frame: u32,
    current_fib: u8,
}

/// Interval statistics over the frame numbers a FIG was seen in.
///
/// Repeats within the same frame are not carousel intervals and are
/// skipped; `None` when fewer than two distinct frames are present.
fn min_max_avg(positions: &[u32], per_second: bool) -> Option<(f64, f64, f64)> {
    let mut min_delta = u32::MAX;
    let mut max_delta = 0;
    let mut intervals = 0u32;
    for pair in positions.windows(2) {
        let delta = pair[1] - pair[0];
        if delta == 0 {
            continue;
        }
        min_delta = min_delta.min(delta);
        max_delta = max_delta.max(delta);
        intervals += 1;
    }

    if intervals == 0 {
        return None;
    }

    let mut avg =
        (positions[positions.len() - 1] - positions[0]) as f64 / intervals as f64;
    let mut min = min_delta as f64;
    let mut max = max_delta as f64;

    if per_second {
        // the longest interval gives the lowest rate
        avg = 1.0 / (avg * FRAME_DURATION);
        let lowest = 1.0 / (max * FRAME_DURATION);
        let highest = 1.0 / (min * FRAME_DURATION);
        min = lowest;
        max = highest;
    }

    Some((min, max, avg))
}

impl RateStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_fib(&mut self, fib: u8) {
        if fib == 0 {
            self.current_frame += 1;
        }
        self.current_fib = fib;
    }

    pub fn announce_fig(&mut self, figtype: u8, extension: u8, complete: bool) {
        let rate = self
            .fig_rates
            .entry((figtype, extension))
            .or_default();

        rate.frames_present.push(self.current_frame);
        if complete {
            rate.frames_complete.push(self.current_frame);
        }
        rate.in_fib.insert(self.current_fib);
    }

    pub fn header(per_second: bool) -> &'static str {
        if per_second {
            "FIG carousel analysis. Format:\n\
             min, average, max FIGs per second (total count) -\n\
             min, average, max complete FIGs per second (total count)"
        } else {
            "FIG carousel analysis. Format:\n\
             min, average, max frames per FIG (total count) -\n\
             min, average, max frames per complete FIGs (total count)"
        }
    }

    /// Renders one line per FIG seen since the last clear.
    pub fn analysis(&mut self, clear: bool, per_second: bool) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.fig_rates.len());

        for (&(figtype, extension), rate) in &self.fig_rates {
            let n_present = rate.frames_present.len();
            let n_complete = rate.frames_complete.len();

            let mut line = match min_max_avg(&rate.frames_present, per_second) {
                Some((min, max, avg)) => {
                    let mut line = format!(
                        "FIG{figtype:2}/{extension:2} {min:4.2} {avg:4.2} {max:4.2} ({n_present:5})"
                    );

                    match min_max_avg(&rate.frames_complete, per_second) {
                        Some((min, max, avg)) => {
                            line += &format!(" - {min:4.2} {avg:4.2} {max:4.2} ({n_complete:5})");
                        }
                        None => line += " - None complete",
                    }
                    line
                }
                None => format!("FIG{figtype:2}/{extension:2} 0"),
            };

            line += " - in FIB(s):";
            for fib in &rate.in_fib {
                line += &format!(" {fib}");
            }

            lines.push(line);
        }

        if clear {
            self.fig_rates.clear();
        }

        lines
    }
}

#[test]
fn rates_per_frame() {
    let mut stats = RateStatistics::new();

    // FIG 0/1 present every frame in FIB 0, complete every second frame
    for frame in 0..5 {
        stats.new_fib(0);
        stats.announce_fig(0, 1, frame % 2 == 0);
        stats.new_fib(1);
    }

    let lines = stats.analysis(false, false);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("FIG 0/ 1 1.00 1.00 1.00 ("));
    assert!(lines[0].ends_with(" - in FIB(s): 0"));
}

#[test]
fn same_frame_repeats_do_not_skew_intervals() {
    let mut stats = RateStatistics::new();

    // FIG 0/2 shows up in two FIBs of every frame
    for _ in 0..3 {
        stats.new_fib(0);
        stats.announce_fig(0, 2, false);
        stats.new_fib(1);
        stats.announce_fig(0, 2, false);
    }

    let lines = stats.analysis(false, true);
    assert!(!lines[0].contains("inf"), "{}", lines[0]);
    // once per 24 ms frame
    assert!(lines[0].contains("41.67"), "{}", lines[0]);
    assert!(lines[0].ends_with(" - in FIB(s): 0 1"));
}

#[test]
fn per_second_rates_use_both_extremes() {
    let mut stats = RateStatistics::new();

    // intervals of 1 and 3 frames
    for frame in [0u32, 1, 4] {
        while stats.current_frame <= frame {
            stats.new_fib(0);
        }
        stats.announce_fig(0, 0, false);
    }

    let lines = stats.analysis(true, true);
    // 1 frame interval = 41.67/s, 3 frames = 13.89/s
    assert!(lines[0].contains("13.89"), "{}", lines[0]);
    assert!(lines[0].contains("41.67"), "{}", lines[0]);
    assert!(stats.analysis(false, true).is_empty());
}

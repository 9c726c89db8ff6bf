//! Contested capture points.
//!
//! A capture point owns a slider in [0, 100] — 0 is a horde win, 100 an
//! alliance win — that moves toward whichever faction has more players in
//! radius. The contest is resolved on a fixed five second interval, not every
//! world tick.

use std::collections::HashSet;

use crate::common::{Faction, ObjectGuid};

pub const SLIDER_MIN: f32 = 0.0;
pub const SLIDER_MAX: f32 = 100.0;
pub const SLIDER_MIDDLE: f32 = 50.0;

/// Interval between contest resolutions.
pub const CAPTURE_TICK_MILLIS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Neutral,
    /// A faction is pushing the slider out of the neutral band.
    ProgressAlliance,
    ProgressHorde,
    /// A faction is pulling a point off the opposing faction's win bound.
    ContestedAlliance,
    ContestedHorde,
    WinAlliance,
    WinHorde,
}

/// Tuning lifted from the capture point's template data.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTuning {
    pub radius: f32,
    /// Seconds from the middle to a win bound under maximum superiority.
    pub min_capture_secs: u64,
    /// Seconds from the middle to a win bound with a single contester.
    pub max_capture_secs: u64,
    /// Player-count difference past which extra players stop mattering.
    pub max_superiority: u32,
    /// Width of the neutral band around the middle, in slider units.
    pub neutral_percent: f32,
}

#[derive(Debug, Clone)]
pub struct CapturePoint {
    pub slider: f32,
    pub state: CaptureState,
    /// Players currently participating in the contest.
    pub contesters: HashSet<ObjectGuid>,
    interval_remaining: u64,
}

impl Default for CapturePoint {
    fn default() -> Self {
        Self {
            slider: SLIDER_MIDDLE,
            state: CaptureState::Neutral,
            contesters: HashSet::new(),
            interval_remaining: CAPTURE_TICK_MILLIS,
        }
    }
}

impl CapturePoint {
    /// Called every world tick; runs the contest once per capture interval.
    /// Returns the new state when this tick crossed a threshold.
    pub fn advance(
        &mut self,
        dt_millis: u64,
        tuning: &CaptureTuning,
        nearby: &[(ObjectGuid, Faction)],
    ) -> Option<CaptureState> {
        if self.interval_remaining > dt_millis {
            self.interval_remaining -= dt_millis;
            return None;
        }
        self.interval_remaining = CAPTURE_TICK_MILLIS;

        self.tick(tuning, nearby)
    }

    /// One contest resolution. Idempotent with respect to `state`: without a
    /// threshold crossing, no event is produced.
    pub fn tick(
        &mut self,
        tuning: &CaptureTuning,
        nearby: &[(ObjectGuid, Faction)],
    ) -> Option<CaptureState> {
        self.contesters = nearby.iter().map(|(guid, _)| *guid).collect();

        let alliance = nearby.iter().filter(|(_, f)| *f == Faction::Alliance).count() as i32;
        let horde = nearby.len() as i32 - alliance;

        let max_superiority = tuning.max_superiority.max(1) as i32;
        let superiority = (alliance - horde).clamp(-max_superiority, max_superiority);

        if superiority != 0 {
            let fraction = superiority.abs() as f32 / max_superiority as f32;
            let secs_to_cross = tuning.max_capture_secs as f32
                - fraction * (tuning.max_capture_secs - tuning.min_capture_secs) as f32;
            // The capture duration covers the half range from the middle to
            // a win bound.
            let step = (SLIDER_MAX - SLIDER_MIDDLE) * (CAPTURE_TICK_MILLIS as f32 / 1000.0)
                / secs_to_cross.max(1.0);

            if superiority > 0 {
                self.slider = (self.slider + step).min(SLIDER_MAX);
            } else {
                self.slider = (self.slider - step).max(SLIDER_MIN);
            }
        }

        let new_state = state_for(self.slider, self.state, tuning.neutral_percent);
        if new_state != self.state {
            self.state = new_state;
            Some(new_state)
        } else {
            None
        }
    }
}

fn state_for(slider: f32, old: CaptureState, neutral_percent: f32) -> CaptureState {
    use CaptureState::*;

    let band = neutral_percent / 2.0;

    if slider >= SLIDER_MAX {
        WinAlliance
    } else if slider <= SLIDER_MIN {
        WinHorde
    } else if slider > SLIDER_MIDDLE + band {
        // Alliance side of the slider. Leaving the alliance win bound means
        // the horde is contesting it.
        match old {
            WinAlliance | ContestedHorde => ContestedHorde,
            _ => ProgressAlliance,
        }
    } else if slider < SLIDER_MIDDLE - band {
        match old {
            WinHorde | ContestedAlliance => ContestedAlliance,
            _ => ProgressHorde,
        }
    } else {
        Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUNING: CaptureTuning = CaptureTuning {
        radius: 30.0,
        min_capture_secs: 60,
        max_capture_secs: 240,
        max_superiority: 5,
        neutral_percent: 20.0,
    };

    fn alliance_party(n: u64) -> Vec<(ObjectGuid, Faction)> {
        (1..=n).map(|i| (ObjectGuid(i), Faction::Alliance)).collect()
    }

    #[test]
    fn slider_moves_monotonically_and_stays_bounded() {
        let mut point = CapturePoint::default();
        let party = alliance_party(4);

        let mut last = point.slider;
        for _ in 0..1000 {
            point.tick(&TUNING, &party);
            assert!(point.slider >= last);
            assert!(point.slider >= SLIDER_MIN && point.slider <= SLIDER_MAX);
            last = point.slider;
        }
        assert_eq!(point.slider, SLIDER_MAX);
        assert_eq!(point.state, CaptureState::WinAlliance);
    }

    #[test]
    fn four_alliance_contesters_from_the_middle() {
        let mut point = CapturePoint::default();
        let before = point.slider;

        point.tick(&TUNING, &alliance_party(4));

        assert!(point.slider > before);
        assert!(point.slider <= SLIDER_MAX);
        assert_eq!(point.contesters.len(), 4);
    }

    #[test]
    fn balanced_pressure_moves_nothing() {
        let mut point = CapturePoint::default();
        let mixed = vec![
            (ObjectGuid(1), Faction::Alliance),
            (ObjectGuid(2), Faction::Horde),
        ];

        assert_eq!(point.tick(&TUNING, &mixed), None);
        assert_eq!(point.slider, SLIDER_MIDDLE);
        assert_eq!(point.state, CaptureState::Neutral);
    }

    #[test]
    fn each_threshold_crossing_fires_exactly_one_event() {
        let mut point = CapturePoint::default();
        let party = alliance_party(5);

        let mut events = Vec::new();
        while point.state != CaptureState::WinAlliance {
            if let Some(event) = point.tick(&TUNING, &party) {
                events.push(event);
            }
        }
        // Some ticks moved the slider without crossing anything.
        assert_eq!(
            events,
            vec![CaptureState::ProgressAlliance, CaptureState::WinAlliance]
        );

        // Repeated calls with no crossing are silent.
        assert_eq!(point.tick(&TUNING, &party), None);
        assert_eq!(point.state, CaptureState::WinAlliance);
    }

    #[test]
    fn losing_a_won_point_is_contested_then_neutral() {
        let mut point = CapturePoint::default();
        point.slider = SLIDER_MAX;
        point.state = CaptureState::WinAlliance;

        let horde = vec![(ObjectGuid(9), Faction::Horde)];

        let event = point.tick(&TUNING, &horde);
        assert_eq!(event, Some(CaptureState::ContestedHorde));

        let mut saw_neutral = false;
        for _ in 0..1000 {
            match point.tick(&TUNING, &horde) {
                Some(CaptureState::Neutral) => {
                    saw_neutral = true;
                    break;
                }
                Some(CaptureState::ContestedHorde) => panic!("contested fired twice"),
                _ => {}
            }
        }
        assert!(saw_neutral);
    }

    #[test]
    fn stronger_pressure_captures_faster() {
        let mut slow = CapturePoint::default();
        let mut fast = CapturePoint::default();

        slow.tick(&TUNING, &alliance_party(1));
        fast.tick(&TUNING, &alliance_party(5));

        assert!(fast.slider > slow.slider);
    }

    #[test]
    fn advance_respects_the_capture_interval() {
        let mut point = CapturePoint::default();
        let party = alliance_party(4);

        // 4.9 simulated seconds: not yet.
        for _ in 0..49 {
            assert_eq!(point.advance(100, &TUNING, &party), None);
            assert_eq!(point.slider, SLIDER_MIDDLE);
        }
        // The hundredth millisecond chunk crosses the interval.
        point.advance(100, &TUNING, &party);
        assert!(point.slider > SLIDER_MIDDLE);
    }
}

//! Pure elapsed-time to stage-position mapping.
//!
//! Stage boundaries are half-open `[start, end)`: an elapsed time exactly
//! equal to a cumulative boundary belongs to the next stage. Zero-duration
//! stages produce an empty interval and are never observed as current.

/// Position within a stage plan located from elapsed wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePosition {
    pub index: usize,
    pub offset_ms: u64,
}

/// Map elapsed milliseconds since session start to `(stage index, offset)`.
///
/// Negative elapsed time clamps to the first stage at offset 0. Elapsed
/// time at or past the total of all durations clamps to the last stage at
/// offset 0; callers treat that as "session should be cleared".
pub fn locate_stage(elapsed_ms: i64, durations: &[u64]) -> StagePosition {
    if durations.is_empty() {
        return StagePosition {
            index: 0,
            offset_ms: 0,
        };
    }
    let elapsed = elapsed_ms.max(0) as u64;
    let mut start = 0u64;
    for (index, &duration) in durations.iter().enumerate() {
        let end = start.saturating_add(duration);
        if elapsed < end {
            return StagePosition {
                index,
                offset_ms: elapsed - start,
            };
        }
        start = end;
    }
    StagePosition {
        index: durations.len() - 1,
        offset_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STANDARD: [u64; 7] = [300_000, 420_000, 120_000, 420_000, 120_000, 420_000, 0];

    #[test]
    fn zero_elapsed_is_first_stage() {
        let pos = locate_stage(0, &STANDARD);
        assert_eq!(pos, StagePosition { index: 0, offset_ms: 0 });
    }

    #[test]
    fn negative_elapsed_clamps_to_first_stage() {
        let pos = locate_stage(-5_000, &STANDARD);
        assert_eq!(pos, StagePosition { index: 0, offset_ms: 0 });
    }

    #[test]
    fn mid_session_reload_lands_in_first_game() {
        // 300000 < 350000 < 720000, so 50s into the first game round.
        let pos = locate_stage(350_000, &STANDARD);
        assert_eq!(pos, StagePosition { index: 1, offset_ms: 50_000 });
    }

    #[test]
    fn boundary_belongs_to_next_stage() {
        let pos = locate_stage(300_000, &STANDARD);
        assert_eq!(pos, StagePosition { index: 1, offset_ms: 0 });
        let pos = locate_stage(720_000, &STANDARD);
        assert_eq!(pos, StagePosition { index: 2, offset_ms: 0 });
    }

    #[test]
    fn past_total_clamps_to_last_stage() {
        let pos = locate_stage(1_800_000, &STANDARD);
        assert_eq!(pos, StagePosition { index: 6, offset_ms: 0 });
        let pos = locate_stage(2_500_000, &STANDARD);
        assert_eq!(pos, StagePosition { index: 6, offset_ms: 0 });
    }

    #[test]
    fn zero_duration_stages_are_skipped() {
        let durations = [0, 100, 0, 50];
        assert_eq!(locate_stage(0, &durations), StagePosition { index: 1, offset_ms: 0 });
        assert_eq!(locate_stage(99, &durations), StagePosition { index: 1, offset_ms: 99 });
        assert_eq!(locate_stage(100, &durations), StagePosition { index: 3, offset_ms: 0 });
        assert_eq!(locate_stage(150, &durations), StagePosition { index: 3, offset_ms: 0 });
    }

    #[test]
    fn empty_durations_return_origin() {
        assert_eq!(locate_stage(1234, &[]), StagePosition { index: 0, offset_ms: 0 });
    }

    proptest! {
        // The located index is the smallest i with sum(D[0..=i]) > t,
        // clamped to the last index when no such i exists.
        #[test]
        fn locator_matches_prefix_sum_scan(
            durations in prop::collection::vec(0u64..600_000, 1..12),
            elapsed in -100_000i64..4_000_000,
        ) {
            let located = locate_stage(elapsed, &durations);
            let clamped = elapsed.max(0) as u64;
            let ends: Vec<u64> = durations
                .iter()
                .scan(0u64, |acc, &d| {
                    *acc += d;
                    Some(*acc)
                })
                .collect();
            match ends.iter().position(|&end| clamped < end) {
                Some(index) => {
                    let start = ends[index] - durations[index];
                    prop_assert_eq!(located.index, index);
                    prop_assert_eq!(located.offset_ms, clamped - start);
                }
                None => {
                    prop_assert_eq!(located.index, durations.len() - 1);
                    prop_assert_eq!(located.offset_ms, 0);
                }
            }
        }

        // A located offset always fits inside its stage, and a zero-duration
        // stage is only ever reported via the end-of-plan clamp.
        #[test]
        fn located_offset_fits_stage(
            durations in prop::collection::vec(0u64..600_000, 1..12),
            elapsed in 0i64..4_000_000,
        ) {
            let located = locate_stage(elapsed, &durations);
            let duration = durations[located.index];
            prop_assert!(located.offset_ms <= duration);
            if duration == 0 {
                prop_assert_eq!(located.offset_ms, 0);
            }
        }

        // Re-locating the boundary of any stage never lands back in it.
        #[test]
        fn boundaries_advance_past_their_stage(
            durations in prop::collection::vec(0u64..600_000, 1..12),
        ) {
            let mut end = 0u64;
            for (index, &duration) in durations.iter().enumerate() {
                end += duration;
                let located = locate_stage(end as i64, &durations);
                prop_assert_eq!(located.offset_ms, 0);
                if index + 1 < durations.len() {
                    prop_assert!(located.index > index);
                }
            }
        }
    }
}

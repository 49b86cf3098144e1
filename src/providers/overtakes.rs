//! Overtake detection from lap-by-lap classification
//!
//! A driver who gained places between two consecutive classified laps is credited with
//! passing every car that was ahead before and is behind after. Passes where either car
//! was in the pit lane around those laps are pit-cycle gains rather than on-track moves.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::archive::{ThrottleSample, TimedLap};
use super::track::compound_rank;
use crate::types::EventType;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedOvertake {
    pub lap_number: u32,
    pub overtaking_driver: String,
    pub overtaken_driver: String,
    pub event_type: EventType,
    /// Defender tyre age minus attacker tyre age, in laps
    pub tire_delta: Option<f64>,
    /// Attacker compound rank minus defender compound rank
    pub tire_compound_diff: Option<i32>,
    /// Attacker throttle minus defender throttle at the attacker's mid-lap
    pub ers_delta: Option<f64>,
}

type LapKey<'a> = (&'a str, u32);

pub fn detect_overtakes(
    laps: &[TimedLap],
    throttle: &HashMap<String, Vec<ThrottleSample>>,
) -> Vec<DetectedOvertake> {
    let mut latest: BTreeMap<LapKey<'_>, &TimedLap> = BTreeMap::new();
    let mut pitted: HashSet<LapKey<'_>> = HashSet::new();
    for lap in laps {
        if lap.pit_in_time.is_some() || lap.pit_out_time.is_some() {
            pitted.insert((lap.driver.as_str(), lap.lap_number));
            pitted.insert((lap.driver.as_str(), lap.lap_number.saturating_sub(1)));
        }
        if lap.position.is_none() {
            continue;
        }
        let key = (lap.driver.as_str(), lap.lap_number);
        let newer_recorded = latest.get(&key).is_some_and(|existing| existing.time > lap.time);
        if !newer_recorded {
            latest.insert(key, lap);
        }
    }

    let mut classification: BTreeMap<u32, BTreeMap<&str, u32>> = BTreeMap::new();
    for ((driver, lap_number), lap) in &latest {
        if let Some(position) = lap.position {
            classification.entry(*lap_number).or_default().insert(*driver, position);
        }
    }

    let traces: HashMap<&str, Vec<&ThrottleSample>> = throttle
        .iter()
        .map(|(driver, samples)| {
            let mut sorted: Vec<&ThrottleSample> = samples.iter().collect();
            sorted.sort_by(|a, b| a.session_time.total_cmp(&b.session_time));
            (driver.as_str(), sorted)
        })
        .collect();

    let was_pitting = |driver: &str, prev: u32, lap: u32| {
        pitted.contains(&(driver, prev)) || pitted.contains(&(driver, lap))
    };

    let mut detected = Vec::new();
    let lap_numbers: Vec<u32> = classification.keys().copied().collect();
    for window in lap_numbers.windows(2) {
        let (prev_lap, lap_number) = (window[0], window[1]);
        let (Some(before), Some(after)) = (classification.get(&prev_lap), classification.get(&lap_number))
        else {
            continue;
        };

        let mut prev_order: Vec<(&str, u32)> = before.iter().map(|(d, p)| (*d, *p)).collect();
        prev_order.sort_by_key(|(_, position)| *position);

        for (driver, prev_position) in before {
            let Some(curr_position) = after.get(driver) else { continue };
            if curr_position >= prev_position {
                continue;
            }
            for (target, _) in prev_order.iter().filter(|(_, position)| position < prev_position) {
                let Some(target_position) = after.get(target) else { continue };
                if target_position <= curr_position {
                    continue;
                }

                let event_type = if was_pitting(*driver, prev_lap, lap_number)
                    || was_pitting(*target, prev_lap, lap_number)
                {
                    EventType::PitCycle
                } else {
                    EventType::OnTrack
                };
                let attacker_lap = latest.get(&(*driver, lap_number));
                let defender_lap = latest.get(&(*target, lap_number));

                let tire_delta = match (attacker_lap, defender_lap) {
                    (Some(a), Some(d)) => d.tyre_life.zip(a.tyre_life).map(|(d, a)| d - a),
                    _ => None,
                };
                let tire_compound_diff = match (attacker_lap, defender_lap) {
                    (Some(a), Some(d)) => a
                        .compound
                        .as_deref()
                        .zip(d.compound.as_deref())
                        .map(|(a, d)| compound_rank(a) - compound_rank(d)),
                    _ => None,
                };
                let ers_delta = attacker_lap.and_then(|lap| mid_lap_time(lap)).and_then(|at| {
                    let attacker = throttle_at(traces.get(driver)?, at)?;
                    let defender = throttle_at(traces.get(target)?, at)?;
                    Some(attacker - defender)
                });

                detected.push(DetectedOvertake {
                    lap_number,
                    overtaking_driver: driver.to_string(),
                    overtaken_driver: target.to_string(),
                    event_type,
                    tire_delta,
                    tire_compound_diff,
                    ers_delta,
                });
            }
        }
    }
    detected
}

/// Session time halfway through a lap, or the lap's end time when its start is unknown.
fn mid_lap_time(lap: &TimedLap) -> Option<f64> {
    match (lap.lap_start_time, lap.lap_time) {
        (Some(start), Some(duration)) => Some(start + 0.5 * duration),
        _ => lap.time,
    }
}

/// Throttle of the sample nearest `at`; ties go to the earlier sample.
fn throttle_at(samples: &[&ThrottleSample], at: f64) -> Option<f64> {
    let first = samples.first()?;
    let idx = samples.partition_point(|sample| sample.session_time < at);
    if idx == 0 {
        return Some(first.throttle);
    }
    let Some(after) = samples.get(idx) else {
        return samples.last().map(|sample| sample.throttle);
    };
    let before = samples[idx - 1];
    if at - before.session_time <= after.session_time - at {
        Some(before.throttle)
    } else {
        Some(after.throttle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(driver: &str, lap_number: u32, position: u32) -> TimedLap {
        TimedLap {
            driver: driver.to_string(),
            driver_number: None,
            lap_number,
            lap_time: Some(90.0),
            position: Some(position),
            lap_start_time: Some(90.0 * (lap_number - 1) as f64),
            time: Some(90.0 * lap_number as f64),
            pit_in_time: None,
            pit_out_time: None,
            tyre_life: None,
            compound: None,
            stint: None,
        }
    }

    #[test]
    fn position_gain_credits_each_passed_car() {
        let laps = vec![
            lap("AAA", 1, 1),
            lap("BBB", 1, 2),
            lap("CCC", 1, 3),
            lap("AAA", 2, 2),
            lap("BBB", 2, 3),
            lap("CCC", 2, 1),
        ];
        let detected = detect_overtakes(&laps, &HashMap::new());
        let pairs: Vec<(&str, &str)> = detected
            .iter()
            .map(|event| (event.overtaking_driver.as_str(), event.overtaken_driver.as_str()))
            .collect();
        assert_eq!(pairs, vec![("CCC", "AAA"), ("CCC", "BBB")]);
        assert!(detected.iter().all(|event| event.event_type == EventType::OnTrack));
        assert!(detected.iter().all(|event| event.lap_number == 2));
    }

    #[test]
    fn pit_lane_involvement_marks_pit_cycle() {
        let mut leader_pits = lap("AAA", 2, 2);
        leader_pits.pit_in_time = Some(170.0);
        let laps = vec![lap("AAA", 1, 1), lap("BBB", 1, 2), leader_pits, lap("BBB", 2, 1)];
        let detected = detect_overtakes(&laps, &HashMap::new());
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].event_type, EventType::PitCycle);
    }

    #[test]
    fn context_deltas_from_tyres_and_throttle() {
        let mut attacker = lap("BBB", 2, 1);
        attacker.tyre_life = Some(3.0);
        attacker.compound = Some("SOFT".to_string());
        let mut defender = lap("AAA", 2, 2);
        defender.tyre_life = Some(20.0);
        defender.compound = Some("HARD".to_string());
        let laps = vec![lap("AAA", 1, 1), lap("BBB", 1, 2), defender, attacker];

        let mut throttle = HashMap::new();
        throttle.insert(
            "BBB".to_string(),
            vec![
                ThrottleSample { session_time: 140.0, throttle: 100.0 },
                ThrottleSample { session_time: 130.0, throttle: 60.0 },
            ],
        );
        throttle.insert("AAA".to_string(), vec![ThrottleSample { session_time: 136.0, throttle: 80.0 }]);

        let detected = detect_overtakes(&laps, &throttle);
        assert_eq!(detected.len(), 1);
        let event = &detected[0];
        assert_eq!(event.tire_delta, Some(17.0));
        assert_eq!(event.tire_compound_diff, Some(2));
        // Mid-lap is 135.0: nearest attacker sample is 130.0 (60), defender has one sample (80)
        assert_eq!(event.ers_delta, Some(-20.0));
    }

    #[test]
    fn unclassified_laps_are_ignored() {
        let mut no_position = lap("BBB", 2, 1);
        no_position.position = None;
        let laps = vec![lap("AAA", 1, 1), lap("BBB", 1, 2), lap("AAA", 2, 1), no_position];
        assert!(detect_overtakes(&laps, &HashMap::new()).is_empty());
    }

    #[test]
    fn nearest_sample_prefers_earlier_on_ties() {
        let a = ThrottleSample { session_time: 10.0, throttle: 1.0 };
        let b = ThrottleSample { session_time: 20.0, throttle: 2.0 };
        let samples = vec![&a, &b];
        assert_eq!(throttle_at(&samples, 15.0), Some(1.0));
        assert_eq!(throttle_at(&samples, 16.0), Some(2.0));
        assert_eq!(throttle_at(&samples, 5.0), Some(1.0));
        assert_eq!(throttle_at(&samples, 25.0), Some(2.0));
        assert_eq!(throttle_at(&[], 25.0), None);
    }
}

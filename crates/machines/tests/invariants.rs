use chrono::{TimeZone, Utc};
use sf_core::phase::CyclePhase;
use sf_core::{Axis, ExecutionMode};
use sf_machines::alarms::HISTORY_CAPACITY;
use sf_machines::{FactoryOptions, Fleet, MachineFactory};

fn seeded_fleet(seed: u64) -> Fleet {
    let options = FactoryOptions {
        seed: Some(seed),
        started_at: Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(),
    };
    MachineFactory::new(options).create_default_fleet()
}

#[test]
fn physical_quantities_stay_bounded() {
    for seed in [1, 7, 99] {
        let mut fleet = seeded_fleet(seed);
        let ids: Vec<String> = fleet.ids().cloned().collect();
        let mut previous: Vec<Option<(CyclePhase, u16, f64)>> = vec![None; ids.len()];

        for _ in 0..2000 {
            fleet.advance_all(1.0);
            for (index, id) in ids.iter().enumerate() {
                let machine = fleet.get(id).unwrap();
                let state = machine.state();

                assert!((0.0..=100.0).contains(&state.spindle.load), "{id}: load {}", state.spindle.load);
                for axis in Axis::ALL {
                    let travel = machine.spec().axis_limits().get(axis);
                    let position = *state.motion.positions.get(axis);
                    assert!(travel.contains(position), "{id}: {axis:?} at {position}");
                }
                assert!(state.alarms.history_len() <= HISTORY_CAPACITY);

                if let Some(tooled) = machine.process().tooled() {
                    assert!((0.0..=1.0).contains(&tooled.tool_wear));
                    let now = (machine.phase(), tooled.current_tool, tooled.tool_wear);
                    if let Some((CyclePhase::Cutting, tool, wear)) = previous[index] {
                        if now.0 == CyclePhase::Cutting && now.1 == tool {
                            assert!(now.2 >= wear, "{id}: wear went backwards");
                        }
                    }
                    previous[index] = Some(now);
                }
            }
        }
    }
}

#[test]
fn only_the_latched_alarm_is_uncleared() {
    let mut fleet = seeded_fleet(3);
    for _ in 0..3000 {
        fleet.advance_all(1.0);
        for machine in fleet.iter() {
            let alarms = &machine.state().alarms;
            let history: Vec<_> = alarms.history().collect();
            if let Some((latest, older)) = history.split_last() {
                assert!(older.iter().all(|r| r.cleared));
                assert_eq!(latest.cleared, !alarms.is_active());
            }
            assert_eq!(alarms.is_active(), machine.execution() == ExecutionMode::Alarm);
        }
    }
}

#[test]
fn power_off_freezes_machine() {
    let mut fleet = seeded_fleet(11);
    for _ in 0..120 {
        fleet.advance_all(1.0);
    }
    let ids: Vec<String> = fleet.ids().cloned().collect();
    for id in &ids {
        fleet.set_power(id, false).unwrap();
    }
    for _ in 0..50 {
        fleet.advance_all(1.0);
        for snapshot in fleet.export_all().values() {
            assert!(!snapshot.power);
            assert_eq!(snapshot.execution, ExecutionMode::Stopped);
            assert_eq!(snapshot.cycle_phase, CyclePhase::Idle);
            assert_eq!(snapshot.spindle_speed, 0);
            assert_eq!(snapshot.spindle_load, 0.0);
            assert_eq!(snapshot.feed_rate, 0);
        }
    }
}

#[test]
fn seeded_runs_are_deterministic() {
    let mut a = seeded_fleet(5);
    let mut b = seeded_fleet(5);
    for _ in 0..500 {
        assert_eq!(a.advance_all(0.5), b.advance_all(0.5));
    }
    assert_eq!(a.export_all(), b.export_all());
}

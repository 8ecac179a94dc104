use chrono::Utc;
use sf_core::phase::CyclePhase;
use sf_core::spec::{AxisTravel, Capabilities, MachineSpec};
use sf_core::telemetry::ArchetypeTelemetry;
use sf_core::{Archetype, ExecutionMode};
use sf_machines::Machine;
use sf_randomness::FixedSource;

/// Every draw is 0: each per-tick chance fires and every uniform returns its low bound.
fn zero_draw_machine(archetype: Archetype, capabilities: Capabilities) -> Machine {
    let spec = MachineSpec::new("m", "Machine", "M", archetype, capabilities);
    Machine::new(spec, Box::new(FixedSource::constant(0.0)), Utc::now())
}

#[test]
fn milling_reaches_cutting_after_ramp_plus_rapid() {
    let mut mill = zero_draw_machine(Archetype::Milling, Capabilities::default());
    mill.advance(1.0);
    assert_eq!(mill.phase(), CyclePhase::SpindleRamp);
    let target = mill.state().spindle.target_speed;
    assert_eq!(target, 3000.0);

    let ramp_ticks = (target / 350.0).ceil() as usize;
    for _ in 0..ramp_ticks - 1 {
        mill.advance(1.0);
        assert_eq!(mill.phase(), CyclePhase::SpindleRamp);
    }
    mill.advance(1.0);
    assert_eq!(mill.phase(), CyclePhase::Rapid);
    assert!((mill.state().spindle.speed - target).abs() < 1e-9);

    for _ in 0..2 {
        mill.advance(1.0);
        assert_eq!(mill.phase(), CyclePhase::Rapid);
        assert_eq!(mill.export().rapid_rate, 1000);
    }
    mill.advance(1.0);
    assert_eq!(mill.phase(), CyclePhase::Cutting);
    assert_eq!(mill.export().rapid_rate, 0);
    assert_eq!(mill.execution(), ExecutionMode::Running);
}

#[test]
fn press_brake_stroke_takes_five_seconds() {
    let mut press = zero_draw_machine(Archetype::PressBrake, Capabilities::default());
    press.advance(1.0);
    assert_eq!(press.phase(), CyclePhase::Running);
    for _ in 0..4 {
        press.advance(1.0);
    }

    let snapshot = press.export();
    let ArchetypeTelemetry::PressBrake(payload) = &snapshot.payload else {
        panic!("press brake payload expected");
    };
    assert_eq!(payload.ram_position, 100);
    assert_eq!(payload.tonnage, 160);
    assert_eq!(payload.back_gauge, 50.0);
    assert_eq!(snapshot.part_count, 0);

    press.advance(1.0);
    let snapshot = press.export();
    assert_eq!(snapshot.part_count, 1);
    assert_eq!(snapshot.total_cycles, 1);
    assert_eq!(snapshot.cycle_phase, CyclePhase::Idle);
    assert_eq!(snapshot.execution, ExecutionMode::Idle);
}

#[test]
fn laser_cut_takes_eight_seconds_and_resets() {
    let mut caps = Capabilities::default();
    caps.axis_limits.z = AxisTravel(0.0, 200.0);
    let mut laser = zero_draw_machine(Archetype::Laser, caps);
    laser.advance(1.0);
    assert_eq!(laser.phase(), CyclePhase::Running);
    for _ in 0..7 {
        laser.advance(1.0);
    }
    assert_eq!(laser.export().part_count, 0);
    assert!(laser.export().feed_rate > 0);

    laser.advance(1.0);
    let snapshot = laser.export();
    assert_eq!(snapshot.part_count, 1);
    assert_eq!(snapshot.total_cycles, 1);
    assert_eq!(snapshot.feed_rate, 0);
    let ArchetypeTelemetry::Laser(payload) = &snapshot.payload else {
        panic!("laser payload expected");
    };
    assert_eq!(payload.cut_speed, 0);
    assert_eq!(payload.laser_power, 0);
    assert_eq!(payload.gas_pressure, 240);
}

#[test]
fn full_milling_cycle_produces_one_part() {
    let mut mill = zero_draw_machine(Archetype::Milling, Capabilities::default());
    let mut ticks = 0;
    while mill.state().production.part_count == 0 {
        mill.advance(1.0);
        ticks += 1;
        assert!(ticks < 1000, "cycle never finished");
    }
    assert_eq!(mill.phase(), CyclePhase::Idle);
    assert_eq!(mill.export().program_running.as_deref(), Some("O1000"));
    let tooled = mill.process().tooled().unwrap();
    assert!(tooled.tool_wear > 0.0);
    assert!(!tooled.tools[0].in_use);
    assert!(tooled.tools[0].total_cuts > 0);
}

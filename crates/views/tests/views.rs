use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::Utc;
use differential_dataflow::input::InputSession;
use sf_core::{ExecutionMode, MachineId};
use sf_machines::{FactoryOptions, MachineFactory};
use sf_views::{alarm_alerts, execution_counts, top_k_by_load, MachineRow, RowTracker, TopKConfig};
use timely::dataflow::operators::probe::Handle as ProbeHandle;

type Log<D> = Rc<RefCell<BTreeMap<D, isize>>>;

fn row(id: &str, execution: ExecutionMode, load_tenths: i64, alarm: Option<&str>) -> MachineRow {
    MachineRow {
        machine_id: id.to_string(),
        execution,
        load_tenths,
        alarm: alarm.map(str::to_string),
    }
}

fn live<D: Ord + Clone>(log: &Log<D>) -> Vec<D> {
    log.borrow()
        .iter()
        .filter(|(_, count)| **count != 0)
        .map(|(data, _)| data.clone())
        .collect()
}

type Views = (Vec<(ExecutionMode, i64)>, Vec<(i64, MachineId)>, Vec<(MachineId, String)>);

#[test]
fn views_follow_row_changes() {
    let (first, second): (Views, Views) = timely::execute_directly(|worker| {
        let mut input: InputSession<u64, MachineRow, isize> = InputSession::new();
        let mut probe = ProbeHandle::new();
        let counts: Log<(ExecutionMode, i64)> = Rc::new(RefCell::new(BTreeMap::new()));
        let top: Log<(i64, MachineId)> = Rc::new(RefCell::new(BTreeMap::new()));
        let alarms: Log<(MachineId, String)> = Rc::new(RefCell::new(BTreeMap::new()));

        worker.dataflow::<u64, _, _>(|scope| {
            let rows = input.to_collection(scope);

            let log = counts.clone();
            execution_counts(&rows)
                .inspect(move |(data, _time, diff)| *log.borrow_mut().entry(data.clone()).or_insert(0) += *diff)
                .probe_with(&mut probe);

            let log = top.clone();
            top_k_by_load(&TopKConfig { k: 2 }, &rows)
                .inspect(move |(data, _time, diff)| *log.borrow_mut().entry(data.clone()).or_insert(0) += *diff)
                .probe_with(&mut probe);

            let log = alarms.clone();
            alarm_alerts(&rows)
                .inspect(move |(data, _time, diff)| *log.borrow_mut().entry(data.clone()).or_insert(0) += *diff)
                .probe_with(&mut probe);
        });

        input.insert(row("mill", ExecutionMode::Running, 423, None));
        input.insert(row("lathe", ExecutionMode::Idle, 0, None));
        input.insert(row("press", ExecutionMode::Running, 800, None));
        input.advance_to(1);
        input.flush();
        while probe.less_than(input.time()) {
            worker.step();
        }
        let first = (live(&counts), live(&top), live(&alarms));

        input.remove(row("press", ExecutionMode::Running, 800, None));
        input.insert(row("press", ExecutionMode::Alarm, 0, Some("OVER_TONNAGE")));
        input.remove(row("lathe", ExecutionMode::Idle, 0, None));
        input.insert(row("lathe", ExecutionMode::Running, 512, None));
        input.advance_to(2);
        input.flush();
        while probe.less_than(input.time()) {
            worker.step();
        }
        let second = (live(&counts), live(&top), live(&alarms));
        (first, second)
    });

    assert_eq!(first.0, vec![(ExecutionMode::Idle, 1), (ExecutionMode::Running, 2)]);
    assert_eq!(first.1, vec![(423, "mill".to_string()), (800, "press".to_string())]);
    assert!(first.2.is_empty());

    assert_eq!(second.0, vec![(ExecutionMode::Running, 2), (ExecutionMode::Alarm, 1)]);
    assert_eq!(second.1, vec![(423, "mill".to_string()), (512, "lathe".to_string())]);
    assert_eq!(second.2, vec![("press".to_string(), "OVER_TONNAGE".to_string())]);
}

#[test]
fn tracker_emits_only_changed_rows() {
    let mut fleet = MachineFactory::new(FactoryOptions {
        seed: Some(9),
        started_at: Utc::now(),
    })
    .create_default_fleet();
    let mut tracker = RowTracker::default();

    let initial = tracker.diff(fleet.export_all().values());
    assert_eq!(initial.len(), 6);
    assert!(initial.iter().all(|(_, diff)| *diff == 1));
    assert_eq!(tracker.len(), 6);

    assert!(tracker.diff(fleet.export_all().values()).is_empty());

    fleet.inject_alarm("haas_vf2", Some(9100), "LOW BATTERY").unwrap();
    let changes = tracker.diff(fleet.export_all().values());
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].1, -1);
    assert_eq!(changes[1].0.alarm.as_deref(), Some("LOW BATTERY"));
    assert_eq!(changes[1].0.execution, ExecutionMode::Alarm);
}

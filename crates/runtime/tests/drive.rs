use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use coroutine_task::sequence::{from_iter, try_from_iter};
use coroutine_task::{routine, CancelSignal, StartTaskExt, Step, TaskError, Yielder};
use runtime::{TickConfig, TickScheduler, Wait};

const DT: Duration = Duration::from_millis(100);

type Log = Rc<RefCell<Vec<&'static str>>>;

fn host() -> TickScheduler<Wait> {
    TickScheduler::new(&TickConfig::default())
}

/// Routine that records `name` into the log every time it runs a step.
fn logged(log: &Log, names: &'static [&'static str]) -> coroutine_task::Routine<Wait, &'static str> {
    let log = log.clone();
    routine(move |y| {
        for &name in names {
            log.borrow_mut().push(name);
            y.value(name);
        }
        Ok(())
    })
}

#[test]
fn last_value_is_result() {
    let mut host = host();
    let mut handle = host.start_task(from_iter([Step::Value("a"), Step::Value("b")]));
    assert!(!handle.is_resolved());

    host.run_until_idle(DT, 10);
    assert_eq!(handle.try_outcome().unwrap().unwrap(), "b");
}

#[test]
fn nested_exhaustion_does_not_resolve() {
    let log = Log::default();
    let mut host = host();
    let outer = routine({
        let log = log.clone();
        move |y: &Yielder<'_, Wait, &'static str>| {
            y.nested(logged(&log, &["x"]));
            log.borrow_mut().push("y");
            y.value("y");
            Ok(())
        }
    });
    let mut handle = host.start_task(outer);

    host.tick(DT);
    assert_eq!(*log.borrow(), ["x"]);
    assert!(!handle.is_resolved());
    // inner exhausts and outer resumes in the same tick
    host.tick(DT);
    assert_eq!(*log.borrow(), ["x", "y"]);
    assert!(!handle.is_resolved());
    host.tick(DT);
    assert_eq!(handle.try_outcome().unwrap().unwrap(), "y");
    assert!(host.is_idle());
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("fault F")]
struct FaultF;

#[test]
fn deep_fault_halts_every_level() {
    let log = Log::default();
    let mut host = host();

    let depth2 = {
        let log = log.clone();
        routine(move |y: &Yielder<'_, Wait, &'static str>| {
            log.borrow_mut().push("d2 step 1");
            y.value("d2");
            Err(FaultF.into())
        })
    };
    let depth1 = {
        let log = log.clone();
        routine(move |y: &Yielder<'_, Wait, &'static str>| {
            y.nested(depth2);
            log.borrow_mut().push("d1 after");
            y.value("d1");
            Ok(())
        })
    };
    let root = {
        let log = log.clone();
        routine(move |y: &Yielder<'_, Wait, &'static str>| {
            y.nested(depth1);
            log.borrow_mut().push("d0 after");
            y.value("d0");
            Ok(())
        })
    };

    let mut handle = host.start_task(root);
    host.run_until_idle(DT, 10);

    assert_eq!(*log.borrow(), ["d2 step 1"]);
    let err = handle.try_outcome().unwrap().unwrap_err();
    assert_eq!(err.fault().unwrap().downcast_ref::<FaultF>(), Some(&FaultF));
    assert!(host.is_idle());
}

#[test]
fn fault_from_fallible_iterator() {
    let mut host = host();
    let steps: Vec<Result<Step<Wait, u32>, FaultF>> = vec![Ok(Step::Value(1)), Err(FaultF)];
    let mut handle = host.start_task(try_from_iter(steps));
    host.run_until_idle(DT, 10);
    assert!(handle.try_outcome().unwrap().unwrap_err().fault().is_some());
}

#[test]
fn cancelled_before_first_pump() {
    let log = Log::default();
    let mut host = host();
    let cancel = CancelSignal::new();
    cancel.cancel_with("not needed");

    let mut handle = host.start_task_with_cancel(logged(&log, &["a", "b"]), cancel);
    host.tick(DT);

    // The first advance runs, but nothing is yielded to the host.
    assert_eq!(*log.borrow(), ["a"]);
    assert!(host.is_idle());
    match handle.try_outcome() {
        Some(Err(TaskError::Cancelled(reason))) => assert_eq!(reason.as_str(), "not needed"),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn cancel_allows_at_most_one_more_step() {
    let log = Log::default();
    let mut host = host();
    let cancel = CancelSignal::new();

    let inner = logged(&log, &["i1", "i2", "i3"]);
    let root = {
        let log = log.clone();
        routine(move |y: &Yielder<'_, Wait, &'static str>| {
            y.nested(inner);
            log.borrow_mut().push("root");
            y.value("root");
            Ok(())
        })
    };
    let mut handle = host.start_task_with_cancel(root, cancel.clone());

    host.tick(DT);
    assert_eq!(*log.borrow(), ["i1"]);
    cancel.cancel();
    host.tick(DT);
    host.tick(DT);

    assert_eq!(*log.borrow(), ["i1", "i2"]);
    assert!(handle.try_outcome().unwrap().unwrap_err().is_cancelled());
    assert!(host.is_idle());
}

#[test]
fn cancel_after_completion_is_ignored() {
    let mut host = host();
    let cancel = CancelSignal::new();
    let mut handle = host.start_task_with_cancel(from_iter([Step::<Wait, _>::Value(9)]), cancel.clone());
    host.run_until_idle(DT, 10);
    cancel.cancel();
    assert_eq!(handle.try_outcome().unwrap().unwrap(), 9);
}

#[test]
fn cancel_before_exhaustion_wins() {
    let mut host = host();
    let cancel = CancelSignal::new();
    let mut handle = host.start_task_with_cancel(from_iter([Step::<Wait, _>::Value("a")]), cancel.clone());
    host.tick(DT);
    assert!(!handle.is_resolved());

    cancel.cancel();
    host.run_until_idle(DT, 10);
    assert!(handle.try_outcome().unwrap().unwrap_err().is_cancelled());
}

#[test]
fn directives_park_the_whole_tree() {
    let mut host = host();
    let inner = routine(|y: &Yielder<'_, Wait, u32>| {
        y.wait(Wait::For(Duration::from_millis(300)));
        Ok(())
    });
    let root = routine(move |y: &Yielder<'_, Wait, u32>| {
        y.nested(inner);
        y.value(51);
        Ok(())
    });
    let mut handle = host.start_task(root);

    let ticks = host.run_until_idle(DT, 100);
    // park at tick 1, ready at tick 4, exhaust at tick 5
    assert_eq!(ticks, 5);
    assert_eq!(handle.try_outcome().unwrap().unwrap(), 51);
}

#[test]
fn independent_trees_do_not_interfere() {
    let mut host = host();
    let mut failing = host.start_task(routine(|_: &Yielder<'_, Wait, u8>| Err(anyhow::anyhow!("first"))));
    let mut fine = host.start_task(from_iter([Step::Value(2u8)]));
    host.run_until_idle(DT, 10);
    assert!(failing.try_outcome().unwrap().is_err());
    assert_eq!(fine.try_outcome().unwrap().unwrap(), 2);
}

#[test]
fn full_scheduler_faults_immediately() {
    let mut host = TickScheduler::<Wait>::new(&TickConfig { max_routines: Some(0), ..Default::default() });
    let mut handle = host.start_task(from_iter([Step::Value(1)]));
    let err = handle.try_outcome().unwrap().unwrap_err();
    assert!(err.fault().unwrap().downcast_ref::<runtime::ScheduleError>().is_some());
}

#[test]
fn cleared_host_abandons() {
    let mut host = host();
    let mut handle = host.start_task(from_iter([Step::<Wait, _>::Value(1), Step::Value(2)]));
    host.tick(DT);
    host.clear();
    assert!(matches!(handle.try_outcome(), Some(Err(TaskError::Abandoned))));
}

#[macro_use]
extern crate tracing;

mod args;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use coroutine_task::{routine, CancelSignal, Outcome, Routine, StartTaskExt, TaskHandle};
use runtime::utils::{enclose, format_error_disp};
use runtime::{RunExit, RunHandle, TickConfig, TickScheduler, Wait};
use tokio_util::sync::CancellationToken;

type Sample = Routine<Wait, i32>;

const SECOND: Wait = Wait::For(Duration::from_secs(1));

/// Stand-in for a network request: takes a few frames, then reports a status.
fn send_request(url: &'static str, status: Rc<Cell<Option<u16>>>) -> Sample {
    routine(move |y| {
        debug!("requesting {url}");
        y.wait(Wait::Frames(3));
        status.set(Some(200));
        Ok(())
    })
}

fn func4() -> Sample {
    routine(|y| {
        y.wait(SECOND);
        let status = Rc::new(Cell::new(None));
        y.nested(send_request("google.com", status.clone()));
        let code = status.get()
            .ok_or_else(|| anyhow::anyhow!("request finished without a status"))?;
        info!("HTTP request result: {code}");
        Ok(())
    })
}

fn func3() -> Sample {
    routine(|y| {
        y.wait(SECOND);
        info!("3");
        y.nested(func4());
        info!("4");
        y.wait(SECOND);
        Ok(())
    })
}

fn func2() -> Sample {
    routine(|y| {
        y.wait(SECOND);
        info!("2");
        y.nested(func3());
        info!("5");
        y.wait(SECOND);
        Ok(())
    })
}

fn func1(early_break: bool) -> Sample {
    routine(move |y| {
        info!("1");
        y.nested(func2());
        if early_break {
            y.value(32);
            return Ok(());
        }
        info!("6");
        y.wait(SECOND);
        y.value(51);
        Ok(())
    })
}

/// Runs `host` until it stops while awaiting `task` next to it.
///
/// The outcome is `None` only if the loop stopped before the task resolved.
async fn drive<T>(
    host: &mut TickScheduler<Wait>,
    config: &TickConfig,
    task: TaskHandle<T>,
    cancel: CancelSignal,
    cancel_after: Option<Duration>,
) -> (Result<RunExit, std::io::Error>, Option<Outcome<T>>) {
    let shutdown = CancellationToken::new();

    let canceller = enclose!([clone shutdown] async move {
        if let Some(after) = cancel_after {
            runtime::cancellable(&shutdown, async {
                tokio::time::sleep(after).await;
                cancel.cancel_with(format!("gave up after {}ms", after.as_millis()));
            }).await;
        }
    });
    let run_loop = async {
        let exit = runtime::run(RunHandle::new(), host, config, shutdown.clone()).await;
        shutdown.cancel();
        exit
    };
    let awaiter = async {
        // The final tick resolves the task and stops the loop in the same poll.
        let outcome = tokio::select! {
            biased;
            outcome = task => Some(outcome),
            _ = shutdown.cancelled() => None,
        };
        shutdown.cancel();
        outcome
    };

    let (exit, outcome, ()) = tokio::join!(run_loop, awaiter, canceller);
    (exit, outcome)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    runtime::log::setup_logger("sample")?;
    let Some(opts) = args::parse_options(std::env::args())? else {
        return Ok(());
    };

    let config = TickConfig {
        tick_interval: opts.tick,
        ..Default::default()
    };
    let mut host = TickScheduler::new(&config);
    let cancel = CancelSignal::new();

    info!("--- Before the task await");
    let task = host.start_task_with_cancel(func1(opts.early_break), cancel.clone());

    let (exit, outcome) = runtime::instrument!("sample";
        drive(&mut host, &config, task, cancel, opts.cancel_after)
    ).await;

    match outcome {
        Some(Ok(result)) => info!("--- After the task await, result is {result}"),
        Some(Err(e)) => error!("--- Task failed: {}", format_error_disp(&e)),
        None => warn!("--- Run loop stopped before the task finished"),
    }
    host.clear();

    info!("run loop exited: {:?}", exit?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coroutine_task::Yielder;

    fn fast() -> TickConfig {
        TickConfig {
            tick_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn quick(frames: u64) -> Sample {
        routine(move |y| {
            y.wait(Wait::Frames(frames));
            y.value(51);
            Ok(())
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn finished_result_is_never_lost() {
        let config = fast();
        for _ in 0..40 {
            let mut host = TickScheduler::new(&config);
            let cancel = CancelSignal::new();
            let task = host.start_task_with_cancel(quick(2), cancel.clone());

            let (exit, outcome) = drive(&mut host, &config, task, cancel, None).await;
            assert_eq!(exit.unwrap(), RunExit::Idle);
            assert_eq!(outcome.unwrap().unwrap(), 51);
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn timed_cancel_reaches_the_task() {
        let config = fast();
        let mut host = TickScheduler::new(&config);
        let cancel = CancelSignal::new();
        let endless = routine(|y: &Yielder<'_, Wait, i32>| loop {
            y.wait(Wait::NextFrame);
        });
        let task = host.start_task_with_cancel(endless, cancel.clone());

        let (exit, outcome) = drive(&mut host, &config, task, cancel, Some(Duration::from_millis(5))).await;
        assert_eq!(exit.unwrap(), RunExit::Idle);
        let err = outcome.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "coroutine was cancelled: gave up after 5ms");
    }
}

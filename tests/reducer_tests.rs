//! Behavioural tests for the background result reducer

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use utilp::reducer::{
    QueueItem, ReducerError, ReducerState, ResultQueue, ResultReducer, WaitStrategy,
};

fn sum(acc: Option<i64>, x: i64) -> anyhow::Result<i64> {
    Ok(acc.map_or(x, |a| a + x))
}

fn fast_polling() -> WaitStrategy {
    WaitStrategy::Polling {
        max_backoff: Duration::from_millis(5),
    }
}

fn strategies() -> [WaitStrategy; 2] {
    [WaitStrategy::Blocking, fast_polling()]
}

/// Queue receives [3, 4, 5, Done]; the published value is 12
#[test]
fn test_publishes_sum_on_sentinel() {
    let queue = ResultQueue::new();
    let handle = ResultReducer::new("sum", &queue, sum).start().unwrap();

    for x in [3, 4, 5] {
        queue.push_partial(x).unwrap();
    }
    queue.finish().unwrap();

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.state, ReducerState::Completed);
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.result, Some(12));
    assert_eq!(queue.take_final(), Some(Some(12)));
}

#[test]
fn test_polling_strategy_gives_same_result() {
    let queue = ResultQueue::new();
    let handle = ResultReducer::new("poll", &queue, sum)
        .wait_strategy(fast_polling())
        .start()
        .unwrap();

    for x in [3, 4, 5] {
        queue.push_partial(x).unwrap();
    }
    queue.finish().unwrap();

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.result, Some(12));
    assert_eq!(outcome.processed, 3);
    assert_eq!(queue.take_final(), Some(Some(12)));
}

#[test]
fn test_final_value_popped_after_worker_exits() {
    let queue = ResultQueue::new();
    let handle = ResultReducer::new("consumer", &queue, sum).start().unwrap();

    for x in 1..=10 {
        queue.push_partial(x).unwrap();
    }
    queue.finish().unwrap();

    assert!(handle.wait_timeout(Duration::from_secs(5)));
    let item = queue.pop_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(item, QueueItem::Final(Some(55)));
    handle.join().unwrap();
}

/// A consumer already waiting before the worker starts receives the final
/// value and never takes partial results away from the worker
#[test]
fn test_blocked_consumer_receives_final_value() {
    for wait in strategies() {
        let queue: ResultQueue<i64, i64> = ResultQueue::new();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.wait_final(Duration::from_secs(5)))
        };
        // Give the consumer time to start waiting.
        thread::sleep(Duration::from_millis(20));

        let handle = ResultReducer::new("waited", &queue, sum)
            .wait_strategy(wait)
            .start()
            .unwrap();
        for x in [3, 4, 5] {
            queue.push_partial(x).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        queue.finish().unwrap();

        assert_eq!(consumer.join().unwrap(), Ok(Some(12)));
        let outcome = handle.join().unwrap();
        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.result, Some(12));
        assert!(queue.is_empty());
    }
}

#[test]
fn test_state_is_completed_once_final_is_visible() {
    for wait in strategies() {
        let queue = ResultQueue::new();
        let handle = ResultReducer::new("settled", &queue, sum)
            .wait_strategy(wait)
            .start()
            .unwrap();
        queue.push_partial(1).unwrap();
        queue.finish().unwrap();

        assert_eq!(queue.wait_final(Duration::from_secs(5)), Ok(Some(1)));
        assert_eq!(handle.state(), ReducerState::Completed);
        handle.join().unwrap();
    }
}

#[test]
fn test_fold_matches_sequential_reduce_in_push_order() {
    // Non-commutative reducer: single producer keeps FIFO order.
    let concat =
        |acc: Option<String>, s: &'static str| Ok::<_, anyhow::Error>(acc.unwrap_or_default() + s);
    let parts = ["a", "b", "c", "d", "e"];

    let queue = ResultQueue::new();
    let handle = ResultReducer::new("concat", &queue, concat).start().unwrap();
    for part in parts {
        queue.push_partial(part).unwrap();
    }
    queue.finish().unwrap();

    let expected = parts.iter().fold(String::new(), |acc, s| acc + s);
    assert_eq!(handle.join().unwrap().result, Some(expected));
}

/// A second sentinel is never acted on
#[test]
fn test_second_sentinel_is_ignored() {
    for wait in strategies() {
        let queue = ResultQueue::new();
        for x in [3, 4, 5] {
            queue.push_partial(x).unwrap();
        }
        queue.finish().unwrap();
        queue.finish().unwrap();

        let handle = ResultReducer::new("twice", &queue, sum)
            .wait_strategy(wait)
            .start()
            .unwrap();
        let outcome = handle.join().unwrap();
        assert_eq!(outcome.processed, 3);

        let mut finals = 0;
        let mut sentinels = 0;
        while let Some(item) = queue.try_pop() {
            match item {
                QueueItem::Final(value) => {
                    finals += 1;
                    assert_eq!(value, Some(12));
                }
                QueueItem::Done => sentinels += 1,
                QueueItem::Partial(_) => panic!("no partial result should be left"),
            }
        }
        assert_eq!(finals, 1, "{wait:?}");
        assert_eq!(sentinels, 1, "{wait:?}");
    }
}

#[test]
fn test_processed_count_is_independent_of_verbosity() {
    for verbose in [false, true] {
        let queue = ResultQueue::new();
        let handle = ResultReducer::new("count", &queue, sum)
            .verbose(verbose)
            .interval(1000)
            .start()
            .unwrap();

        for x in 0..250 {
            queue.push_partial(x).unwrap();
        }
        queue.finish().unwrap();

        assert_eq!(handle.join().unwrap().processed, 250);
    }
}

/// interval = 2, verbose on, four partial results: reports after 2 and 4
#[test]
fn test_progress_fires_on_interval_multiples() {
    for wait in strategies() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();

        let queue = ResultQueue::new();
        let handle = ResultReducer::new("progress", &queue, sum)
            .verbose(true)
            .interval(2)
            .wait_strategy(wait)
            .on_progress(move |n| sink.lock().unwrap().push(n))
            .start()
            .unwrap();

        for x in [1, 2, 3, 4] {
            queue.push_partial(x).unwrap();
        }
        queue.finish().unwrap();
        handle.join().unwrap();

        assert_eq!(*reports.lock().unwrap(), vec![2, 4], "{wait:?}");
    }
}

#[test]
fn test_progress_never_fires_when_disabled() {
    for wait in strategies() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();

        let queue = ResultQueue::new();
        let handle = ResultReducer::new("silent", &queue, sum)
            .verbose(false)
            .interval(2)
            .wait_strategy(wait)
            .on_progress(move |n| sink.lock().unwrap().push(n))
            .start()
            .unwrap();

        for x in [1, 2, 3, 4] {
            queue.push_partial(x).unwrap();
        }
        queue.finish().unwrap();
        handle.join().unwrap();

        assert!(reports.lock().unwrap().is_empty(), "{wait:?}");
    }
}

/// A panicking progress sink still leaves the worker in the crashed state
#[test]
fn test_progress_sink_panic_marks_worker_crashed() {
    for wait in strategies() {
        let queue: ResultQueue<i64, i64> = ResultQueue::new();
        let handle = ResultReducer::new("sink", &queue, sum)
            .verbose(true)
            .interval(1)
            .wait_strategy(wait)
            .on_progress(|_| panic!("sink failed"))
            .start()
            .unwrap();

        queue.push_partial(1).unwrap();

        assert!(handle.wait_timeout(Duration::from_secs(5)));
        assert_eq!(handle.state(), ReducerState::Crashed);
        assert!(matches!(
            handle.join(),
            Err(ReducerError::Panicked { processed: 1, .. })
        ));
        assert_eq!(queue.take_final(), None);
    }
}

/// Reducer faults on the 2nd item: nothing published, count stays 1
#[test]
fn test_reducer_fault_publishes_nothing() {
    for wait in strategies() {
        let queue = ResultQueue::new();
        let handle = ResultReducer::new("faulty", &queue, |acc: Option<i64>, x: i64| {
            if x == 4 {
                return Err(anyhow!("cannot reduce {x}"));
            }
            Ok(acc.map_or(x, |a| a + x))
        })
        .wait_strategy(wait)
        .start()
        .unwrap();

        for x in [3, 4, 5] {
            queue.push_partial(x).unwrap();
        }
        queue.finish().unwrap();

        assert!(handle.wait_timeout(Duration::from_secs(5)));
        assert_eq!(handle.state(), ReducerState::Crashed);
        assert_eq!(handle.processed_count(), 1);

        match handle.join() {
            Err(ReducerError::Fault {
                name,
                processed,
                source,
            }) => {
                assert_eq!(name, "faulty");
                assert_eq!(processed, 1);
                assert!(source.to_string().contains("cannot reduce 4"));
            }
            other => panic!("expected a reducer fault, got {other:?}"),
        }

        assert_eq!(queue.take_final(), None);
        // The rest of the stream is left where it was.
        assert_eq!(queue.try_pop(), Some(QueueItem::Partial(5)));
        assert_eq!(queue.try_pop(), Some(QueueItem::Done));
    }
}

#[test]
fn test_reducer_panic_is_reported_as_crash() {
    for wait in strategies() {
        let queue = ResultQueue::new();
        let handle = ResultReducer::new("panicky", &queue, |acc: Option<i64>, x: i64| {
            if x == 2 {
                panic!("boom");
            }
            Ok(acc.map_or(x, |a| a + x))
        })
        .wait_strategy(wait)
        .start()
        .unwrap();

        queue.push_partial(1).unwrap();
        queue.push_partial(2).unwrap();
        queue.finish().unwrap();

        let err = handle.join().unwrap_err();
        assert!(matches!(err, ReducerError::Panicked { processed: 1, .. }));
        assert_eq!(queue.take_final(), None);
    }
}

/// Consumer waiting on a crashed worker times out instead of hanging
#[test]
fn test_consumer_times_out_on_crashed_worker() {
    let queue = ResultQueue::new();
    let handle = ResultReducer::new("crash", &queue, |_: Option<i64>, _: i64| {
        Err(anyhow!("always fails"))
    })
    .start()
    .unwrap();

    queue.push_partial(1).unwrap();
    assert!(handle.wait_timeout(Duration::from_secs(5)));

    let err = queue.wait_final(Duration::from_millis(50)).unwrap_err();
    assert_eq!(err, utilp::reducer::QueueError::Timeout);
    assert!(handle.join().is_err());
}

#[test]
fn test_cancel_stops_blocking_worker_without_publishing() {
    let queue = ResultQueue::new();
    let handle = ResultReducer::new("cancel", &queue, sum).start().unwrap();

    queue.push_partial(1).unwrap();
    queue.push_partial(2).unwrap();
    // Let the worker drain the queue before cancelling.
    for _ in 0..500 {
        if handle.processed_count() == 2 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    handle.cancel_token().cancel();

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.state, ReducerState::Cancelled);
    assert_eq!(outcome.result, Some(3));
    assert_eq!(queue.take_final(), None);
}

#[test]
fn test_cancel_stops_polling_worker() {
    let queue: ResultQueue<i64, i64> = ResultQueue::new();
    let handle = ResultReducer::new("cancel-poll", &queue, sum)
        .wait_strategy(fast_polling())
        .start()
        .unwrap();

    handle.cancel();
    assert!(handle.wait_timeout(Duration::from_secs(5)));
    assert_eq!(handle.state(), ReducerState::Cancelled);
    assert_eq!(handle.join().unwrap().result, None);
    assert!(queue.is_empty());
}

/// Commutative reducer tolerates any interleaving of concurrent producers
#[test]
fn test_multiple_producers_with_commutative_reducer() {
    let queue = ResultQueue::new();
    let handle = ResultReducer::new("multi", &queue, sum).start().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for x in 0..100 {
                    queue.push_partial(p * 100 + x).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    queue.finish().unwrap();

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.processed, 400);
    assert_eq!(outcome.result, Some((0..400).sum()));
}

use super::threads::{assert_blocked, join_within};
use circbuf::{
    DequeueOptions, Dequeued, EnqueueOptions, Enqueued, FifoOrder, FnOrder, InMemoryQueueMetrics,
    KeyOrder, OrderedQueue, QueueConfig, QueueError, QueueItem, QueueMetrics, SpoolBlock,
    SpoolOrder, WakePolicy,
};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn drain_payloads<T, M: QueueMetrics>(queue: &OrderedQueue<T, M>) -> Vec<T> {
    let mut out = Vec::new();
    while let Dequeued::Item(item) = queue
        .dequeue(DequeueOptions::timed(Duration::from_millis(10)))
        .unwrap()
    {
        out.push(item.into_payload());
    }
    out
}

#[test]
fn dequeue_order_is_non_decreasing_across_producers() {
    let queue: Arc<OrderedQueue<u64>> = Arc::new(OrderedQueue::new(64).unwrap());
    let producers: Vec<_> = (0..4u64)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                let order = KeyOrder::new(|value: &u64| *value);
                for step in 0..16u64 {
                    let value = (step * 37 + producer * 11) % 101;
                    queue
                        .enqueue(value, 8, &order, EnqueueOptions::default())
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    let drained = drain_payloads(&*queue);
    assert_eq!(drained.len(), 64);
    assert!(drained.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn equal_keys_keep_arrival_order() {
    let queue = OrderedQueue::new(8).unwrap();
    let order = KeyOrder::new(|entry: &(u8, char)| entry.0);
    for entry in [(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd'), (2, 'e')] {
        queue
            .enqueue(entry, 0, &order, EnqueueOptions::default())
            .unwrap();
    }
    let tags: Vec<char> = drain_payloads(&queue).into_iter().map(|(_, tag)| tag).collect();
    assert_eq!(tags, vec!['b', 'd', 'a', 'c', 'e']);
}

#[test]
fn merge_runs_once_and_keeps_size() {
    let merges = AtomicUsize::new(0);
    let order = FnOrder::new(
        |incoming: &(u32, u32), queued: &(u32, u32)| incoming.0.cmp(&queued.0),
        |queued: &mut QueueItem<(u32, u32)>,
         incoming: QueueItem<(u32, u32)>|
         -> Result<(), QueueItem<(u32, u32)>> {
            merges.fetch_add(1, AtomicOrdering::SeqCst);
            queued.payload.1 += incoming.payload.1;
            queued.payload_size += incoming.payload_size;
            Ok(())
        },
    );
    let queue = OrderedQueue::new(4).unwrap();
    assert_eq!(
        queue
            .enqueue((7, 1), 10, &order, EnqueueOptions::default())
            .unwrap(),
        Enqueued::Inserted { position: 0 }
    );
    assert_eq!(
        queue
            .enqueue((7, 2), 5, &order, EnqueueOptions::default())
            .unwrap(),
        Enqueued::Merged { position: 0 }
    );
    assert_eq!(merges.load(AtomicOrdering::SeqCst), 1);
    assert_eq!(queue.len().unwrap(), 1);
    assert_eq!(
        queue.peek_first(|item| item.clone()).unwrap(),
        Some(QueueItem::new((7, 3), 15))
    );
}

#[test]
fn declined_merge_inserts_after_equals() {
    let order = FnOrder::new(
        |incoming: &(u8, u8), queued: &(u8, u8)| incoming.0.cmp(&queued.0),
        |_queued: &mut QueueItem<(u8, u8)>,
         incoming: QueueItem<(u8, u8)>|
         -> Result<(), QueueItem<(u8, u8)>> { Err(incoming) },
    );
    let queue = OrderedQueue::new(4).unwrap();
    for entry in [(5, 0), (9, 0), (5, 1)] {
        queue
            .enqueue(entry, 0, &order, EnqueueOptions::default())
            .unwrap();
    }
    assert_eq!(drain_payloads(&queue), vec![(5, 0), (5, 1), (9, 0)]);
}

#[test]
fn spool_blocks_coalesce_and_order_by_offset() {
    let metrics = InMemoryQueueMetrics::default();
    let queue = OrderedQueue::with_metrics(&QueueConfig::default(), metrics.clone()).unwrap();
    let blocks = [
        SpoolBlock::data(1024, vec![1; 512]),
        SpoolBlock::end_of_file(1536),
        SpoolBlock::data(0, vec![2; 512]),
        SpoolBlock::data(1024, vec![3; 256]),
        SpoolBlock::data(512, vec![4; 512]),
    ];
    for block in blocks {
        let size = block.len();
        queue
            .enqueue(block, size, &SpoolOrder, EnqueueOptions::default())
            .unwrap();
    }
    assert_eq!(metrics.snapshot().merges, 1);
    let offsets: Vec<u64> = queue
        .peek_clone()
        .unwrap()
        .iter()
        .map(|item| item.payload.offset())
        .collect();
    assert_eq!(offsets, vec![0, 512, 1024, 1536]);
    let rewritten = queue
        .peek_list(|item| item.payload.offset() == 1024)
        .unwrap()
        .unwrap();
    assert_eq!(rewritten, 2);
    let drained = drain_payloads(&queue);
    assert_eq!(drained[2], SpoolBlock::data(1024, vec![3; 256]));
}

#[test]
fn concurrent_producers_and_consumers_lose_nothing() {
    let config = QueueConfig::with_capacity(3).with_wake_policy(WakePolicy::All);
    let metrics = InMemoryQueueMetrics::default();
    let queue: Arc<OrderedQueue<u32, InMemoryQueueMetrics>> =
        Arc::new(OrderedQueue::with_metrics(&config, metrics.clone()).unwrap());
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                loop {
                    match queue.dequeue(DequeueOptions::default()).unwrap() {
                        Dequeued::Item(item) => seen.push(item.into_payload()),
                        Dequeued::Drained => return seen,
                        Dequeued::TimedOut => unreachable!("no deadline was set"),
                    }
                }
            })
        })
        .collect();
    let producers: Vec<_> = (0..4u32)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for step in 0..50u32 {
                    queue
                        .enqueue(producer * 1_000 + step, 1, &FifoOrder, EnqueueOptions::default())
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    queue.flush().unwrap();

    let mut seen = HashSet::new();
    for consumer in consumers {
        for value in join_within(consumer, Duration::from_secs(10), "consumer") {
            assert!(seen.insert(value), "value {value} delivered twice");
        }
    }
    assert_eq!(seen.len(), 200);
    assert!(metrics.snapshot().high_watermark <= 3);
    assert!(queue.is_empty().unwrap());
}

#[test]
fn timed_dequeue_returns_timed_out_and_leaves_queue() {
    let metrics = InMemoryQueueMetrics::default();
    let queue: OrderedQueue<u32, _> =
        OrderedQueue::with_metrics(&QueueConfig::with_capacity(2), metrics.clone()).unwrap();
    let started = Instant::now();
    let outcome = queue
        .dequeue(DequeueOptions::timed(Duration::from_millis(50)))
        .unwrap();
    assert!(outcome.is_timed_out());
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(queue.status().unwrap().size, 0);
    assert_eq!(metrics.snapshot().timeouts, 1);
}

#[test]
fn timed_dequeue_wakes_on_enqueue() {
    let queue: Arc<OrderedQueue<u32>> = Arc::new(OrderedQueue::new(2).unwrap());
    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.dequeue(DequeueOptions::timed(Duration::from_secs(5))))
    };
    assert_blocked(&consumer, "timed consumer");
    queue
        .enqueue(42u32, 4, &FifoOrder, EnqueueOptions::default())
        .unwrap();
    let outcome = join_within(consumer, Duration::from_secs(2), "timed consumer").unwrap();
    assert_eq!(outcome.into_item(), Some(QueueItem::new(42, 4)));
}

#[test]
fn requeued_consumer_backs_off_before_taking_head() {
    let metrics = InMemoryQueueMetrics::default();
    let queue =
        OrderedQueue::with_metrics(&QueueConfig::with_capacity(2), metrics.clone()).unwrap();
    queue
        .enqueue(1u32, 0, &FifoOrder, EnqueueOptions::default())
        .unwrap();
    let started = Instant::now();
    let outcome = queue
        .dequeue(
            DequeueOptions::timed(Duration::from_millis(40)).with_requeued(true),
        )
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(outcome.into_item().map(QueueItem::into_payload), Some(1));
    assert_eq!(metrics.snapshot().requeues, 1);
}

#[test]
fn configured_dequeue_timeout_bounds_requeued_backoff() {
    let config =
        QueueConfig::from_json_str(r#"{"capacity": 2, "dequeue_timeout_ms": 200}"#).unwrap();
    let queue: Arc<OrderedQueue<u32>> = Arc::new(OrderedQueue::with_config(&config).unwrap());
    assert_eq!(queue.dequeue_timeout(), Duration::from_millis(200));
    queue
        .enqueue(9, 0, &FifoOrder, EnqueueOptions::default())
        .unwrap();
    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let outcome = queue
                .dequeue(DequeueOptions::default().with_requeued(true))
                .unwrap();
            (outcome, started.elapsed())
        })
    };
    let (outcome, waited) = join_within(consumer, Duration::from_secs(5), "requeued consumer");
    assert!(waited >= Duration::from_millis(150));
    assert_eq!(outcome.into_item().map(QueueItem::into_payload), Some(9));
}

#[test]
fn merge_wakes_consumer_backing_off() {
    let config =
        QueueConfig::from_json_str(r#"{"capacity": 2, "dequeue_timeout_ms": 30000}"#).unwrap();
    let queue: Arc<OrderedQueue<(u32, u32)>> =
        Arc::new(OrderedQueue::with_config(&config).unwrap());
    let order = FnOrder::new(
        |incoming: &(u32, u32), queued: &(u32, u32)| incoming.0.cmp(&queued.0),
        |queued: &mut QueueItem<(u32, u32)>,
         incoming: QueueItem<(u32, u32)>|
         -> Result<(), QueueItem<(u32, u32)>> {
            queued.payload.1 = incoming.payload.1;
            Ok(())
        },
    );
    queue
        .enqueue((7, 1), 0, &order, EnqueueOptions::default())
        .unwrap();
    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.dequeue(DequeueOptions::default().with_requeued(true)))
    };
    assert_blocked(&consumer, "requeued consumer");
    assert_eq!(
        queue
            .enqueue((7, 2), 0, &order, EnqueueOptions::default())
            .unwrap(),
        Enqueued::Merged { position: 0 }
    );
    let outcome = join_within(consumer, Duration::from_secs(5), "requeued consumer").unwrap();
    assert_eq!(outcome.into_item().map(QueueItem::into_payload), Some((7, 2)));
}

#[test]
fn no_signal_enqueue_waits_for_explicit_notify() {
    let queue: Arc<OrderedQueue<u32>> = Arc::new(OrderedQueue::new(4).unwrap());
    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.dequeue(DequeueOptions::default()))
    };
    assert_blocked(&consumer, "consumer before batch");
    for value in [3u32, 1, 2] {
        queue
            .enqueue(
                value,
                0,
                &KeyOrder::new(|v: &u32| *v),
                EnqueueOptions::default().with_no_signal(true),
            )
            .unwrap();
    }
    assert_blocked(&consumer, "consumer during silent batch");
    queue.notify_consumers();
    let first = join_within(consumer, Duration::from_secs(5), "consumer").unwrap();
    assert_eq!(first.into_item().map(QueueItem::into_payload), Some(1));
}

#[test]
fn panicking_comparator_poisons_queue() {
    let queue: Arc<OrderedQueue<u32>> = Arc::new(OrderedQueue::new(4).unwrap());
    queue
        .enqueue(1u32, 0, &FifoOrder, EnqueueOptions::default())
        .unwrap();
    let result = {
        let queue = queue.clone();
        thread::spawn(move || {
            let order = FnOrder::new(
                |_: &u32, _: &u32| -> Ordering { panic!("comparator failure") },
                |_: &mut QueueItem<u32>, incoming: QueueItem<u32>| -> Result<(), QueueItem<u32>> {
                    Err(incoming)
                },
            );
            let _ = queue.enqueue(2, 0, &order, EnqueueOptions::default());
        })
        .join()
    };
    assert!(result.is_err());
    assert!(matches!(queue.len(), Err(QueueError::Poisoned { .. })));
    assert!(matches!(
        queue.dequeue(DequeueOptions::default()),
        Err(QueueError::Poisoned { .. })
    ));
}

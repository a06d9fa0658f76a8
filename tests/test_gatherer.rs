use std::sync::Arc;
use std::thread;

use rankwork::prelude::*;

#[test]
fn test_gather_to_head() {
    let ranks = 4u32;
    let per_rank = 100u32;
    let config = GathererConfig::default()
        .with_head(2)
        .with_transmit_threads(2)
        .with_receive_threads(3);

    let results = LocalCluster::new(ranks).run(move |comm| {
        let head = comm.rank() == config.head;
        let input = Arc::new(Queue::bounded(8));
        let output = Arc::new(Queue::bounded(16));

        let mut gatherer = Gatherer::new(
            input.clone(),
            if head { Some(output.clone()) } else { None },
            &comm,
            config,
        )
        .unwrap();

        // Started before enqueueing: the head's own items also land on `output`
        let drainer = if head {
            let output = output.clone();
            let expected = (ranks * per_rank) as usize;
            Some(thread::spawn(move || {
                output
                    .dequeue_many(expected)
                    .into_iter()
                    .filter_map(Message::into_value)
                    .collect::<Vec<u32>>()
            }))
        } else {
            None
        };

        input.enqueue_all((0..per_rank).map(|i| comm.rank() * per_rank + i));
        let received = drainer.map(|d| d.join().unwrap());
        gatherer.shutdown().unwrap();
        assert!(output.is_empty());
        received
    });

    let mut heads = results.into_iter().enumerate().filter_map(|(rank, r)| r.map(|r| (rank, r)));
    let (head, mut received) = heads.next().unwrap();
    assert!(heads.next().is_none());
    assert_eq!(head, 2);

    received.sort();
    assert_eq!(received, (0..ranks * per_rank).collect::<Vec<_>>());
}

#[test]
fn test_solo_gather() {
    let comm = LocalComm::solo();
    let input = Arc::new(Queue::bounded(64));
    let output = Arc::new(Queue::bounded(64));
    let mut gatherer = Gatherer::new(input.clone(), Some(output.clone()), &comm, GathererConfig::default()).unwrap();

    input.enqueue_all(vec![(1u8, "one".to_string()), (2u8, "two".to_string())]);
    let mut received: Vec<_> = output.dequeue_many(2).into_iter().filter_map(Message::into_value).collect();
    gatherer.shutdown().unwrap();

    received.sort();
    assert_eq!(received, vec![(1, "one".to_string()), (2, "two".to_string())]);
}

#[test]
fn test_leftovers_delivered_on_shutdown() {
    let results = LocalCluster::new(3).run(|comm| {
        let head = comm.rank() == 0;
        let input = Arc::new(Queue::bounded(32));
        let output = Arc::new(Queue::bounded(96));

        input.enqueue_all(0..32u16);
        let mut gatherer = Gatherer::new(
            input,
            if head { Some(output.clone()) } else { None },
            &comm,
            GathererConfig::default(),
        )
        .unwrap();
        gatherer.shutdown().unwrap();
        output.len()
    });

    assert_eq!(results, vec![96, 0, 0]);
}

#[test]
fn test_head_needs_output() {
    let comm = LocalComm::solo();
    let input: Arc<Queue<i64>> = Arc::new(Queue::bounded(1));

    match Gatherer::new(input, None, &comm, GathererConfig::default()) {
        Err(Error::InvalidConfig(_)) => (),
        _ => panic!("head accepted without an output queue"),
    }
}

#[test]
fn test_queue_on_non_head_rank_ignored() {
    let results = LocalCluster::new(3).run(|comm| {
        let input = Arc::new(Queue::bounded(20));
        let output = Arc::new(Queue::bounded(60));

        input.enqueue_all((0..20u32).map(|i| comm.rank() * 100 + i));
        let mut gatherer = Gatherer::new(input, Some(output.clone()), &comm, GathererConfig::default()).unwrap();
        gatherer.shutdown().unwrap();

        let mut received = Vec::new();
        while let Some(msg) = output.try_dequeue() {
            received.extend(msg.into_value());
        }
        received
    });

    assert!(results[1].is_empty());
    assert!(results[2].is_empty());

    let mut received = results[0].clone();
    received.sort();
    let expected: Vec<u32> = (0..3).flat_map(|r| (0..20).map(move |i| r * 100 + i)).collect();
    assert_eq!(received, expected);
}

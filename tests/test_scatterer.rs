use std::sync::Arc;
use std::thread;

use rankwork::prelude::*;

fn drain<T>(queue: &Queue<T>) -> Vec<T> {
    let mut values = Vec::new();
    while let Some(msg) = queue.try_dequeue() {
        values.extend(msg.into_value());
    }
    values
}

#[test]
fn test_scatter_from_head() {
    let total = 300u64;
    let config = ScattererConfig::default()
        .with_head(1)
        .with_transmit_threads(2)
        .with_receive_threads(2);

    let results = LocalCluster::new(3).run(move |comm| {
        let head = comm.rank() == config.head;
        let input = Arc::new(Queue::bounded(8));
        let output = Arc::new(Queue::bounded(total as usize));

        let mut scatterer = Scatterer::new(
            if head { Some(input.clone()) } else { None },
            output.clone(),
            &comm,
            config,
        )
        .unwrap();
        assert_eq!(scatterer.head(), 1);

        if head {
            input.enqueue_all(0..total);
        }
        scatterer.shutdown().unwrap();
        assert_eq!(scatterer.state(), State::Stopped);
        drain(&output)
    });

    let mut received: Vec<u64> = results.into_iter().flatten().collect();
    received.sort();
    assert_eq!(received, (0..total).collect::<Vec<_>>());
}

#[test]
fn test_small_output_queues() {
    let results = LocalCluster::new(3).run(|comm| {
        let config = ScattererConfig::default().with_receive_threads(2);
        let head = comm.rank() == config.head;
        let input = Arc::new(Queue::bounded(4));
        let output = Arc::new(Queue::bounded(2));
        let mut scatterer = Scatterer::new(
            if head { Some(input.clone()) } else { None },
            output.clone(),
            &comm,
            config,
        )
        .unwrap();

        let drainer = {
            let output = output.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Message::Value(item) = output.dequeue() {
                    seen.push(item);
                }
                seen
            })
        };

        if head {
            input.enqueue_all((0..90).map(|i| format!("item-{}", i)));
        }
        scatterer.shutdown().unwrap();
        output.enqueue_stop();
        drainer.join().unwrap()
    });

    let mut received: Vec<String> = results.into_iter().flatten().collect();
    received.sort();
    let mut expected: Vec<String> = (0..90).map(|i| format!("item-{}", i)).collect();
    expected.sort();
    assert_eq!(received, expected);
}

#[test]
fn test_head_needs_input() {
    let comm = LocalComm::solo();
    let output: Arc<Queue<u32>> = Arc::new(Queue::bounded(1));

    match Scatterer::new(None, output.clone(), &comm, ScattererConfig::default()) {
        Err(Error::InvalidConfig(_)) => (),
        _ => panic!("head accepted without an input queue"),
    }

    let outside = ScattererConfig::default().with_head(1);
    match Scatterer::new(Some(Arc::new(Queue::bounded(1))), output, &comm, outside) {
        Err(Error::InvalidConfig(_)) => (),
        _ => panic!("head outside the communicator accepted"),
    }
}

#[test]
fn test_queue_on_non_head_rank_ignored() {
    let results = LocalCluster::new(3).run(|comm| {
        let head = comm.rank() == 0;
        let input = Arc::new(Queue::bounded(64));
        let output = Arc::new(Queue::bounded(60));

        // Items on a non-head input queue are never sent
        if !head {
            input.enqueue_all(1000..1010u32);
        }
        let mut scatterer = Scatterer::new(Some(input.clone()), output.clone(), &comm, ScattererConfig::default()).unwrap();

        if head {
            input.enqueue_all(0..60u32);
        }
        scatterer.shutdown().unwrap();
        (drain(&output), input.len())
    });

    let mut received: Vec<u32> = Vec::new();
    for (rank, (items, left)) in results.into_iter().enumerate() {
        assert_eq!(left, if rank == 0 { 0 } else { 10 });
        received.extend(items);
    }
    received.sort();
    assert_eq!(received, (0..60).collect::<Vec<_>>());
}

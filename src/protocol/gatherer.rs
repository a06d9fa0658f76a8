//! All-to-head collection, the mirror image of the [`Scatterer`].
//!
//! Every rank transmits from its own input queue; only the head receives.
//! A transmit thread asks the head for a slot, the head answers with the
//! data tag of one of its receive threads, and the payload follows on
//! that tag.
//!
//! [`Scatterer`]: ../scatterer/struct.Scatterer.html
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::comm::frame::{receive_frame, send_frame, TxAckFrame, TxRequestFrame};
use crate::comm::{Communicator, Rank, Source, Status, Tag, Transmissable};
use crate::config::GathererConfig;
use crate::errors::{expect_rank, fatal, Error, Result};
use crate::sync::queue::Queue;
use crate::sync::Message;
use crate::tags::TagPool;

use super::{join_all, spawn, State, TAG_POOL_SIZE};

const TX_REQUEST_TAG: Tag = 0;
const TAG_BASE: Tag = 10;

// -----------------------------------------------------------------------------
//              - Gatherer -
// -----------------------------------------------------------------------------
/// Collects items from every rank's input queue onto the head rank's
/// output queue.
///
/// Construction and [`shutdown`] are collective (see the [module docs]).
///
/// [`shutdown`]: struct.Gatherer.html#method.shutdown
/// [module docs]: ../index.html
pub struct Gatherer<T: Transmissable, C: Communicator> {
    comm: C,
    head: Rank,
    input: Arc<Queue<T>>,
    transmitters: Vec<JoinHandle<()>>,
    receivers: Vec<JoinHandle<()>>,
    state: State,
}

impl<T: Transmissable, C: Communicator> Gatherer<T, C> {
    /// Start a gatherer on a duplicate of `basis`.
    ///
    /// Every rank transmits from its own `input`; `output` is required on
    /// the head rank and ignored elsewhere.
    ///
    /// # Errors
    ///
    /// Invalid settings, or a head rank without an output queue, are reported
    /// before any communication happens. The error is local: the other
    /// ranks are left waiting in the collective setup, so the caller should
    /// treat it as fatal for the job.
    pub fn new(
        input: Arc<Queue<T>>,
        output: Option<Arc<Queue<T>>>,
        basis: &C,
        config: GathererConfig,
    ) -> Result<Self> {
        config.validate(basis.size())?;
        let head = config.head;
        let rank = basis.rank();

        let output = if rank == head {
            match output {
                Some(output) => Some(output),
                None => return Err(Error::InvalidConfig("the head rank needs an output queue")),
            }
        } else {
            if output.is_some() {
                warn!(
                    "[gatherer] output queue passed on rank {} but the head is rank {}; \
                     nothing will ever be pushed onto it",
                    rank, head
                );
            }
            None
        };

        let comm = basis.duplicate()?;
        comm.barrier()?;
        let mut tags = TagPool::with_capacity_and_offset(TAG_POOL_SIZE, TAG_BASE);

        let mut transmitters = Vec::with_capacity(config.transmit_threads);
        for i in 0..config.transmit_threads {
            let (comm, input) = (comm.clone(), input.clone());
            let ack_tag = tags.allocate()?;
            transmitters.push(spawn(format!("gatherer-tx-{}", i), move || {
                transmit_main(comm, input, head, ack_tag)
            })?);
        }

        let mut receivers = Vec::new();
        if let Some(output) = output {
            for i in 0..config.receive_threads {
                let (comm, output) = (comm.clone(), output.clone());
                let data_tag = tags.allocate()?;
                receivers.push(spawn(format!("gatherer-rx-{}", i), move || {
                    receive_main(comm, output, data_tag)
                })?);
            }
        }

        debug!(
            "gatherer up on rank {}/{}: head {}, {} tx, {} rx",
            rank,
            comm.size(),
            head,
            transmitters.len(),
            receivers.len()
        );

        Ok(Self {
            comm,
            head,
            input,
            transmitters,
            receivers,
            state: State::Running,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// The head rank
    pub fn head(&self) -> Rank {
        self.head
    }

    /// Stop every thread of this instance, on every rank.
    ///
    /// Every rank's transmit threads deliver what is left on their input
    /// queue before the head's receive threads are stopped. The head's
    /// output queue must keep being drained until this returns.
    /// Collective: see the [module docs].
    ///
    /// [module docs]: ../index.html
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state != State::Running {
            return Ok(());
        }
        self.state = State::Draining;
        let rank = self.comm.rank();

        self.comm.barrier()?;
        for _ in 0..self.transmitters.len() {
            self.input.enqueue_stop();
        }
        join_all(&mut self.transmitters);

        // Only stop requests reach the head past this point
        self.comm.barrier()?;
        for _ in 0..self.receivers.len() {
            send_frame(&self.comm, &TxRequestFrame::stop(rank), rank, TX_REQUEST_TAG)?;
        }
        join_all(&mut self.receivers);

        self.comm.barrier()?;
        self.state = State::Stopped;
        debug!("gatherer down on rank {}", rank);
        Ok(())
    }
}

impl<T: Transmissable, C: Communicator> Drop for Gatherer<T, C> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            fatal("gatherer", e);
        }
    }
}

// -----------------------------------------------------------------------------
//              - Threads -
// -----------------------------------------------------------------------------
fn transmit_main<T: Transmissable, C: Communicator>(
    comm: C,
    input: Arc<Queue<T>>,
    head: Rank,
    ack_tag: Tag,
) -> Result<()> {
    let request = TxRequestFrame {
        rank: comm.rank(),
        ack_tag,
        data_tag: 0,
        stop: false,
    };

    while let Message::Value(item) = input.dequeue() {
        send_frame(&comm, &request, head, TX_REQUEST_TAG)?;
        let (ack, status): (TxAckFrame, Status) = receive_frame(&comm, Source::Rank(head), ack_tag)?;
        expect_rank(status.source, ack.rank)?;

        trace!("gatherer: {} -> {} on tag {}", comm.rank(), head, ack.data_tag);
        item.send(&comm, head, ack.data_tag)?;
    }
    Ok(())
}

fn receive_main<T: Transmissable, C: Communicator>(
    comm: C,
    output: Arc<Queue<T>>,
    data_tag: Tag,
) -> Result<()> {
    let ack = TxAckFrame {
        rank: comm.rank(),
        data_tag,
    };

    loop {
        let (request, status): (TxRequestFrame, Status) = receive_frame(&comm, Source::Any, TX_REQUEST_TAG)?;
        expect_rank(status.source, request.rank)?;
        if request.stop {
            break;
        }

        send_frame(&comm, &ack, request.rank, request.ack_tag)?;
        let (item, _) = T::receive(&comm, Source::Rank(request.rank), data_tag)?;
        output.enqueue(item);
    }
    Ok(())
}

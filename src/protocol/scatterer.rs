//! Head-to-all distribution.
//!
//! Only the head rank transmits. Every rank, the head included, runs receive
//! threads that ask the head for work whenever they are free, so faster
//! ranks pull more items. With a single source there is no separate
//! matchmaker: a head transmit thread takes the next waiting receive
//! request as soon as it has an item.
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::comm::frame::{receive_frame, send_frame, RxAckFrame, RxRequestFrame};
use crate::comm::{Communicator, Rank, Source, Status, Tag, Transmissable};
use crate::config::ScattererConfig;
use crate::errors::{expect_rank, fatal, Error, Result};
use crate::sync::queue::Queue;
use crate::sync::Message;
use crate::tags::TagPool;

use super::{join_all, spawn, State, TAG_POOL_SIZE};

const RX_REQUEST_TAG: Tag = 0;
const TAG_BASE: Tag = 10;

// -----------------------------------------------------------------------------
//              - Scatterer -
// -----------------------------------------------------------------------------
/// Fans items from the head rank's input queue out to the output queues of
/// all ranks, on demand.
///
/// Construction and [`shutdown`] are collective (see the [module docs]).
///
/// [`shutdown`]: struct.Scatterer.html#method.shutdown
/// [module docs]: ../index.html
pub struct Scatterer<T: Transmissable, C: Communicator> {
    comm: C,
    head: Rank,
    input: Option<Arc<Queue<T>>>,
    transmitters: Vec<JoinHandle<()>>,
    receivers: Vec<JoinHandle<()>>,
    state: State,
}

impl<T: Transmissable, C: Communicator> Scatterer<T, C> {
    /// Start a scatterer on a duplicate of `basis`.
    ///
    /// `input` is required on the head rank and ignored elsewhere; every
    /// rank receives into its own `output`.
    ///
    /// # Errors
    ///
    /// Invalid settings, or a head rank without an input queue, are reported
    /// before any communication happens. The error is local: the other
    /// ranks are left waiting in the collective setup, so the caller should
    /// treat it as fatal for the job.
    pub fn new(
        input: Option<Arc<Queue<T>>>,
        output: Arc<Queue<T>>,
        basis: &C,
        config: ScattererConfig,
    ) -> Result<Self> {
        config.validate(basis.size())?;
        let head = config.head;
        let rank = basis.rank();

        let input = if rank == head {
            match input {
                Some(input) => Some(input),
                None => return Err(Error::InvalidConfig("the head rank needs an input queue")),
            }
        } else {
            if input.is_some() {
                warn!(
                    "[scatterer] input queue passed on rank {} but the head is rank {}; \
                     anything pushed onto it will never be sent",
                    rank, head
                );
            }
            None
        };

        let comm = basis.duplicate()?;
        comm.barrier()?;
        let mut tags = TagPool::with_capacity_and_offset(TAG_POOL_SIZE, TAG_BASE);

        let mut transmitters = Vec::new();
        if let Some(ref input) = input {
            for i in 0..config.transmit_threads {
                let (comm, input) = (comm.clone(), input.clone());
                transmitters.push(spawn(format!("scatterer-tx-{}", i), move || {
                    transmit_main(comm, input)
                })?);
            }
        }

        let mut receivers = Vec::with_capacity(config.receive_threads);
        for i in 0..config.receive_threads {
            let (comm, output) = (comm.clone(), output.clone());
            let ack_tag = tags.allocate()?;
            let data_tag = tags.allocate()?;
            receivers.push(spawn(format!("scatterer-rx-{}", i), move || {
                receive_main(comm, output, head, ack_tag, data_tag)
            })?);
        }

        debug!(
            "scatterer up on rank {}/{}: head {}, {} tx, {} rx",
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
    /// Items already on the head's input queue are delivered before the
    /// transmit threads exit. Output queues must keep being drained until
    /// this returns. Collective: see the [module docs].
    ///
    /// [module docs]: ../index.html
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state != State::Running {
            return Ok(());
        }
        self.state = State::Draining;
        let rank = self.comm.rank();

        self.comm.barrier()?;
        if let Some(ref input) = self.input {
            for _ in 0..self.transmitters.len() {
                input.enqueue_stop();
            }
            join_all(&mut self.transmitters);

            // Every rank runs the same number of receivers
            let pending = self.receivers.len() * self.comm.size() as usize;
            for _ in 0..pending {
                let (request, status): (RxRequestFrame, Status) =
                    receive_frame(&self.comm, Source::Any, RX_REQUEST_TAG)?;
                expect_rank(status.source, request.rank)?;
                send_frame(&self.comm, &RxAckFrame::stop(rank), request.rank, request.ack_tag)?;
            }
        }
        join_all(&mut self.receivers);

        self.comm.barrier()?;
        self.state = State::Stopped;
        debug!("scatterer down on rank {}", rank);
        Ok(())
    }
}

impl<T: Transmissable, C: Communicator> Drop for Scatterer<T, C> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            fatal("scatterer", e);
        }
    }
}

// -----------------------------------------------------------------------------
//              - Threads -
// -----------------------------------------------------------------------------
fn transmit_main<T: Transmissable, C: Communicator>(comm: C, input: Arc<Queue<T>>) -> Result<()> {
    let rank = comm.rank();

    while let Message::Value(item) = input.dequeue() {
        let (request, status): (RxRequestFrame, Status) = receive_frame(&comm, Source::Any, RX_REQUEST_TAG)?;
        expect_rank(status.source, request.rank)?;

        let ack = RxAckFrame {
            rank,
            data_tag: request.data_tag,
            stop: false,
        };
        send_frame(&comm, &ack, request.rank, request.ack_tag)?;

        trace!("scatterer: {} -> {} on tag {}", rank, request.rank, request.data_tag);
        item.send(&comm, request.rank, request.data_tag)?;
    }
    Ok(())
}

fn receive_main<T: Transmissable, C: Communicator>(
    comm: C,
    output: Arc<Queue<T>>,
    head: Rank,
    ack_tag: Tag,
    data_tag: Tag,
) -> Result<()> {
    let request = RxRequestFrame {
        rank: comm.rank(),
        ack_tag,
        data_tag,
    };

    loop {
        send_frame(&comm, &request, head, RX_REQUEST_TAG)?;
        let (ack, status): (RxAckFrame, Status) = receive_frame(&comm, Source::Rank(head), ack_tag)?;
        expect_rank(status.source, ack.rank)?;
        if ack.stop {
            break;
        }

        let (item, _) = T::receive(&comm, Source::Rank(head), data_tag)?;
        output.enqueue(item);
    }
    Ok(())
}

//! All-to-all redistribution.
//!
//! Every rank is both a source and a sink. Ranks are split into
//! [`SignalGroups`]; the first rank of each group runs signal handlers that
//! pair one ready transmitter with one ready receiver at a time, in arrival
//! order. Only the small control frames go through the signal handler: the
//! payload moves directly between the paired ranks.
//!
//! ```text
//!  transmitter             signal handler             receiver
//!      | -- TxRequest ------------> |                      |
//!      |                           | <------- RxRequest -- |
//!      | <------------- TxAck ---- |                      |
//!      |                           | ---- RxAck --------> |
//!      | -- payload (data tag) ---------------------------> |
//! ```
//!
//! [`SignalGroups`]: ../struct.SignalGroups.html
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::comm::frame::{receive_frame, send_frame, RxAckFrame, RxRequestFrame, TxAckFrame, TxRequestFrame};
use crate::comm::{Communicator, Rank, Source, Status, Tag, Transmissable};
use crate::config::DistributorConfig;
use crate::errors::{expect_rank, fatal, Error, Result};
use crate::sync::queue::Queue;
use crate::sync::Message;
use crate::tags::TagPool;

use super::{join_all, spawn, SignalGroups, State, TAG_POOL_SIZE};

const TX_REQUEST_TAG: Tag = 0;
const RX_REQUEST_TAG: Tag = 1;
const TAG_BASE: Tag = 16;

// -----------------------------------------------------------------------------
//              - Distributor -
// -----------------------------------------------------------------------------
/// Load-balances items from every rank's input queue onto every rank's
/// output queue.
///
/// Delivery order across the job is not deterministic. Construction and
/// [`shutdown`] are collective (see the [module docs]).
///
/// [`shutdown`]: struct.Distributor.html#method.shutdown
/// [module docs]: ../index.html
pub struct Distributor<T: Transmissable, C: Communicator> {
    comm: C,
    input: Arc<Queue<T>>,
    groups: SignalGroups,
    transmitters: Vec<JoinHandle<()>>,
    signal_handlers: Vec<JoinHandle<()>>,
    receivers: Vec<JoinHandle<()>>,
    state: State,
}

impl<T: Transmissable, C: Communicator> Distributor<T, C> {
    /// Start a distributor on a duplicate of `basis`.
    ///
    /// Items pushed onto `input` on any rank end up on the `output` queue of
    /// some rank.
    ///
    /// # Errors
    ///
    /// Invalid settings are reported before any communication happens. The
    /// error is local: the other ranks are left waiting in the collective
    /// setup, so the caller should treat it as fatal for the job.
    pub fn new(
        input: Arc<Queue<T>>,
        output: Arc<Queue<T>>,
        basis: &C,
        config: DistributorConfig,
    ) -> Result<Self> {
        config.validate(basis.size())?;

        let comm = basis.duplicate()?;
        comm.barrier()?;

        let rank = comm.rank();
        let groups = SignalGroups::new(comm.size(), config.signal_groups)?;
        let handler = groups.handler_of(rank);
        let mut tags = TagPool::with_capacity_and_offset(TAG_POOL_SIZE, TAG_BASE);

        let mut transmitters = Vec::with_capacity(config.transmit_threads);
        for i in 0..config.transmit_threads {
            let (comm, input) = (comm.clone(), input.clone());
            let ack_tag = tags.allocate()?;
            let data_tag = tags.allocate()?;
            transmitters.push(spawn(format!("distributor-tx-{}", i), move || {
                transmit_main(comm, input, handler, ack_tag, data_tag)
            })?);
        }

        // One receiver per signal handler rank in the job
        let mut receivers = Vec::new();
        for handler in groups.handlers() {
            let (comm, output) = (comm.clone(), output.clone());
            let ack_tag = tags.allocate()?;
            receivers.push(spawn(format!("distributor-rx-{}", handler), move || {
                receive_main(comm, output, handler, ack_tag)
            })?);
        }

        let mut signal_handlers = Vec::new();
        if groups.is_handler(rank) {
            for i in 0..config.signal_threads {
                let comm = comm.clone();
                signal_handlers.push(spawn(format!("distributor-signal-{}", i), move || {
                    signal_handler_main(comm)
                })?);
            }
        }

        debug!(
            "distributor up on rank {}/{}: matchmaker {}, {} tx, {} rx, {} signal threads",
            rank,
            comm.size(),
            handler,
            transmitters.len(),
            receivers.len(),
            signal_handlers.len()
        );

        Ok(Self {
            comm,
            input,
            groups,
            transmitters,
            signal_handlers,
            receivers,
            state: State::Running,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// The private communicator this instance runs on
    pub fn communicator(&self) -> &C {
        &self.comm
    }

    /// Stop every thread of this instance, on every rank.
    ///
    /// Items already on the input queue are delivered before the transmit
    /// threads exit. Output queues must keep being drained until this
    /// returns. Collective: see the [module docs].
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

        // No transmit request is in flight anywhere past this point
        self.comm.barrier()?;
        for _ in 0..self.signal_handlers.len() {
            send_frame(&self.comm, &TxRequestFrame::stop(rank), rank, TX_REQUEST_TAG)?;
        }
        join_all(&mut self.signal_handlers);

        // Every rank runs exactly one receiver per signal handler rank
        if self.groups.is_handler(rank) {
            for _ in 0..self.comm.size() {
                let (request, status): (RxRequestFrame, Status) =
                    receive_frame(&self.comm, Source::Any, RX_REQUEST_TAG)?;
                expect_rank(status.source, request.rank)?;
                send_frame(&self.comm, &RxAckFrame::stop(rank), request.rank, request.ack_tag)?;
            }
        }
        join_all(&mut self.receivers);

        self.comm.barrier()?;
        self.state = State::Stopped;
        debug!("distributor down on rank {}", rank);
        Ok(())
    }
}

impl<T: Transmissable, C: Communicator> Drop for Distributor<T, C> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            fatal("distributor", e);
        }
    }
}

// -----------------------------------------------------------------------------
//              - Threads -
// -----------------------------------------------------------------------------
fn transmit_main<T: Transmissable, C: Communicator>(
    comm: C,
    input: Arc<Queue<T>>,
    handler: Rank,
    ack_tag: Tag,
    data_tag: Tag,
) -> Result<()> {
    let request = TxRequestFrame {
        rank: comm.rank(),
        ack_tag,
        data_tag,
        stop: false,
    };

    while let Message::Value(item) = input.dequeue() {
        send_frame(&comm, &request, handler, TX_REQUEST_TAG)?;
        let (ack, _): (TxAckFrame, Status) = receive_frame(&comm, Source::Rank(handler), ack_tag)?;
        if ack.data_tag != data_tag {
            return Err(Error::InvalidFrame("acknowledge names a foreign data tag"));
        }

        trace!("distributor: {} -> {} on tag {}", comm.rank(), ack.rank, data_tag);
        item.send(&comm, ack.rank, data_tag)?;
    }
    Ok(())
}

fn receive_main<T: Transmissable, C: Communicator>(
    comm: C,
    output: Arc<Queue<T>>,
    handler: Rank,
    ack_tag: Tag,
) -> Result<()> {
    let request = RxRequestFrame {
        rank: comm.rank(),
        ack_tag,
        data_tag: 0,
    };

    loop {
        send_frame(&comm, &request, handler, RX_REQUEST_TAG)?;
        let (ack, _): (RxAckFrame, Status) = receive_frame(&comm, Source::Rank(handler), ack_tag)?;
        if ack.stop {
            break;
        }

        let (item, _) = T::receive(&comm, Source::Rank(ack.rank), ack.data_tag)?;
        output.enqueue(item);
    }
    Ok(())
}

// Pairs the first waiting transmitter with the first waiting receiver
fn signal_handler_main<C: Communicator>(comm: C) -> Result<()> {
    loop {
        let (tx, status): (TxRequestFrame, Status) = receive_frame(&comm, Source::Any, TX_REQUEST_TAG)?;
        expect_rank(status.source, tx.rank)?;
        if tx.stop {
            break;
        }

        let (rx, status): (RxRequestFrame, Status) = receive_frame(&comm, Source::Any, RX_REQUEST_TAG)?;
        expect_rank(status.source, rx.rank)?;

        trace!("signal handler {}: pairing tx {} with rx {}", comm.rank(), tx.rank, rx.rank);
        send_frame(&comm, &TxAckFrame { rank: rx.rank, data_tag: tx.data_tag }, tx.rank, tx.ack_tag)?;
        send_frame(
            &comm,
            &RxAckFrame { rank: tx.rank, data_tag: tx.data_tag, stop: false },
            rx.rank,
            rx.ack_tag,
        )?;
    }
    Ok(())
}

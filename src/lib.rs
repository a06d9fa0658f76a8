#![deny(missing_docs)]
//! # Rank-parallel work distribution
//!
//! Rankwork moves items between bounded in-process queues and across the
//! ranks of a job. A [`Worker`] drains a [`Queue`] on a thread pool; a
//! [`Distributor`], [`Scatterer`] or [`Gatherer`] connects the queues of
//! different ranks over a point-to-point [`Communicator`].
//!
//! ```
//! use std::sync::Arc;
//! use rankwork::prelude::*;
//!
//! let results = LocalCluster::new(2).run(|comm| {
//!     let input = Arc::new(Queue::bounded(8));
//!     let output = Arc::new(Queue::bounded(8));
//!     let config = GathererConfig::default();
//!     let head = comm.rank() == config.head;
//!
//!     let mut gatherer = Gatherer::new(
//!         input.clone(),
//!         if head { Some(output.clone()) } else { None },
//!         &comm,
//!         config,
//!     ).unwrap();
//!
//!     input.enqueue(comm.rank() as u64);
//!     let received = if head { output.dequeue_many(2).len() } else { 0 };
//!     gatherer.shutdown().unwrap();
//!     received
//! });
//!
//! assert_eq!(results, vec![2, 0]);
//! ```
//!
//! [`Worker`]: worker/struct.Worker.html
//! [`Queue`]: sync/queue/struct.Queue.html
//! [`Distributor`]: protocol/distributor/struct.Distributor.html
//! [`Scatterer`]: protocol/scatterer/struct.Scatterer.html
//! [`Gatherer`]: protocol/gatherer/struct.Gatherer.html
//! [`Communicator`]: comm/trait.Communicator.html
#[macro_use] extern crate log;
             extern crate byteorder;
             extern crate crossbeam;
             extern crate parking_lot;

pub mod comm;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod sync;
pub mod tags;
pub mod worker;

/// Everything needed to wire queues, workers and protocols together
pub mod prelude {
    pub use crate::comm::{Communicator, LocalCluster, LocalComm, Rank, Source, Status, Tag, Transmissable};
    pub use crate::config::{DistributorConfig, GathererConfig, ScattererConfig};
    pub use crate::errors::{Error, Result};
    pub use crate::protocol::{Distributor, Gatherer, Scatterer, State};
    pub use crate::sync::queue::Queue;
    pub use crate::sync::semaphore::CountingSemaphore;
    pub use crate::sync::Message;
    pub use crate::worker::{Process, WorkItem, WorkQueue, Worker};
}

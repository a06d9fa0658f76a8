//! # Cross-rank distribution protocols
//!
//! * [`Distributor`]: all-to-all, every rank both sends and receives.
//! * [`Scatterer`]: the head rank fans work out to every rank on demand.
//! * [`Gatherer`]: every rank fans results in to the head rank.
//!
//! Each instance duplicates the communicator it is given, so its tags can
//! not collide with any other instance, and runs its own transmit / receive
//! threads on top of that private context.
//!
//! ## Collective lifetime
//!
//! Construction and [`shutdown`] are collective operations. Every rank of
//! the communicator must construct the instance, and every rank must shut it
//! down, in the same order relative to other collective calls. A rank that
//! never shuts down leaves its peers blocked in shutdown forever.
//! Dropping a running instance performs the shutdown.
//!
//! [`Distributor`]: distributor/struct.Distributor.html
//! [`Scatterer`]: scatterer/struct.Scatterer.html
//! [`Gatherer`]: gatherer/struct.Gatherer.html
//! [`shutdown`]: distributor/struct.Distributor.html#method.shutdown
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crate::errors::{fatal, Error, Result};

pub mod distributor;
pub mod gatherer;
mod groups;
pub mod scatterer;

pub use self::distributor::Distributor;
pub use self::gatherer::Gatherer;
pub use self::groups::SignalGroups;
pub use self::scatterer::Scatterer;

/// Tags a protocol allocates per instance for its threads
pub(crate) const TAG_POOL_SIZE: usize = 1024;

/// Lifecycle of a protocol instance or worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Threads are running and accepting work
    Running,
    /// Shutdown has started
    Draining,
    /// Every thread has been joined
    Stopped,
}

// Background threads have nobody to report errors to: an `Err` or a
// panic is fatal for the process, peers would otherwise wait forever.
pub(crate) fn spawn<F>(name: String, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let origin = name.clone();
    let handle = thread::Builder::new().name(name).spawn(move || {
        let res = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(res) => res,
            Err(payload) => Err(Error::Panicked(panic_message(&*payload))),
        };
        if let Err(e) = res {
            fatal(&origin, e);
        }
    })?;
    Ok(handle)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// A panic on a joined thread is resumed on the caller
pub(crate) fn join_all(handles: &mut Vec<JoinHandle<()>>) {
    for handle in handles.drain(..) {
        if let Err(e) = handle.join() {
            panic::resume_unwind(e);
        }
    }
}

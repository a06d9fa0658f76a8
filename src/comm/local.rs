//! In-process transport: every rank is a thread of the same process.
//!
//! A [`LocalCluster`] of `n` ranks hands out one world [`LocalComm`] per rank.
//! Each rank owns a mailbox per context; a send parks an envelope in the
//! destination mailbox and blocks until a matching receive takes it, which
//! gives the same rendezvous semantics as a synchronous send between
//! processes.
//!
//! [`LocalCluster`]: struct.LocalCluster.html
//! [`LocalComm`]: struct.LocalComm.html
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, Sender};
use parking_lot::{Condvar, Mutex};

use crate::errors::{Error, Result};
use super::{Communicator, Rank, Source, Status, Tag};

type ContextId = u64;

// -----------------------------------------------------------------------------
//              - Mailbox -
// -----------------------------------------------------------------------------
struct Envelope {
    source: Rank,
    tag: Tag,
    payload: Vec<u8>,
    // Completes the rendezvous. Dropping it undelivered
    // wakes the sender with `Disconnected`.
    delivered: Sender<()>,
}

#[derive(Default)]
struct Mailbox {
    pending: Mutex<Vec<Envelope>>,
    arrived: Condvar,
}

#[derive(Default)]
struct BarrierState {
    arrived: u32,
    generation: u64,
}

// -----------------------------------------------------------------------------
//              - Context -
// -----------------------------------------------------------------------------
struct Context {
    id: ContextId,
    mailboxes: Vec<Mailbox>,
    barrier: Mutex<BarrierState>,
    barrier_released: Condvar,
}

impl Context {
    fn new(id: ContextId, size: u32) -> Self {
        Self {
            id,
            mailboxes: (0..size).map(|_| Mailbox::default()).collect(),
            barrier: Mutex::new(BarrierState::default()),
            barrier_released: Condvar::new(),
        }
    }
}

struct Live {
    context: Arc<Context>,
    released: u32,
}

struct Registry {
    next_id: ContextId,
    // (parent, n-th duplicate of the parent) -> child
    children: HashMap<(ContextId, u64), ContextId>,
    live: HashMap<ContextId, Live>,
}

struct Fabric {
    size: u32,
    registry: Mutex<Registry>,
}

impl Fabric {
    fn new(size: u32) -> (Arc<Self>, Arc<Context>) {
        let world = Arc::new(Context::new(0, size));
        let mut live = HashMap::new();
        live.insert(0, Live { context: world.clone(), released: 0 });

        let fabric = Self {
            size,
            registry: Mutex::new(Registry {
                next_id: 1,
                children: HashMap::new(),
                live,
            }),
        };
        (Arc::new(fabric), world)
    }

    // The first rank to duplicate creates the child,
    // the others look it up.
    fn child(&self, parent: ContextId, seq: u64) -> Arc<Context> {
        let mut registry = self.registry.lock();

        if let Some(id) = registry.children.get(&(parent, seq)).cloned() {
            if let Some(live) = registry.live.get(&id) {
                return live.context.clone();
            }
        }

        let id = registry.next_id;
        registry.next_id += 1;
        let context = Arc::new(Context::new(id, self.size));
        registry.children.insert((parent, seq), id);
        registry.live.insert(id, Live { context: context.clone(), released: 0 });
        debug!("context {} duplicated from {}", id, parent);
        context
    }

    fn release(&self, id: ContextId) {
        let mut registry = self.registry.lock();
        let done = match registry.live.get_mut(&id) {
            Some(live) => {
                live.released += 1;
                live.released == self.size
            }
            None => false,
        };

        if done {
            registry.live.remove(&id);
            registry.children.retain(|_, child| *child != id);
            debug!("context {} freed", id);
        }
    }
}

// -----------------------------------------------------------------------------
//              - Membership -
// -----------------------------------------------------------------------------
// One rank's stake in one context. Shared by every clone of a `LocalComm`,
// so the context is released when the last clone on this rank drops.
struct Membership {
    fabric: Arc<Fabric>,
    context: Arc<Context>,
    rank: Rank,
    duplicates: AtomicU64,
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.fabric.release(self.context.id);
    }
}

// -----------------------------------------------------------------------------
//              - LocalComm -
// -----------------------------------------------------------------------------
/// One rank's handle on an in-process communication context.
#[derive(Clone)]
pub struct LocalComm {
    member: Arc<Membership>,
}

impl LocalComm {
    fn join(fabric: Arc<Fabric>, context: Arc<Context>, rank: Rank) -> Self {
        Self {
            member: Arc::new(Membership {
                fabric,
                context,
                rank,
                duplicates: AtomicU64::new(0),
            }),
        }
    }

    /// A context containing only the calling thread as rank 0
    pub fn solo() -> Self {
        let (fabric, world) = Fabric::new(1);
        Self::join(fabric, world, 0)
    }

    fn context(&self) -> &Context {
        &self.member.context
    }

    fn mailbox(&self, rank: Rank) -> Result<&Mailbox> {
        self.context()
            .mailboxes
            .get(rank as usize)
            .ok_or(Error::InvalidRank(rank))
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.member.rank
    }

    fn size(&self) -> u32 {
        self.member.fabric.size
    }

    fn duplicate(&self) -> Result<Self> {
        let seq = self.member.duplicates.fetch_add(1, Ordering::SeqCst);
        let context = self.member.fabric.child(self.context().id, seq);
        Ok(Self::join(self.member.fabric.clone(), context, self.rank()))
    }

    fn barrier(&self) -> Result<()> {
        let context = self.context();
        let mut state = context.barrier.lock();
        let generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.size() {
            state.arrived = 0;
            state.generation += 1;
            context.barrier_released.notify_all();
        } else {
            while state.generation == generation {
                context.barrier_released.wait(&mut state);
            }
        }
        Ok(())
    }

    fn send(&self, buf: &[u8], dest: Rank, tag: Tag) -> Result<()> {
        let mailbox = self.mailbox(dest)?;
        let (delivered, rendezvous) = bounded(1);

        mailbox.pending.lock().push(Envelope {
            source: self.rank(),
            tag,
            payload: buf.to_vec(),
            delivered,
        });
        mailbox.arrived.notify_all();

        trace!("ctx {}: {} -> {} tag {} ({} bytes)", self.context().id, self.rank(), dest, tag, buf.len());
        rendezvous.recv().map_err(|_| Error::Disconnected)
    }

    fn receive(&self, buf: &mut [u8], source: Source, tag: Tag) -> Result<Status> {
        let mailbox = self.mailbox(self.rank())?;
        if let Source::Rank(rank) = source {
            if rank >= self.size() {
                return Err(Error::InvalidRank(rank));
            }
        }

        let envelope = {
            let mut pending = mailbox.pending.lock();
            loop {
                let found = pending
                    .iter()
                    .position(|e| e.tag == tag && source.accepts(e.source));
                match found {
                    Some(pos) => break pending.remove(pos),
                    None => mailbox.arrived.wait(&mut pending),
                }
            }
        };

        if envelope.payload.len() != buf.len() {
            return Err(Error::Truncated {
                expected: buf.len(),
                actual: envelope.payload.len(),
            });
        }

        buf.copy_from_slice(&envelope.payload);
        let _ = envelope.delivered.send(());
        Ok(Status { source: envelope.source, tag })
    }
}

impl Debug for LocalComm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LocalComm")
            .field("context", &self.context().id)
            .field("rank", &self.rank())
            .field("size", &self.size())
            .finish()
    }
}

// -----------------------------------------------------------------------------
//              - LocalCluster -
// -----------------------------------------------------------------------------
/// A job of `size` ranks living in the current process.
///
/// ```
/// use rankwork::comm::{Communicator, LocalCluster};
///
/// let ranks = LocalCluster::new(3).run(|comm| {
///     comm.barrier().unwrap();
///     comm.rank()
/// });
/// assert_eq!(ranks, vec![0, 1, 2]);
/// ```
pub struct LocalCluster {
    comms: Vec<LocalComm>,
}

impl LocalCluster {
    /// Create a cluster with ranks `0..size`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new(size: u32) -> Self {
        assert!(size > 0, "a cluster needs at least one rank");
        let (fabric, world) = Fabric::new(size);
        let comms = (0..size)
            .map(|rank| LocalComm::join(fabric.clone(), world.clone(), rank))
            .collect();
        Self { comms }
    }

    /// Number of ranks
    pub fn size(&self) -> u32 {
        self.comms.len() as u32
    }

    /// Take the world handles, indexed by rank
    pub fn into_comms(self) -> Vec<LocalComm> {
        self.comms
    }

    /// Run `f` once per rank, each on its own thread, and collect the
    /// results in rank order. A panic on any rank is resumed on the caller.
    pub fn run<F, R>(self, f: F) -> Vec<R>
    where
        F: Fn(LocalComm) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        let f = Arc::new(f);
        let handles: Vec<_> = self
            .comms
            .into_iter()
            .map(|comm| {
                let f = f.clone();
                thread::Builder::new()
                    .name(format!("rank-{}", comm.rank()))
                    .spawn(move || f(comm))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle {
                Ok(handle) => match handle.join() {
                    Ok(res) => results.push(res),
                    Err(e) => panic::resume_unwind(e),
                },
                Err(e) => panic!("failed to spawn rank thread: {}", e),
            }
        }
        results
    }
}

impl IntoIterator for LocalCluster {
    type Item = LocalComm;
    type IntoIter = std::vec::IntoIter<LocalComm>;

    fn into_iter(self) -> Self::IntoIter {
        self.comms.into_iter()
    }
}

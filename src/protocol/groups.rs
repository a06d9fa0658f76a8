use crate::comm::Rank;
use crate::errors::{Error, Result};

// -----------------------------------------------------------------------------
//              - Signal groups -
// -----------------------------------------------------------------------------
/// Partition of `size` ranks into matchmaking groups.
///
/// The group size is `size / groups` rounded to the nearest integer (at
/// least one); the first rank of each group hosts the group's signal
/// handlers. When `size` does not divide evenly the last group is
/// smaller or larger than the rest, and the number of groups may differ
/// from the number asked for.
///
/// ```
/// use rankwork::protocol::SignalGroups;
///
/// let groups = SignalGroups::new(5, 2).unwrap();
/// assert_eq!(groups.group_size(), 3);
/// assert_eq!(groups.handler_of(4), 3);
/// assert_eq!(groups.handlers().collect::<Vec<_>>(), vec![0, 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalGroups {
    size: u32,
    group_size: u32,
}

impl SignalGroups {
    /// Split `size` ranks into (about) `groups` groups
    pub fn new(size: u32, groups: u32) -> Result<Self> {
        if groups == 0 {
            return Err(Error::InvalidConfig("at least one signal group is required"));
        }
        let group_size = ((size + groups / 2) / groups).max(1);
        Ok(Self { size, group_size })
    }

    /// Ranks per group
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    /// Actual number of groups
    pub fn group_count(&self) -> u32 {
        (self.size + self.group_size - 1) / self.group_size
    }

    /// Group index of `rank`
    pub fn group_of(&self, rank: Rank) -> u32 {
        rank / self.group_size
    }

    /// Matchmaker rank of the group `rank` belongs to
    pub fn handler_of(&self, rank: Rank) -> Rank {
        self.group_of(rank) * self.group_size
    }

    /// `true` if `rank` hosts signal handlers
    pub fn is_handler(&self, rank: Rank) -> bool {
        rank < self.size && rank % self.group_size == 0
    }

    /// Every matchmaker rank, in ascending order
    pub fn handlers(&self) -> impl Iterator<Item = Rank> {
        (0..self.size).step_by(self.group_size as usize)
    }
}

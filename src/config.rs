//! Constructor-time settings for the distribution protocols.
//!
//! Every rank taking part in a protocol instance must pass the same
//! settings: thread counts determine how many stop messages the collective
//! shutdown exchanges.
use crate::comm::Rank;
use crate::errors::{Error, Result};

fn check_threads(count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::InvalidConfig("thread counts must be at least one"));
    }
    Ok(())
}

fn check_head(head: Rank, size: u32) -> Result<()> {
    if head >= size {
        return Err(Error::InvalidConfig("head rank is outside the communicator"));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
//              - Distributor -
// -----------------------------------------------------------------------------
/// Settings for a [`Distributor`]
///
/// [`Distributor`]: ../protocol/distributor/struct.Distributor.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributorConfig {
    /// Number of matchmaking groups the ranks are split into
    pub signal_groups: u32,
    /// Transmit threads per rank
    pub transmit_threads: usize,
    /// Signal handler threads per matchmaking rank
    pub signal_threads: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            signal_groups: 1,
            transmit_threads: 1,
            signal_threads: 1,
        }
    }
}

impl DistributorConfig {
    /// Set the number of signal groups
    pub fn with_signal_groups(mut self, groups: u32) -> Self {
        self.signal_groups = groups;
        self
    }

    /// Set the number of transmit threads
    pub fn with_transmit_threads(mut self, count: usize) -> Self {
        self.transmit_threads = count;
        self
    }

    /// Set the number of signal handler threads
    pub fn with_signal_threads(mut self, count: usize) -> Self {
        self.signal_threads = count;
        self
    }

    /// Check the settings against a communicator of `size` ranks
    pub fn validate(&self, _size: u32) -> Result<()> {
        if self.signal_groups == 0 {
            return Err(Error::InvalidConfig("at least one signal group is required"));
        }
        check_threads(self.transmit_threads)?;
        check_threads(self.signal_threads)
    }
}

// -----------------------------------------------------------------------------
//              - Scatterer -
// -----------------------------------------------------------------------------
/// Settings for a [`Scatterer`]
///
/// [`Scatterer`]: ../protocol/scatterer/struct.Scatterer.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScattererConfig {
    /// The only rank that transmits
    pub head: Rank,
    /// Transmit threads on the head rank
    pub transmit_threads: usize,
    /// Receive threads per rank
    pub receive_threads: usize,
}

impl Default for ScattererConfig {
    fn default() -> Self {
        Self {
            head: 0,
            transmit_threads: 1,
            receive_threads: 1,
        }
    }
}

impl ScattererConfig {
    /// Set the head rank
    pub fn with_head(mut self, head: Rank) -> Self {
        self.head = head;
        self
    }

    /// Set the number of transmit threads
    pub fn with_transmit_threads(mut self, count: usize) -> Self {
        self.transmit_threads = count;
        self
    }

    /// Set the number of receive threads
    pub fn with_receive_threads(mut self, count: usize) -> Self {
        self.receive_threads = count;
        self
    }

    /// Check the settings against a communicator of `size` ranks
    pub fn validate(&self, size: u32) -> Result<()> {
        check_head(self.head, size)?;
        check_threads(self.transmit_threads)?;
        check_threads(self.receive_threads)
    }
}

// -----------------------------------------------------------------------------
//              - Gatherer -
// -----------------------------------------------------------------------------
/// Settings for a [`Gatherer`]
///
/// [`Gatherer`]: ../protocol/gatherer/struct.Gatherer.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GathererConfig {
    /// The only rank that receives
    pub head: Rank,
    /// Transmit threads per rank
    pub transmit_threads: usize,
    /// Receive threads on the head rank
    pub receive_threads: usize,
}

impl Default for GathererConfig {
    fn default() -> Self {
        Self {
            head: 0,
            transmit_threads: 1,
            receive_threads: 1,
        }
    }
}

impl GathererConfig {
    /// Set the head rank
    pub fn with_head(mut self, head: Rank) -> Self {
        self.head = head;
        self
    }

    /// Set the number of transmit threads
    pub fn with_transmit_threads(mut self, count: usize) -> Self {
        self.transmit_threads = count;
        self
    }

    /// Set the number of receive threads
    pub fn with_receive_threads(mut self, count: usize) -> Self {
        self.receive_threads = count;
        self
    }

    /// Check the settings against a communicator of `size` ranks
    pub fn validate(&self, size: u32) -> Result<()> {
        check_head(self.head, size)?;
        check_threads(self.transmit_threads)?;
        check_threads(self.receive_threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DistributorConfig::default().validate(1).is_ok());
        assert!(ScattererConfig::default().validate(1).is_ok());
        assert!(GathererConfig::default().validate(1).is_ok());
    }

    #[test]
    fn head_outside_communicator() {
        let config = ScattererConfig::default().with_head(4);
        match config.validate(4) {
            Err(Error::InvalidConfig(_)) => {}
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
        assert!(config.validate(5).is_ok());
    }

    #[test]
    fn zero_counts() {
        assert!(DistributorConfig::default().with_signal_groups(0).validate(2).is_err());
        assert!(DistributorConfig::default().with_signal_threads(0).validate(2).is_err());
        assert!(GathererConfig::default().with_receive_threads(0).validate(2).is_err());
    }
}

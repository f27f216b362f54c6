//! Priority policy for transfer scheduling.
//!
//! Lower priority values are dequeued first. A [`Priority`] has two parts:
//!
//! - a tier: chunks of chunked files always come before ranges of
//!   non-chunked files, so bonus content only starts once no installer
//!   chunks remain queued
//! - a value within the tier, assigned by [`PriorityMode`] for chunks and by
//!   range end offset for non-chunked files (smallest files first)

use std::fmt;
use std::str::FromStr;

/// How chunks of different files are ordered against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityMode {
    /// The Nth chunk of every file goes before any (N+1)th chunk.
    #[default]
    Interleaved,
    /// Every chunk of a file goes before the next file starts.
    Sequential,
}

impl FromStr for PriorityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interleaved" => Ok(Self::Interleaved),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!(
                "unknown priority mode '{}' (expected interleaved or sequential)",
                other
            )),
        }
    }
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interleaved => write!(f, "interleaved"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Scheduling tier. Declaration order is dequeue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// A chunk of a file with a chunk table.
    Chunk,
    /// A range of a file without a chunk table.
    Range,
}

/// Priority key of a work item. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority {
    pub tier: Tier,
    pub value: u64,
}

impl Priority {
    /// Priority of a chunk.
    pub fn chunk(value: u64) -> Self {
        Self {
            tier: Tier::Chunk,
            value,
        }
    }

    /// Priority of a non-chunked range ending at `end`.
    pub fn range(end: u64) -> Self {
        Self {
            tier: Tier::Range,
            value: end,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tier {
            Tier::Chunk => write!(f, "Chunk({})", self.value),
            Tier::Range => write!(f, "Range({})", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chunk_outranks_every_range() {
        assert!(Priority::chunk(u64::MAX) < Priority::range(0));
        assert!(Priority::chunk(0) < Priority::chunk(1));
        assert!(Priority::range(9) < Priority::range(999));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("Sequential".parse::<PriorityMode>(), Ok(PriorityMode::Sequential));
        assert_eq!(" interleaved ".parse::<PriorityMode>(), Ok(PriorityMode::Interleaved));
        assert!("random".parse::<PriorityMode>().is_err());
        assert_eq!(PriorityMode::default(), PriorityMode::Interleaved);
    }

    #[test]
    fn test_display() {
        assert_eq!(Priority::chunk(3).to_string(), "Chunk(3)");
        assert_eq!(Priority::range(99).to_string(), "Range(99)");
        assert_eq!(PriorityMode::Sequential.to_string(), "sequential");
    }
}

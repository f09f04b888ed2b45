//! Which open-access license pool should represent a work.

use shelf_catalog::models::{LicensePool, PoolId};
use std::collections::HashMap;
use std::fmt::Debug;

/// Breaks a tie between two open-access pools whose sources have the same
/// priority.
pub trait TieBreak: Debug + Send + Sync {
    /// Whether `challenger` should replace `champion`.
    fn prefers(&self, challenger: &LicensePool, champion: &LicensePool) -> bool;
}

/// For a source that numbers its titles in publication order: between two of
/// its pools, the higher number is the more recent (and better) edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericIdTieBreak {
    pub source: String,
}
impl NumericIdTieBreak {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}
impl TieBreak for NumericIdTieBreak {
    fn prefers(&self, challenger: &LicensePool, champion: &LicensePool) -> bool {
        if challenger.source() != self.source || champion.source() != self.source {
            return false;
        }
        let number = |pool: &LicensePool| pool.identifier().and_then(|identifier| identifier.numeric());
        match (number(challenger), number(champion)) {
            (Some(challenger), Some(champion)) => challenger > champion,
            _ => false,
        }
    }
}

/// How much each source is trusted to provide the best open-access copy.
///
/// Sources without a configured priority rank at zero.
#[derive(Debug, Default)]
pub struct SourcePolicy {
    priorities: HashMap<String, i32>,
    tie_break: Option<Box<dyn TieBreak>>,
}
impl SourcePolicy {
    pub fn new(priorities: HashMap<String, i32>) -> Self {
        Self {
            priorities,
            tie_break: None,
        }
    }

    pub fn with_tie_break(mut self, tie_break: impl TieBreak + 'static) -> Self {
        self.tie_break = Some(Box::new(tie_break));
        self
    }

    pub fn priority(&self, source: &str) -> i32 {
        self.priorities.get(source).copied().unwrap_or_default()
    }

    /// Whether `challenger` should replace `champion` as the representative
    /// open-access pool of a work.
    ///
    /// Only an open-access, unsuppressed pool with an identifier can win at
    /// all. From there, the first rule that applies decides: anything beats
    /// no champion or a suppressed one; a more trusted source wins and a less
    /// trusted one loses; between equally trusted sources only the configured
    /// tie-break can unseat the champion.
    pub fn better_than(&self, challenger: &LicensePool, champion: Option<&LicensePool>) -> bool {
        if challenger.identifier().is_none() || !challenger.is_open_access() || challenger.suppressed {
            return false;
        }
        let Some(champion) = champion else {
            return true;
        };
        if champion.suppressed {
            return true;
        }
        let (ours, theirs) = (self.priority(challenger.source()), self.priority(champion.source()));
        if ours != theirs {
            return ours > theirs;
        }
        self.tie_break.as_ref().is_some_and(|tie_break| tie_break.prefers(challenger, champion))
    }

    /// Runs [`better_than`](Self::better_than) over the pools in order and
    /// returns the last pool standing, if any was eligible.
    pub fn champion<'a>(&self, pools: impl IntoIterator<Item = &'a LicensePool>) -> Option<PoolId> {
        let mut champion: Option<&LicensePool> = None;
        for pool in pools {
            if self.better_than(pool, champion) {
                champion = Some(pool);
            }
        }
        champion.map(LicensePool::id)
    }
}

// Reconciliation decisions
//
// Pure functions over two directory histories. Every filename known to either
// side yields at most one Resolution; converged names yield none.

use super::history::{DirectoryHistory, FileHistory};
use std::collections::BTreeSet;
use std::fmt;

/// One of the two replicas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution classes, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Propagation,
    Deletion,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy the file from `from` onto the other side
    Copy { from: Side },
    /// Remove the file on `on`
    Delete { on: Side },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Only one side has ever seen the file
    Missing,
    /// Deleted on one side while the other side held a version it never saw
    Resurrected,
    /// Deleted on one side after it saw the other side's current version
    Deleted,
    /// One side's current version is in the other's past
    Superseded,
    /// Each side's current version is in the other's past
    BothSuperseded,
    /// Unrelated concurrent edits; later modification time wins
    NewerWins,
}

impl Reason {
    pub fn phase(&self) -> Phase {
        match self {
            Reason::Missing => Phase::Propagation,
            Reason::Resurrected | Reason::Deleted => Phase::Deletion,
            Reason::Superseded | Reason::BothSuperseded | Reason::NewerWins => Phase::Conflict,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Missing => "missing",
            Reason::Resurrected => "resurrected",
            Reason::Deleted => "deleted",
            Reason::Superseded => "superseded",
            Reason::BothSuperseded => "both_superseded",
            Reason::NewerWins => "newer_wins",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with one filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    pub reason: Reason,
    /// Executed in order. Only `BothSuperseded` carries two actions.
    pub actions: Vec<SyncAction>,
}

impl Resolution {
    fn new(name: &str, reason: Reason, action: SyncAction) -> Self {
        Self {
            name: name.to_string(),
            reason,
            actions: vec![action],
        }
    }
}

/// Resolutions for every filename in the union of both histories, ordered by
/// phase and then by name.
pub fn plan(left: &DirectoryHistory, right: &DirectoryHistory) -> Vec<Resolution> {
    let names: BTreeSet<&str> = left.names().chain(right.names()).collect();

    let mut resolutions: Vec<Resolution> = names
        .into_iter()
        .filter_map(|name| resolve(name, left.get(name), right.get(name)))
        .collect();

    // Stable: names stay sorted within a phase
    resolutions.sort_by_key(|r| r.reason.phase());
    resolutions
}

/// Decide what, if anything, `name` needs.
pub fn resolve(
    name: &str,
    left: Option<&FileHistory>,
    right: Option<&FileHistory>,
) -> Option<Resolution> {
    match (left, right) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) if only.is_deleted() => None,
        (Some(_), None) => Some(Resolution::new(name, Reason::Missing, SyncAction::Copy { from: Side::Left })),
        (None, Some(_)) => Some(Resolution::new(name, Reason::Missing, SyncAction::Copy { from: Side::Right })),
        (Some(l), Some(r)) => match (l.is_deleted(), r.is_deleted()) {
            (true, true) => None,
            (true, false) => Some(resolve_deletion(name, Side::Left, l, r)),
            (false, true) => Some(resolve_deletion(name, Side::Right, r, l)),
            (false, false) => resolve_conflict(name, l, r),
        },
    }
}

fn resolve_deletion(
    name: &str,
    deleted_side: Side,
    deleted: &FileHistory,
    surviving: &FileHistory,
) -> Resolution {
    let surviving_side = deleted_side.other();
    let current = surviving.head();

    // The deleting side must have held this content, and the tombstone must
    // not predate the survivor's current entry (a re-creation after the delete).
    if deleted.has_seen(&current.content) && deleted.head().timestamp >= current.timestamp {
        Resolution::new(name, Reason::Deleted, SyncAction::Delete { on: surviving_side })
    } else {
        Resolution::new(name, Reason::Resurrected, SyncAction::Copy { from: surviving_side })
    }
}

fn resolve_conflict(name: &str, left: &FileHistory, right: &FileHistory) -> Option<Resolution> {
    let (Some(left_digest), Some(right_digest)) =
        (left.head().content.digest(), right.head().content.digest())
    else {
        return None;
    };
    if left_digest == right_digest {
        return None;
    }

    let left_is_older = right.superseded(left_digest);
    let right_is_older = left.superseded(right_digest);

    let resolution = match (left_is_older, right_is_older) {
        (true, true) => Resolution {
            name: name.to_string(),
            reason: Reason::BothSuperseded,
            actions: vec![
                SyncAction::Copy { from: Side::Right },
                SyncAction::Copy { from: Side::Left },
            ],
        },
        (true, false) => Resolution::new(name, Reason::Superseded, SyncAction::Copy { from: Side::Right }),
        (false, true) => Resolution::new(name, Reason::Superseded, SyncAction::Copy { from: Side::Left }),
        (false, false) => {
            // Ties go to the left side
            let winner = if right.head().timestamp > left.head().timestamp {
                Side::Right
            } else {
                Side::Left
            };
            Resolution::new(name, Reason::NewerWins, SyncAction::Copy { from: winner })
        }
    };

    Some(resolution)
}

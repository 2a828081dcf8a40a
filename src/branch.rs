//! Compact storage of branch outcome data.
//!
//! Branch data dominates the memory profile of large reports, so each branch is packed into
//! four fixed-width 32-bit fields: line, block, branch index and taken count. The block field
//! uses [`NO_BLOCK`] for "unknown block" (decoded back to −1), and the taken field stores the
//! count plus one so that 0 can mean "never executed".
//!
//! [`NO_BLOCK`]: ./constant.NO_BLOCK.html

use std::u32;

/// Encoded block value meaning "unknown block", decoded back to −1.
pub const NO_BLOCK: u32 = u32::MAX;

/// Number of 32-bit fields per branch.
const STRIDE: usize = 4;

/// One branch outcome.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BranchRecord {
    /// Source line the branch originates from.
    pub line: u32,
    /// Basic block id, −1 when the report did not name one.
    pub block: i32,
    /// Branch index within the block.
    pub branch: u32,
    /// Number of times the branch was taken, `None` when the branch was never executed.
    pub taken: Option<u32>,
}

/// A flat, fixed-stride array of encoded branch records.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BranchVector {
    fields: Vec<u32>,
}

impl BranchVector {
    /// Creates an empty vector.
    pub fn new() -> BranchVector {
        BranchVector::default()
    }

    /// Number of branches stored.
    pub fn len(&self) -> usize {
        self.fields.len() / STRIDE
    }

    /// Checks whether no branch is stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Appends one branch record.
    ///
    /// The taken field stores the count plus one, so `u32::MAX` is not representable and
    /// saturates: a record pushed with `taken == Some(u32::MAX)` decodes as `u32::MAX - 1`.
    pub fn push(&mut self, record: BranchRecord) {
        self.fields.push(record.line);
        self.fields.push(if record.block < 0 { NO_BLOCK } else { record.block as u32 });
        self.fields.push(record.branch);
        self.fields.push(match record.taken {
            Some(count) => count.saturating_add(1),
            None => 0,
        });
    }

    /// Iterates over the decoded branch records.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = BranchRecord> + 'a {
        self.fields.chunks(STRIDE).map(|chunk| BranchRecord {
            line: chunk[0],
            block: if chunk[1] == NO_BLOCK { -1 } else { chunk[1] as i32 },
            branch: chunk[2],
            taken: if chunk[3] == 0 { None } else { Some(chunk[3] - 1) },
        })
    }

    /// Number of branches with a taken count above zero.
    pub fn hit_count(&self) -> usize {
        self.iter().filter(|record| record.taken.map_or(false, |taken| taken > 0)).count()
    }
}

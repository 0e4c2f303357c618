use std::collections::HashMap;
use std::hash::Hash;

use similar::DiffOp;

/// `new` sequences at least this long drop their popular elements from the
/// match index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// `old[old_index..old_index + len] == new[new_index..new_index + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    pub old_index: usize,
    pub new_index: usize,
    pub len: usize,
}

/// Ratcliff/Obershelp matching: take the longest matching block, then recurse
/// on the unmatched spans to its left and right.
///
/// This is not a minimal edit script. On reordered input (e.g. "yellow lorry
/// red lorry" against "red lorry yellow lorry") it matches fewer elements than
/// a longest common subsequence would, which keeps reorderings from scoring as
/// near-matches. Opcodes are reported as `similar::DiffOp`.
pub struct SequenceMatcher<'a, T> {
    old: &'a [T],
    new: &'a [T],
    positions: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(old: &'a [T], new: &'a [T]) -> Self {
        let mut positions: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, item) in new.iter().enumerate() {
            positions.entry(item).or_default().push(j);
        }
        if new.len() >= AUTOJUNK_MIN_LEN {
            let popular = new.len() / 100 + 1;
            positions.retain(|_, at| at.len() <= popular);
        }
        Self { old, new, positions }
    }

    /// Longest block inside `old[alo..ahi]` x `new[blo..bhi]`; the earliest in
    /// `old`, then in `new`, among equally long blocks.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchingBlock {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0usize);
        let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(at) = self.positions.get(&self.old[i]) {
                for &j in at {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_ending_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            run_ending_at = next;
        }

        // Popular elements are missing from the index but may still extend a block.
        while best_i > alo && best_j > blo && self.old[best_i - 1] == self.new[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.old[best_i + best_len] == self.new[best_j + best_len]
        {
            best_len += 1;
        }

        MatchingBlock {
            old_index: best_i,
            new_index: best_j,
            len: best_len,
        }
    }

    /// Matching blocks in order, adjacent blocks merged, terminated by a
    /// zero-length block at `(old.len(), new.len())`.
    pub fn matching_blocks(&self) -> Vec<MatchingBlock> {
        let mut pending = vec![(0, self.old.len(), 0, self.new.len())];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.len == 0 {
                continue;
            }
            if alo < m.old_index && blo < m.new_index {
                pending.push((alo, m.old_index, blo, m.new_index));
            }
            if m.old_index + m.len < ahi && m.new_index + m.len < bhi {
                pending.push((m.old_index + m.len, ahi, m.new_index + m.len, bhi));
            }
            blocks.push(m);
        }
        blocks.sort_by_key(|m| (m.old_index, m.new_index));

        let mut merged: Vec<MatchingBlock> = Vec::with_capacity(blocks.len() + 1);
        for m in blocks {
            match merged.last_mut() {
                Some(last)
                    if last.old_index + last.len == m.old_index
                        && last.new_index + last.len == m.new_index =>
                {
                    last.len += m.len;
                }
                _ => merged.push(m),
            }
        }
        merged.push(MatchingBlock {
            old_index: self.old.len(),
            new_index: self.new.len(),
            len: 0,
        });
        merged
    }

    /// Opcodes covering both sequences. A gap on both sides between two
    /// blocks is one `Replace`.
    pub fn ops(&self) -> Vec<DiffOp> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);
        for m in self.matching_blocks() {
            match (i < m.old_index, j < m.new_index) {
                (true, true) => ops.push(DiffOp::Replace {
                    old_index: i,
                    old_len: m.old_index - i,
                    new_index: j,
                    new_len: m.new_index - j,
                }),
                (true, false) => ops.push(DiffOp::Delete {
                    old_index: i,
                    old_len: m.old_index - i,
                    new_index: j,
                }),
                (false, true) => ops.push(DiffOp::Insert {
                    old_index: i,
                    new_index: j,
                    new_len: m.new_index - j,
                }),
                (false, false) => {}
            }
            if m.len > 0 {
                ops.push(DiffOp::Equal {
                    old_index: m.old_index,
                    new_index: m.new_index,
                    len: m.len,
                });
            }
            i = m.old_index + m.len;
            j = m.new_index + m.len;
        }
        ops
    }

    /// `2 * matched / (|old| + |new|)`; 1 when both are empty.
    pub fn ratio(&self) -> f64 {
        let total = self.old.len() + self.new.len();
        if total == 0 {
            return 1.0;
        }
        let matched: usize = self.matching_blocks().iter().map(|m| m.len).sum();
        2.0 * matched as f64 / total as f64
    }
}

//! Longest-common-subsequence over element fingerprints.
//!
//! Produces the block list the emitter walks: `equal` spans to recurse
//! into, and `replace`/`insert`/`delete` spans to rewrite. Adjacent
//! delete+insert pairs collapse into a replace.

use std::ops::Range;

/// One span of the sequence-level diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block {
    /// `len` elements pairing base\[b\] with desired\[d\] one-to-one.
    Equal { b: usize, d: usize, len: usize },
    /// Base span rewritten into desired span.
    Replace { base: Range<usize>, desired: Range<usize> },
    /// Desired span inserted before base index `at`.
    Insert { at: usize, desired: Range<usize> },
    /// Base span deleted. `at` is the desired-side cursor position.
    Delete { base: Range<usize>, at: usize },
}

/// Diff two fingerprint sequences into a block list.
pub(crate) fn diff_blocks(base: &[u64], desired: &[u64]) -> Vec<Block> {
    let n = base.len();
    let m = desired.len();
    // Classic DP table of LCS lengths.
    let mut table = vec![0usize; (n + 1) * (m + 1)];
    let idx = |i: usize, j: usize| i * (m + 1) + j;
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[idx(i, j)] = if base[i] == desired[j] {
                table[idx(i + 1, j + 1)] + 1
            } else {
                table[idx(i + 1, j)].max(table[idx(i, j + 1)])
            };
        }
    }

    let mut blocks: Vec<Block> = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let mut pending_base = 0usize..0;
    let mut pending_desired = 0usize..0;
    let mut flush =
        |blocks: &mut Vec<Block>, bspan: &mut Range<usize>, dspan: &mut Range<usize>| {
            let (b, d) = (bspan.clone(), dspan.clone());
            if !b.is_empty() && !d.is_empty() {
                blocks.push(Block::Replace { base: b, desired: d });
            } else if !b.is_empty() {
                blocks.push(Block::Delete {
                    base: b,
                    at: dspan.end,
                });
            } else if !d.is_empty() {
                blocks.push(Block::Insert {
                    at: bspan.end,
                    desired: d,
                });
            }
            *bspan = bspan.end..bspan.end;
            *dspan = dspan.end..dspan.end;
        };

    while i < n || j < m {
        if i < n && j < m && base[i] == desired[j] {
            flush(&mut blocks, &mut pending_base, &mut pending_desired);
            let start = (i, j);
            let mut len = 0;
            while i < n && j < m && base[i] == desired[j] {
                i += 1;
                j += 1;
                len += 1;
            }
            blocks.push(Block::Equal {
                b: start.0,
                d: start.1,
                len,
            });
            pending_base = i..i;
            pending_desired = j..j;
        } else if j < m && (i == n || table[idx(i, j + 1)] >= table[idx(i + 1, j)]) {
            pending_desired.end = j + 1;
            j += 1;
        } else {
            pending_base.end = i + 1;
            i += 1;
        }
    }
    flush(&mut blocks, &mut pending_base, &mut pending_desired);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(values: &[u64]) -> Vec<u64> {
        values.to_vec()
    }

    #[test]
    fn identical_sequences_are_one_equal_block() {
        let blocks = diff_blocks(&fp(&[1, 2, 3]), &fp(&[1, 2, 3]));
        assert_eq!(blocks, vec![Block::Equal { b: 0, d: 0, len: 3 }]);
    }

    #[test]
    fn middle_change_is_a_replace() {
        let blocks = diff_blocks(&fp(&[1, 2, 3]), &fp(&[1, 9, 3]));
        assert_eq!(
            blocks,
            vec![
                Block::Equal { b: 0, d: 0, len: 1 },
                Block::Replace {
                    base: 1..2,
                    desired: 1..2
                },
                Block::Equal { b: 2, d: 2, len: 1 },
            ]
        );
    }

    #[test]
    fn pure_insert_and_delete() {
        let blocks = diff_blocks(&fp(&[1, 3]), &fp(&[1, 2, 3]));
        assert_eq!(
            blocks,
            vec![
                Block::Equal { b: 0, d: 0, len: 1 },
                Block::Insert {
                    at: 1,
                    desired: 1..2
                },
                Block::Equal { b: 1, d: 2, len: 1 },
            ]
        );

        let blocks = diff_blocks(&fp(&[1, 2, 3]), &fp(&[1, 3]));
        assert_eq!(
            blocks,
            vec![
                Block::Equal { b: 0, d: 0, len: 1 },
                Block::Delete { base: 1..2, at: 1 },
                Block::Equal { b: 1, d: 1, len: 1 },
            ]
        );
    }

    #[test]
    fn multiple_disjoint_regions() {
        let blocks = diff_blocks(&fp(&[1, 2, 3, 4, 5]), &fp(&[1, 9, 3, 8, 5]));
        assert_eq!(
            blocks,
            vec![
                Block::Equal { b: 0, d: 0, len: 1 },
                Block::Replace {
                    base: 1..2,
                    desired: 1..2
                },
                Block::Equal { b: 2, d: 2, len: 1 },
                Block::Replace {
                    base: 3..4,
                    desired: 3..4
                },
                Block::Equal { b: 4, d: 4, len: 1 },
            ]
        );
    }

    #[test]
    fn empty_sides() {
        assert_eq!(diff_blocks(&[], &[]), vec![]);
        assert_eq!(
            diff_blocks(&[], &fp(&[7])),
            vec![Block::Insert {
                at: 0,
                desired: 0..1
            }]
        );
        assert_eq!(
            diff_blocks(&fp(&[7]), &[]),
            vec![Block::Delete { base: 0..1, at: 0 }]
        );
    }
}

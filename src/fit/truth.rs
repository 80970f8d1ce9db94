//! Truth matching of jet-role assignments in simulated events.
//!
//! Jets carry signed parton labels: `±1` for b quarks and `±2` for light quarks from
//! the hadronic W. The correct assignment is a leptonic-side b with label `-1`, a
//! hadronic b with `+1` and both W jets with `+2`, or the charge conjugate.

use serde::Serialize;

use crate::domain::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TruthAssignment {
    pub o: usize,
    pub b: usize,
    pub i: usize,
    pub j: usize,
}

impl TruthAssignment {
    pub fn matches(&self, cand: &Candidate) -> bool {
        self.o == cand.o && self.b == cand.b && self.i == cand.i && self.j == cand.j
    }
}

fn is_truth_pattern(o: i32, b: i32, i: i32, j: i32) -> bool {
    (o == -1 && b == 1 && i == 2 && j == 2) || (o == 1 && b == -1 && i == -2 && j == -2)
}

/// First assignment matching the parton labels.
///
/// Search order is `o`, then `b`, then `i`, then `j > i`; only the first hit counts
/// when the labels admit several.
pub fn find_truth_assignment(parton: &[i32]) -> Option<TruthAssignment> {
    let n = parton.len();
    for o in 0..n {
        for b in 0..n {
            for i in 0..n {
                for j in (i + 1)..n {
                    if is_truth_pattern(parton[o], parton[b], parton[i], parton[j]) {
                        return Some(TruthAssignment { o, b, i, j });
                    }
                }
            }
        }
    }
    None
}

/// Position (0-based) of the truth-matched candidate in the list, if any.
pub fn truth_rank(candidates: &[Candidate]) -> Option<usize> {
    candidates.iter().position(|c| c.truth_match)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_either_charge() {
        let t = find_truth_assignment(&[2, -1, 0, 1, 2]).unwrap();
        assert_eq!(t, TruthAssignment { o: 1, b: 3, i: 0, j: 4 });

        let t = find_truth_assignment(&[1, -2, -2, -1]).unwrap();
        assert_eq!(t, TruthAssignment { o: 0, b: 3, i: 1, j: 2 });
    }

    #[test]
    fn incomplete_labels_have_no_assignment() {
        assert!(find_truth_assignment(&[1, -1, 2, 0, 0]).is_none());
        assert!(find_truth_assignment(&[]).is_none());
        // Mixed charges do not form a valid assignment.
        assert!(find_truth_assignment(&[-1, 1, 2, -2]).is_none());
    }

    #[test]
    fn first_match_wins_when_ambiguous() {
        // Three +2 jets: the first pair in search order is (2, 3).
        let t = find_truth_assignment(&[-1, 1, 2, 2, 2]).unwrap();
        assert_eq!((t.i, t.j), (2, 3));
    }
}

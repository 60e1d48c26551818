//! Ambiguity and oscillation detectors.
//!
//! Pure functions over the recent pose window and the object list. None of
//! them keeps state; given the same inputs they always give the same answer,
//! and a window that is too short simply reports "not triggered".
//!
//! # Example
//!
//! ```rust
//! use grasp_runtime::detectors::yaw_oscillation;
//! use grasp_types::{Cell, Pose, Yaw, ZBand};
//!
//! let cell = Cell::new(1, 1);
//! let hist: Vec<Pose> = [Yaw::N, Yaw::E, Yaw::N, Yaw::E, Yaw::N, Yaw::E]
//!     .into_iter()
//!     .map(|yaw| Pose::new(cell, yaw, ZBand::Low))
//!     .collect();
//!
//! let osc = yaw_oscillation(&hist).unwrap();
//! assert_eq!((osc.cell, osc.yaw_a, osc.yaw_b), (cell, Yaw::N, Yaw::E));
//! ```

use grasp_types::{Cell, HISTORY_WINDOW, Object, Pose, Yaw, manhattan_distance};

/// Poses the dominant cell must account for before yaw thrashing counts.
const DOMINANT_CELL_MIN: usize = 4;
/// Raw consecutive yaw changes needed for a yaw oscillation.
const MIN_YAW_SWITCHES: usize = 3;
/// Appearances of each cell needed for a cell oscillation.
const MIN_CELL_VISITS: usize = 2;
/// Direct hops between the two cells needed for a cell oscillation.
const MIN_CELL_TRANSITIONS: usize = 2;

/// A triggered yaw oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YawOscillation {
    /// Most frequent cell in the window.
    pub cell: Cell,
    /// First yaw of the collapsed sequence.
    pub yaw_a: Yaw,
    /// Second yaw of the collapsed sequence.
    pub yaw_b: Yaw,
}

/// The two closest free candidates, ranked by `(distance, id)`.
///
/// Only objects that are listed in `candidates` and not held qualify.
/// Returns `None` when fewer than two do.
pub fn top_two_candidates<'a>(
    objects: &'a [Object],
    candidates: &[String],
    gripper: Cell,
) -> Option<(&'a Object, &'a Object)> {
    let mut available: Vec<(u32, &Object)> = objects
        .iter()
        .filter(|o| !o.is_held && candidates.iter().any(|c| *c == o.id))
        .map(|o| (manhattan_distance(gripper, o.cell), o))
        .collect();
    if available.len() < 2 {
        return None;
    }
    available.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.id.cmp(&b.id)));
    Some((available[0].1, available[1].1))
}

/// Most frequent cell in `hist` with its count; ties go to the cell seen
/// first.
fn dominant_cell(hist: &[Pose]) -> Option<(Cell, usize)> {
    let mut counts: Vec<(Cell, usize)> = Vec::new();
    for pose in hist {
        match counts.iter_mut().find(|(c, _)| *c == pose.cell) {
            Some((_, n)) => *n += 1,
            None => counts.push((pose.cell, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(Cell, usize)>, (cell, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((cell, n)),
        })
}

/// Detect a gripper that sits on one cell while flipping between two yaws.
///
/// Triggers when the window holds at least six poses, one cell accounts for
/// at least four of them, the yaw sequence (with consecutive repeats merged)
/// uses exactly two distinct values, and the raw sequence changes yaw at
/// least three times.
pub fn yaw_oscillation(hist: &[Pose]) -> Option<YawOscillation> {
    if hist.len() < HISTORY_WINDOW {
        return None;
    }
    let (cell, count) = dominant_cell(hist)?;
    if count < DOMINANT_CELL_MIN {
        return None;
    }

    let mut collapsed: Vec<Yaw> = Vec::new();
    for pose in hist {
        if collapsed.last() != Some(&pose.yaw) {
            collapsed.push(pose.yaw);
        }
    }
    let mut distinct = collapsed.clone();
    distinct.sort_by_key(|y| y.to_string());
    distinct.dedup();
    if distinct.len() != 2 {
        return None;
    }

    let switches = hist.windows(2).filter(|w| w[0].yaw != w[1].yaw).count();
    if switches < MIN_YAW_SWITCHES {
        return None;
    }
    Some(YawOscillation {
        cell,
        yaw_a: collapsed[0],
        yaw_b: collapsed[1],
    })
}

/// Detect back-and-forth motion between `cell_a` and `cell_b`.
///
/// Both cells must appear at least twice and the window must contain at
/// least two direct hops between them. Hops through any other cell are not
/// counted.
pub fn cell_oscillation(hist: &[Pose], cell_a: Cell, cell_b: Cell) -> bool {
    if hist.len() < HISTORY_WINDOW || cell_a == cell_b {
        return false;
    }
    let visits = |cell: Cell| hist.iter().filter(|p| p.cell == cell).count();
    if visits(cell_a) < MIN_CELL_VISITS || visits(cell_b) < MIN_CELL_VISITS {
        return false;
    }
    let pair = |c: Cell| c == cell_a || c == cell_b;
    let transitions = hist
        .windows(2)
        .filter(|w| w[0].cell != w[1].cell && pair(w[0].cell) && pair(w[1].cell))
        .count();
    transitions >= MIN_CELL_TRANSITIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_types::ZBand;

    fn cell(s: &str) -> Cell {
        s.parse().unwrap()
    }

    fn obj(id: &str, at: &str, held: bool) -> Object {
        Object {
            id: id.into(),
            label: format!("label_{id}"),
            cell: cell(at),
            yaw: Yaw::N,
            is_held: held,
        }
    }

    fn at(cells: &[&str]) -> Vec<Pose> {
        cells
            .iter()
            .map(|c| Pose::new(cell(c), Yaw::N, ZBand::Mid))
            .collect()
    }

    fn turning(c: &str, yaws: &[Yaw]) -> Vec<Pose> {
        yaws.iter().map(|y| Pose::new(cell(c), *y, ZBand::Low)).collect()
    }

    // ------------------------------------------------------------------ top two

    #[test]
    fn top_two_ranks_by_distance_then_id() {
        let objects = vec![obj("o2", "B3", false), obj("o1", "B1", false), obj("o0", "C3", false)];
        let cands: Vec<String> = vec!["o0".into(), "o1".into(), "o2".into()];
        let (a, b) = top_two_candidates(&objects, &cands, cell("B2")).unwrap();
        assert_eq!((a.id.as_str(), b.id.as_str()), ("o1", "o2"));
    }

    #[test]
    fn top_two_skips_held_and_non_candidates() {
        let objects = vec![obj("o0", "B1", true), obj("o1", "B3", false), obj("o2", "A2", false)];
        let cands: Vec<String> = vec!["o0".into(), "o1".into()];
        assert!(top_two_candidates(&objects, &cands, cell("B2")).is_none());
    }

    // ------------------------------------------------------------------ yaw

    #[test]
    fn yaw_oscillation_needs_six_poses() {
        let hist = turning("B2", &[Yaw::N, Yaw::E, Yaw::N, Yaw::E, Yaw::N]);
        assert!(yaw_oscillation(&hist).is_none());
    }

    #[test]
    fn yaw_oscillation_reports_first_two_collapsed_yaws() {
        let hist = turning("B2", &[Yaw::W, Yaw::W, Yaw::S, Yaw::W, Yaw::S, Yaw::W]);
        let osc = yaw_oscillation(&hist).unwrap();
        assert_eq!(osc.cell, cell("B2"));
        assert_eq!((osc.yaw_a, osc.yaw_b), (Yaw::W, Yaw::S));
    }

    #[test]
    fn three_yaws_do_not_count() {
        let hist = turning("B2", &[Yaw::N, Yaw::E, Yaw::S, Yaw::E, Yaw::N, Yaw::E]);
        assert!(yaw_oscillation(&hist).is_none());
    }

    #[test]
    fn too_few_switches_do_not_count() {
        let hist = turning("B2", &[Yaw::N, Yaw::N, Yaw::E, Yaw::E, Yaw::N, Yaw::N]);
        assert!(yaw_oscillation(&hist).is_none());
    }

    #[test]
    fn dominant_cell_must_hold_four_poses() {
        let mut hist = turning("B2", &[Yaw::N, Yaw::E, Yaw::N]);
        hist.extend(turning("B3", &[Yaw::E, Yaw::N, Yaw::E]));
        assert!(yaw_oscillation(&hist).is_none());
    }

    #[test]
    fn dominant_cell_ties_go_to_first_seen() {
        let hist = at(&["C1", "A1", "A1", "C1"]);
        assert_eq!(dominant_cell(&hist), Some((cell("C1"), 2)));
    }

    // ------------------------------------------------------------------ cells

    #[test]
    fn cell_oscillation_counts_direct_hops() {
        let hist = at(&["A1", "B2", "B3", "B2", "B3", "B2"]);
        assert!(cell_oscillation(&hist, cell("B2"), cell("B3")));
        assert!(cell_oscillation(&hist, cell("B3"), cell("B2")));
    }

    #[test]
    fn hops_through_other_cells_are_ignored() {
        let hist = at(&["B2", "C1", "B3", "C1", "B2", "B3"]);
        assert!(!cell_oscillation(&hist, cell("B2"), cell("B3")));
    }

    #[test]
    fn cell_oscillation_needs_two_visits_each() {
        let hist = at(&["B2", "B2", "B2", "B2", "B2", "B3"]);
        assert!(!cell_oscillation(&hist, cell("B2"), cell("B3")));
    }
}

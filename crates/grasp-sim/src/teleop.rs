//! Human teleoperation model.
//!
//! Between assistant actions the simulated human keeps driving the gripper
//! toward whatever they currently want. The model is intentionally
//! imperfect so that generated traces contain the situations the oracle is
//! meant to catch:
//!
//! - **wander**: while still travelling, with probability `wander_prob` the
//!   human steps to a random neighbouring cell instead of closing in, which
//!   produces back-and-forth motion between nearby objects;
//! - **yaw struggle**: a struggling human who has reached the right cell
//!   keeps flipping between two wrong yaw bins instead of converging on the
//!   object's yaw.

use grasp_types::{Cell, Object, Pose, Yaw, ZBand, manhattan_distance};
use rand::Rng;
use rand::seq::SliceRandom;

/// `true` with probability `p`.
pub fn roll<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen_range(0.0..1.0) < p
}

/// Height band implied by the distance between the gripper and its goal.
pub fn band_for(cell: Cell, goal: Cell) -> ZBand {
    match manhattan_distance(cell, goal) {
        0 => ZBand::Low,
        1 => ZBand::Mid,
        _ => ZBand::High,
    }
}

/// One grid step from `from` toward `to`, along the axis with the larger
/// remaining delta (rows win ties).
pub fn step_toward(from: Cell, to: Cell) -> Cell {
    let dr = from.row.abs_diff(to.row);
    let dc = from.col.abs_diff(to.col);
    if dr == 0 && dc == 0 {
        return from;
    }
    if dr >= dc {
        let row = if to.row > from.row { from.row + 1 } else { from.row - 1 };
        Cell::new(row, from.col)
    } else {
        let col = if to.col > from.col { from.col + 1 } else { from.col - 1 };
        Cell::new(from.row, col)
    }
}

/// In-bounds 4-neighbourhood of `cell`.
pub fn neighbours(cell: Cell, rows: u8, cols: u8) -> Vec<Cell> {
    let mut out = Vec::with_capacity(4);
    if cell.row > 0 {
        out.push(Cell::new(cell.row - 1, cell.col));
    }
    if cell.row + 1 < rows {
        out.push(Cell::new(cell.row + 1, cell.col));
    }
    if cell.col > 0 {
        out.push(Cell::new(cell.row, cell.col - 1));
    }
    if cell.col + 1 < cols {
        out.push(Cell::new(cell.row, cell.col + 1));
    }
    out
}

/// Per-episode teleoperation behaviour.
#[derive(Debug, Clone)]
pub struct Teleop {
    pub wander_prob: f64,
    pub struggling: bool,
    /// Goal cell plus the two wrong yaws the struggling human flips between.
    struggle_pair: Option<(Cell, Yaw, Yaw)>,
}

impl Teleop {
    pub fn new(wander_prob: f64, struggling: bool) -> Self {
        Self {
            wander_prob,
            struggling,
            struggle_pair: None,
        }
    }

    /// Compute the pose after one human nudge toward `target`.
    pub fn nudge<R: Rng + ?Sized>(
        &mut self,
        pose: Pose,
        target: &Object,
        rows: u8,
        cols: u8,
        rng: &mut R,
    ) -> Pose {
        if pose.cell != target.cell {
            let cell = if roll(rng, self.wander_prob) {
                neighbours(pose.cell, rows, cols)
                    .choose(rng)
                    .copied()
                    .unwrap_or(pose.cell)
            } else {
                step_toward(pose.cell, target.cell)
            };
            return Pose::new(cell, pose.yaw, band_for(cell, target.cell));
        }
        if pose.yaw == target.yaw {
            return Pose::new(pose.cell, pose.yaw, ZBand::Low);
        }
        let yaw = if self.struggling {
            self.struggle_yaw(pose.yaw, target, rng)
        } else {
            pose.yaw.step_toward(target.yaw)
        };
        Pose::new(pose.cell, yaw, ZBand::Low)
    }

    fn struggle_yaw<R: Rng + ?Sized>(&mut self, current: Yaw, target: &Object, rng: &mut R) -> Yaw {
        let (a, b) = match self.struggle_pair {
            Some((cell, a, b)) if cell == target.cell && a != target.yaw && b != target.yaw => (a, b),
            _ => {
                let others: Vec<Yaw> = Yaw::ALL
                    .iter()
                    .copied()
                    .filter(|y| *y != current && *y != target.yaw)
                    .collect();
                let b = others.choose(rng).copied().unwrap_or(current);
                self.struggle_pair = Some((target.cell, current, b));
                (current, b)
            }
        };
        if current == a { b } else { a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn mug_at(cell: &str, yaw: Yaw) -> Object {
        Object {
            id: "o0".into(),
            label: "mug".into(),
            cell: cell.parse().unwrap(),
            yaw,
            is_held: false,
        }
    }

    #[test]
    fn step_prefers_rows_on_ties() {
        let from: Cell = "A1".parse().unwrap();
        assert_eq!(step_toward(from, "C3".parse().unwrap()).to_string(), "B1");
        assert_eq!(step_toward(from, "A3".parse().unwrap()).to_string(), "A2");
        assert_eq!(step_toward(from, from), from);
    }

    #[test]
    fn neighbours_respect_bounds() {
        assert_eq!(neighbours(Cell::new(0, 0), 3, 3).len(), 2);
        assert_eq!(neighbours(Cell::new(1, 1), 3, 3).len(), 4);
        assert!(neighbours(Cell::new(0, 0), 1, 1).is_empty());
    }

    #[test]
    fn steady_human_closes_in_and_aligns() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut teleop = Teleop::new(0.0, false);
        let target = mug_at("C3", Yaw::S);
        let mut pose = Pose::new("A1".parse().unwrap(), Yaw::N, ZBand::High);
        for _ in 0..8 {
            pose = teleop.nudge(pose, &target, 5, 5, &mut rng);
        }
        assert_eq!(pose.cell, target.cell);
        assert_eq!(pose.yaw, Yaw::S);
        assert_eq!(pose.z, ZBand::Low);
    }

    #[test]
    fn struggling_human_flips_between_two_wrong_yaws() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut teleop = Teleop::new(0.0, true);
        let target = mug_at("B2", Yaw::S);
        let mut pose = Pose::new("B2".parse().unwrap(), Yaw::N, ZBand::Low);
        let mut seen = Vec::new();
        for _ in 0..6 {
            pose = teleop.nudge(pose, &target, 5, 5, &mut rng);
            seen.push(pose.yaw);
        }
        assert!(seen.iter().all(|y| *y != Yaw::S));
        assert!(seen.windows(2).all(|w| w[0] != w[1]));
        let mut distinct = seen.clone();
        distinct.sort_by_key(|y| y.to_string());
        distinct.dedup();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn band_tracks_distance() {
        let goal: Cell = "B2".parse().unwrap();
        assert_eq!(band_for(goal, goal), ZBand::Low);
        assert_eq!(band_for("B3".parse().unwrap(), goal), ZBand::Mid);
        assert_eq!(band_for("D4".parse().unwrap(), goal), ZBand::High);
    }
}

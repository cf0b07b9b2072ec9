//! Admissible distance estimators.

use serde::{Deserialize, Serialize};

use crate::core::Int3;

/// Heuristic used to order the open list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Dijkstra (ties broken by insertion order)
    None,
    /// |dx| + |dy| + |dz|
    Manhattan,
    /// Octile distance in the X/Y plane plus |dz|
    DiagonalManhattan,
    /// Straight-line distance
    #[default]
    Euclidean,
}

impl Heuristic {
    /// Raw estimate between two points in integer units (floored)
    pub fn estimate(&self, a: Int3, b: Int3) -> f64 {
        let dx = (a.x as f64 - b.x as f64).abs();
        let dy = (a.y as f64 - b.y as f64).abs();
        let dz = (a.z as f64 - b.z as f64).abs();
        match self {
            Heuristic::None => 0.0,
            Heuristic::Manhattan => dx + dy + dz,
            Heuristic::DiagonalManhattan => {
                let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
                hi + (std::f64::consts::SQRT_2 - 1.0) * lo + dz
            }
            Heuristic::Euclidean => (dx * dx + dy * dy + dz * dz).sqrt(),
        }
    }

    /// True unless this is [`Heuristic::None`]
    pub fn is_active(&self) -> bool {
        !matches!(self, Heuristic::None)
    }
}

/// Heuristic bound to a target point.
#[derive(Clone, Copy, Debug)]
pub struct HeuristicObjective {
    heuristic: Heuristic,
    scale: f32,
    target: Int3,
}

impl HeuristicObjective {
    pub fn new(heuristic: Heuristic, scale: f32, target: Int3) -> Self {
        Self {
            heuristic,
            scale: scale.max(0.0),
            target,
        }
    }

    /// H-score of a position
    #[inline]
    pub fn estimate(&self, position: Int3) -> u32 {
        let h = self.heuristic.estimate(position, self.target) * self.scale as f64;
        h.min(u32::MAX as f64) as u32
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    pub fn target(&self) -> Int3 {
        self.target
    }
}

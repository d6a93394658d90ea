// Cycle-set navigation: ordering, rank and closest-match lookups
use serde::{Deserialize, Serialize};
use std::fmt;

use super::battery::CycleSummary;

/// Ascending, de-duplicated cycle numbers of a cycle list.
/// Server order is not guaranteed, and numbers need not be contiguous.
pub fn sorted_cycle_numbers(cycles: &[CycleSummary]) -> Vec<u32> {
    let mut numbers: Vec<u32> = cycles.iter().map(|c| c.cycle_number).collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

/// The canonical first cycle: the lowest cycle number, not the first entry.
pub fn first_cycle(cycles: &[CycleSummary]) -> Option<u32> {
    cycles.iter().map(|c| c.cycle_number).min()
}

pub fn contains_cycle(cycles: &[CycleSummary], cycle: u32) -> bool {
    cycles.iter().any(|c| c.cycle_number == cycle)
}

/// 1-based rank of a cycle within the available set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub rank: usize,
    pub total: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.rank, self.total)
    }
}

pub fn position_of(sorted: &[u32], cycle: u32) -> Option<Position> {
    sorted.binary_search(&cycle).ok().map(|idx| Position {
        rank: idx + 1,
        total: sorted.len(),
    })
}

/// Available cycle closest to `requested`; ties go to the lower number.
pub fn closest_cycle(sorted: &[u32], requested: u32) -> Option<u32> {
    let mut best: Option<(u32, u32)> = None;
    for &candidate in sorted {
        let distance = candidate.abs_diff(requested);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(cycle, _)| cycle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Previous,
    Next,
}

/// Neighbouring available cycle by rank.
///
/// When `current` is not in the set (or absent), the nearest available cycle
/// strictly below/above it is returned; with no current cycle, `Next` yields
/// the first cycle and `Previous` yields nothing.
pub fn neighbour(sorted: &[u32], current: Option<u32>, direction: Direction) -> Option<u32> {
    let Some(current) = current else {
        return match direction {
            Direction::Next => sorted.first().copied(),
            Direction::Previous => None,
        };
    };

    match direction {
        Direction::Previous => sorted.iter().rev().find(|&&c| c < current).copied(),
        Direction::Next => sorted.iter().find(|&&c| c > current).copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::battery::fixtures::cycle_list;

    const IMEI: &str = "865044073967657";

    #[test]
    fn test_first_cycle_ignores_server_order() {
        let cycles = cycle_list(IMEI, &[42, 7, 3, 19]);
        assert_eq!(first_cycle(&cycles), Some(3));
        assert_eq!(first_cycle(&[]), None);
        assert_eq!(sorted_cycle_numbers(&cycles), vec![3, 7, 19, 42]);
    }

    #[test]
    fn test_position_is_rank_based() {
        let sorted = vec![3, 7, 42];
        let position = position_of(&sorted, 7).unwrap();
        assert_eq!(position, Position { rank: 2, total: 3 });
        assert_eq!(position.to_string(), "2 of 3");
        assert_eq!(position_of(&sorted, 8), None);
    }

    #[test]
    fn test_closest_cycle() {
        let sorted = vec![1, 5, 9];
        assert_eq!(closest_cycle(&sorted, 6), Some(5));
        assert_eq!(closest_cycle(&sorted, 8), Some(9));
        assert_eq!(closest_cycle(&sorted, 100), Some(9));
        assert_eq!(closest_cycle(&sorted, 0), Some(1));
        assert_eq!(closest_cycle(&[], 4), None);
    }

    #[test]
    fn test_closest_cycle_tie_goes_low() {
        assert_eq!(closest_cycle(&[1, 5, 9], 7), Some(5));
        assert_eq!(closest_cycle(&[2, 4], 3), Some(2));
    }

    #[test]
    fn test_neighbour_skips_gaps() {
        let sorted = vec![3, 7, 42];
        assert_eq!(neighbour(&sorted, Some(7), Direction::Next), Some(42));
        assert_eq!(neighbour(&sorted, Some(7), Direction::Previous), Some(3));
        assert_eq!(neighbour(&sorted, Some(42), Direction::Next), None);
        assert_eq!(neighbour(&sorted, Some(3), Direction::Previous), None);
        assert_eq!(neighbour(&sorted, Some(10), Direction::Previous), Some(7));
        assert_eq!(neighbour(&sorted, None, Direction::Next), Some(3));
        assert_eq!(neighbour(&sorted, None, Direction::Previous), None);
    }
}

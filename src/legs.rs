//! Representative-leg selection for multi-leg missions.

use crate::error::{EcoError, Result};
use crate::parser::Leg;
use crate::transport::{TransportMode, cost_less};

/// Index of the leg that represents a group with the given modes, or `None`
/// for an empty group.
///
/// A journey legitimately split into train and bus legs is accounted as the
/// train leg, whatever the order. Otherwise the most carbon-intensive leg
/// wins, the earliest one on ties.
pub fn select_index(modes: &[TransportMode]) -> Option<usize> {
    use TransportMode::{Bus, Train};

    match modes {
        [] => None,
        [_] => Some(0),
        [Train, Bus] => Some(0),
        [Bus, Train] => Some(1),
        [first, rest @ ..] => {
            let mut best = 0;
            let mut cost = *first;
            for (i, &mode) in rest.iter().enumerate() {
                if cost_less(cost, mode) {
                    cost = mode;
                    best = i + 1;
                }
            }
            Some(best)
        }
    }
}

/// Picks the single leg representing a mission id.
pub fn select_leg(mut legs: Vec<Leg>) -> Result<Leg> {
    let modes: Vec<TransportMode> = legs.iter().map(|leg| leg.mode).collect();
    let index = select_index(&modes)
        .ok_or_else(|| EcoError::Invariant("leg selection on an empty group".to_string()))?;
    Ok(legs.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransportMode::*;

    #[test]
    fn test_single_leg() {
        for mode in [Unknown, Bike, Train, Bus, Plane] {
            assert_eq!(select_index(&[mode]), Some(0));
        }
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(select_index(&[]), None);
        assert!(matches!(select_leg(vec![]), Err(EcoError::Invariant(_))));
    }

    #[test]
    fn test_train_bus_special_cases() {
        assert_eq!(select_index(&[Train, Bus]), Some(0));
        assert_eq!(select_index(&[Bus, Train]), Some(1));
    }

    #[test]
    fn test_highest_cost_wins() {
        assert_eq!(select_index(&[Bus, Car]), Some(1));
        assert_eq!(select_index(&[Plane, Train]), Some(0));
        assert_eq!(select_index(&[Train, Bus, Car]), Some(2));
        assert_eq!(select_index(&[Bus, Train, Bike]), Some(0));
        assert_eq!(select_index(&[Bike, Passenger, Tramway]), Some(1));
    }

    #[test]
    fn test_ties_keep_first_leg() {
        assert_eq!(select_index(&[Car, Car]), Some(0));
        assert_eq!(select_index(&[Bus, Plane, Plane]), Some(1));
        assert_eq!(select_index(&[Train, Train, Bus]), Some(2));
    }
}

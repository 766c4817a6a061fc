use nalgebra::Point3;
use serde::Serialize;
use std::fmt;

/// Identifier of a conformer within its ensemble.
///
/// Ids are handed out sequentially in generation order and are never reused,
/// so a removed id can never come back to life in a later stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConformerId(u32);

impl ConformerId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a conformer left the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// No minimization cycle reported convergence within the budget.
    NotConverged,
    /// Energy above `minimum + window`.
    OutsideEnergyWindow,
    /// Geometric near-duplicate of a lower-energy conformer that was kept.
    Redundant { kept: ConformerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConformerState {
    Live,
    Removed(RemovalReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    id: ConformerId,
    positions: Vec<Point3<f64>>,
    state: ConformerState,
}

impl Conformer {
    pub fn id(&self) -> ConformerId {
        self.id
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn state(&self) -> ConformerState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == ConformerState::Live
    }
}

/// Arena of conformers sharing one molecule's topology.
///
/// Removal marks a tombstone instead of shrinking the arena, which keeps ids
/// stable while stages iterate and remove at the same time. Every iterator
/// exposed here skips tombstoned slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ensemble {
    atom_count: usize,
    slots: Vec<Conformer>,
}

impl Ensemble {
    pub fn new(atom_count: usize) -> Self {
        Self {
            atom_count,
            slots: Vec::new(),
        }
    }

    /// Creates an ensemble with one live conformer per coordinate set.
    ///
    /// Returns `None` if any coordinate set does not match `atom_count`.
    pub fn from_coordinates(
        atom_count: usize,
        coordinates: impl IntoIterator<Item = Vec<Point3<f64>>>,
    ) -> Option<Self> {
        let mut ensemble = Self::new(atom_count);
        for positions in coordinates {
            ensemble.push(positions)?;
        }
        Some(ensemble)
    }

    /// Adds a live conformer and returns its freshly allocated id.
    pub fn push(&mut self, positions: Vec<Point3<f64>>) -> Option<ConformerId> {
        if positions.len() != self.atom_count {
            return None;
        }
        let id = ConformerId(self.slots.len() as u32);
        self.slots.push(Conformer {
            id,
            positions,
            state: ConformerState::Live,
        });
        Some(id)
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    /// Returns the conformer if it exists and is still live.
    pub fn get(&self, id: ConformerId) -> Option<&Conformer> {
        self.slots.get(id.index()).filter(|c| c.is_live())
    }

    /// Returns the conformer regardless of its state.
    pub fn get_any(&self, id: ConformerId) -> Option<&Conformer> {
        self.slots.get(id.index())
    }

    pub fn is_live(&self, id: ConformerId) -> bool {
        self.get(id).is_some()
    }

    pub fn removal_reason(&self, id: ConformerId) -> Option<RemovalReason> {
        match self.slots.get(id.index())?.state {
            ConformerState::Live => None,
            ConformerState::Removed(reason) => Some(reason),
        }
    }

    /// Tombstones a live conformer. Returns `false` if it was not live.
    pub fn remove(&mut self, id: ConformerId, reason: RemovalReason) -> bool {
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.is_live() => {
                slot.state = ConformerState::Removed(reason);
                true
            }
            _ => false,
        }
    }

    /// Replaces the coordinates of a live conformer.
    pub fn set_positions(&mut self, id: ConformerId, positions: Vec<Point3<f64>>) -> bool {
        if positions.len() != self.atom_count {
            return false;
        }
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.is_live() => {
                slot.positions = positions;
                true
            }
            _ => false,
        }
    }

    pub fn positions_mut(&mut self, id: ConformerId) -> Option<&mut [Point3<f64>]> {
        self.slots
            .get_mut(id.index())
            .filter(|c| c.is_live())
            .map(|c| c.positions.as_mut_slice())
    }

    /// Live conformers in generation order.
    pub fn live(&self) -> impl Iterator<Item = &Conformer> {
        self.slots.iter().filter(|c| c.is_live())
    }

    pub fn live_ids(&self) -> Vec<ConformerId> {
        self.live().map(|c| c.id).collect()
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    /// Number of conformers ever created, live or removed.
    pub fn total_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    pub fn removed_count(&self, predicate: impl Fn(&RemovalReason) -> bool) -> usize {
        self.slots
            .iter()
            .filter(|c| matches!(c.state, ConformerState::Removed(ref r) if predicate(r)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(x: f64) -> Vec<Point3<f64>> {
        vec![Point3::new(x, 0.0, 0.0), Point3::new(x, 1.0, 0.0)]
    }

    fn three_conformers() -> Ensemble {
        Ensemble::from_coordinates(2, [coords(0.0), coords(1.0), coords(2.0)]).unwrap()
    }

    #[test]
    fn ids_are_allocated_in_generation_order() {
        let ensemble = three_conformers();
        assert_eq!(
            ensemble.live_ids(),
            vec![ConformerId::new(0), ConformerId::new(1), ConformerId::new(2)]
        );
        assert_eq!(ensemble.total_count(), 3);
    }

    #[test]
    fn push_rejects_wrong_atom_count() {
        let mut ensemble = Ensemble::new(2);
        assert!(ensemble.push(vec![Point3::origin()]).is_none());
        assert!(Ensemble::from_coordinates(3, [coords(0.0)]).is_none());
    }

    #[test]
    fn removal_tombstones_without_shifting_ids() {
        let mut ensemble = three_conformers();
        let middle = ConformerId::new(1);

        assert!(ensemble.remove(middle, RemovalReason::NotConverged));
        assert!(!ensemble.is_live(middle));
        assert!(ensemble.get(middle).is_none());
        assert!(ensemble.get_any(middle).is_some());
        assert_eq!(
            ensemble.removal_reason(middle),
            Some(RemovalReason::NotConverged)
        );
        assert_eq!(
            ensemble.live_ids(),
            vec![ConformerId::new(0), ConformerId::new(2)]
        );
        assert_eq!(ensemble.total_count(), 3);
    }

    #[test]
    fn removing_twice_keeps_the_first_reason() {
        let mut ensemble = three_conformers();
        let id = ConformerId::new(0);
        assert!(ensemble.remove(id, RemovalReason::OutsideEnergyWindow));
        assert!(!ensemble.remove(id, RemovalReason::NotConverged));
        assert_eq!(
            ensemble.removal_reason(id),
            Some(RemovalReason::OutsideEnergyWindow)
        );
    }

    #[test]
    fn ids_are_never_reused_after_removal() {
        let mut ensemble = three_conformers();
        ensemble.remove(ConformerId::new(2), RemovalReason::NotConverged);
        let new_id = ensemble.push(coords(3.0)).unwrap();
        assert_eq!(new_id, ConformerId::new(3));
        assert!(!ensemble.is_live(ConformerId::new(2)));
    }

    #[test]
    fn removed_conformers_cannot_be_edited() {
        let mut ensemble = three_conformers();
        let id = ConformerId::new(1);
        ensemble.remove(id, RemovalReason::NotConverged);
        assert!(!ensemble.set_positions(id, coords(9.0)));
        assert!(ensemble.positions_mut(id).is_none());
    }

    #[test]
    fn removed_count_filters_by_reason() {
        let mut ensemble = three_conformers();
        ensemble.remove(ConformerId::new(0), RemovalReason::NotConverged);
        ensemble.remove(
            ConformerId::new(2),
            RemovalReason::Redundant {
                kept: ConformerId::new(1),
            },
        );
        assert_eq!(
            ensemble.removed_count(|r| matches!(r, RemovalReason::NotConverged)),
            1
        );
        assert_eq!(
            ensemble.removed_count(|r| matches!(r, RemovalReason::Redundant { .. })),
            1
        );
        assert_eq!(ensemble.live_count(), 1);
    }
}

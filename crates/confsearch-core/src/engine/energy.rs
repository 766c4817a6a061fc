use crate::core::models::conformer::ConformerId;
use std::collections::BTreeMap;

/// Minimized energies of live conformers, keyed by id.
///
/// A conformer without an entry has been excluded from the search. Stages
/// that remove a conformer from the ensemble drop its entry here as well, so
/// every key refers to a live conformer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyTable {
    entries: BTreeMap<ConformerId, f64>,
}

impl EnergyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an energy. Returns the previous value.
    pub fn insert(&mut self, id: ConformerId, energy: f64) -> Option<f64> {
        self.entries.insert(id, energy)
    }

    pub fn get(&self, id: ConformerId) -> Option<f64> {
        self.entries.get(&id).copied()
    }

    pub fn remove(&mut self, id: ConformerId) -> Option<f64> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: ConformerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ConformerId, f64)> + '_ {
        self.entries.iter().map(|(id, e)| (*id, *e))
    }

    /// Lowest energy in the table; the smallest id wins ties.
    pub fn minimum(&self) -> Option<(ConformerId, f64)> {
        self.iter().fold(None, |best, (id, e)| match best {
            Some((_, best_e)) if best_e <= e => best,
            _ => Some((id, e)),
        })
    }

    /// Energies shifted so that the minimum is zero, in id order.
    pub fn relative_to_minimum(&self) -> Vec<(ConformerId, f64)> {
        match self.minimum() {
            Some((_, min)) => self.iter().map(|(id, e)| (id, e - min)).collect(),
            None => Vec::new(),
        }
    }
}

/// Accumulates minimized energies and the lowest value ever recorded.
///
/// The running minimum survives later removals from the table, which is how
/// the search reports its best conformer even if a filter drops it.
#[derive(Debug, Clone, Default)]
pub struct EnergyTracker {
    table: EnergyTable,
    lowest: Option<(ConformerId, f64)>,
}

impl EnergyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: ConformerId, energy: f64) {
        self.table.insert(id, energy);
        if self.lowest.is_none_or(|(_, best)| energy < best) {
            self.lowest = Some((id, energy));
        }
    }

    /// Lowest energy recorded so far, `None` before the first record.
    pub fn current_minimum(&self) -> Option<f64> {
        self.lowest.map(|(_, e)| e)
    }

    pub fn lowest(&self) -> Option<(ConformerId, f64)> {
        self.lowest
    }

    pub fn table(&self) -> &EnergyTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut EnergyTable {
        &mut self.table
    }

    pub fn into_parts(self) -> (EnergyTable, Option<(ConformerId, f64)>) {
        (self.table, self.lowest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ConformerId {
        ConformerId::new(raw)
    }

    #[test]
    fn empty_table_has_no_minimum() {
        let table = EnergyTable::new();
        assert!(table.minimum().is_none());
        assert!(table.relative_to_minimum().is_empty());
    }

    #[test]
    fn minimum_prefers_the_smallest_id_on_ties() {
        let mut table = EnergyTable::new();
        table.insert(id(3), -2.0);
        table.insert(id(1), -2.0);
        table.insert(id(2), 4.0);
        assert_eq!(table.minimum(), Some((id(1), -2.0)));
    }

    #[test]
    fn iteration_is_in_id_order() {
        let mut table = EnergyTable::new();
        table.insert(id(5), 1.0);
        table.insert(id(0), 2.0);
        table.insert(id(2), 3.0);
        let ids: Vec<_> = table.iter().map(|(i, _)| i).collect();
        assert_eq!(ids, vec![id(0), id(2), id(5)]);
    }

    #[test]
    fn relative_energies_start_at_zero() {
        let mut table = EnergyTable::new();
        table.insert(id(0), -10.0);
        table.insert(id(1), -12.0);
        assert_eq!(table.relative_to_minimum(), vec![(id(0), 2.0), (id(1), 0.0)]);
    }

    #[test]
    fn tracker_keeps_the_lowest_record_after_removal() {
        let mut tracker = EnergyTracker::new();
        assert_eq!(tracker.current_minimum(), None);

        tracker.record(id(0), 1.0);
        tracker.record(id(1), -3.0);
        tracker.record(id(2), -1.0);
        assert_eq!(tracker.current_minimum(), Some(-3.0));

        tracker.table_mut().remove(id(1));
        assert_eq!(tracker.lowest(), Some((id(1), -3.0)));
        assert_eq!(tracker.table().minimum(), Some((id(2), -1.0)));
    }

    #[test]
    fn tracker_keeps_the_first_of_equal_energies() {
        let mut tracker = EnergyTracker::new();
        tracker.record(id(0), -5.0);
        tracker.record(id(1), -5.0);
        assert_eq!(tracker.lowest(), Some((id(0), -5.0)));
    }
}

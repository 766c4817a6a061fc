use super::molecule::Molecule;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Constrained atom index {index} is out of range (molecule has {atom_count} atoms)")]
    AtomOutOfRange { index: usize, atom_count: usize },
    #[error("Maximum displacement must be a positive finite number, got {0}")]
    InvalidDisplacement(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// The atom may not move at all.
    Fixed,
    /// The atom may drift up to `max_displacement` from its reference position.
    Bounded { max_displacement: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomConstraint {
    pub atom: usize,
    /// Position of the atom in the molecule's original conformer.
    pub reference: Point3<f64>,
    pub kind: ConstraintKind,
}

/// Positional constraints applied uniformly during one search.
///
/// Built once from the input molecule and never mutated afterwards. Entries
/// are sorted by atom index and duplicate indices collapse into one entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSpec {
    constraints: Vec<AtomConstraint>,
}

impl ConstraintSpec {
    pub fn none() -> Self {
        Self::default()
    }

    /// Constrains `atoms` to their positions in `molecule`.
    ///
    /// With `max_displacement` absent every atom is fixed in place, otherwise
    /// each may move within that radius.
    pub fn new(
        molecule: &Molecule,
        atoms: &[usize],
        max_displacement: Option<f64>,
    ) -> Result<Self, ConstraintError> {
        let kind = match max_displacement {
            None => ConstraintKind::Fixed,
            Some(d) if d.is_finite() && d > 0.0 => ConstraintKind::Bounded {
                max_displacement: d,
            },
            Some(d) => return Err(ConstraintError::InvalidDisplacement(d)),
        };

        let mut indices = atoms.to_vec();
        indices.sort_unstable();
        indices.dedup();

        let atom_count = molecule.atom_count();
        let constraints = indices
            .into_iter()
            .map(|index| {
                molecule
                    .atom(index)
                    .map(|atom| AtomConstraint {
                        atom: index,
                        reference: atom.position,
                        kind,
                    })
                    .ok_or(ConstraintError::AtomOutOfRange { index, atom_count })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { constraints })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AtomConstraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.constraints
            .binary_search_by_key(&atom, |c| c.atom)
            .is_ok()
    }

    /// Atom index to reference position, as handed to the embedder.
    pub fn coord_map(&self) -> Vec<(usize, Point3<f64>)> {
        self.constraints
            .iter()
            .map(|c| (c.atom, c.reference))
            .collect()
    }
}

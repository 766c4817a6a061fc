use super::atom::Atom;
use super::topology::{Bond, BondOrder};
use nalgebra::Point3;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Bond references atom {index}, but the molecule has {atom_count} atoms")]
    BondAtomOutOfRange { index: usize, atom_count: usize },
    #[error("Bond connects atom {0} to itself")]
    SelfBond(usize),
    #[error("Molecule contains no atoms")]
    Empty,
    #[error("Atom {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

/// A molecule with a fixed atom/bond topology and one input geometry.
///
/// The atom positions are the molecule's original conformer. They serve as
/// the reference geometry for positional constraints and as the template
/// from which search conformers are generated. Every conformer produced
/// during a search shares this topology and differs only in coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    name: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builds a molecule from atoms and bonds, validating every bond index.
    pub fn from_parts(
        name: impl Into<String>,
        atoms: Vec<Atom>,
        bonds: Vec<Bond>,
    ) -> Result<Self, MoleculeError> {
        let mut molecule = Self::new(name);
        for atom in atoms {
            molecule.add_atom(atom);
        }
        for bond in bonds {
            molecule.add_bond(bond.atom1, bond.atom2, bond.order)?;
        }
        Ok(molecule)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an atom and returns its 0-based index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub fn add_bond(
        &mut self,
        atom1: usize,
        atom2: usize,
        order: BondOrder,
    ) -> Result<(), MoleculeError> {
        let atom_count = self.atoms.len();
        for index in [atom1, atom2] {
            if index >= atom_count {
                return Err(MoleculeError::BondAtomOutOfRange { index, atom_count });
            }
        }
        if atom1 == atom2 {
            return Err(MoleculeError::SelfBond(atom1));
        }
        self.bonds.push(Bond::new(atom1, atom2, order));
        self.adjacency[atom1].push(atom2);
        self.adjacency[atom2].push(atom1);
        Ok(())
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map_or(&[], Vec::as_slice)
    }

    /// Coordinates of the original input conformer, indexed by atom.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Copy of this molecule with its atoms moved to `positions`.
    ///
    /// Returns `None` when the coordinate count does not match.
    pub fn with_positions(&self, positions: &[Point3<f64>]) -> Option<Self> {
        if positions.len() != self.atoms.len() {
            return None;
        }
        let mut molecule = self.clone();
        for (atom, position) in molecule.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
        Some(molecule)
    }

    /// Indices of all non-hydrogen atoms.
    ///
    /// Falls back to every atom when the molecule consists of hydrogens only,
    /// so that a comparison view is never empty.
    pub fn heavy_atom_indices(&self) -> Vec<usize> {
        let heavy: Vec<usize> = self
            .atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.element.is_hydrogen())
            .map(|(i, _)| i)
            .collect();
        if heavy.is_empty() {
            (0..self.atoms.len()).collect()
        } else {
            heavy
        }
    }

    /// Unordered atom pairs separated by exactly two bonds (angle end-points).
    pub fn one_three_pairs(&self) -> Vec<(usize, usize)> {
        let bonded: HashSet<(usize, usize)> = self
            .bonds
            .iter()
            .map(|b| ordered_pair(b.atom1, b.atom2))
            .collect();
        let mut pairs = HashSet::new();
        for (center, neighbors) in self.adjacency.iter().enumerate() {
            for (k, &a) in neighbors.iter().enumerate() {
                for &b in &neighbors[k + 1..] {
                    if a == b || a == center || b == center {
                        continue;
                    }
                    let pair = ordered_pair(a, b);
                    if !bonded.contains(&pair) {
                        pairs.insert(pair);
                    }
                }
            }
        }
        let mut pairs: Vec<_> = pairs.into_iter().collect();
        pairs.sort_unstable();
        pairs
    }

    /// Checks that the input geometry can seed a conformer search.
    pub fn validate_starting_geometry(&self) -> Result<(), MoleculeError> {
        if self.atoms.is_empty() {
            return Err(MoleculeError::Empty);
        }
        if let Some(index) = self
            .atoms
            .iter()
            .position(|a| !a.position.coords.iter().all(|c| c.is_finite()))
        {
            return Err(MoleculeError::NonFiniteCoordinate { index });
        }
        Ok(())
    }
}

#[inline]
fn ordered_pair(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

use super::{EmbedRequest, Embedder, EmbeddingError};
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::superposed_rmsd;
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::f64::consts::PI;
use tracing::{debug, instrument};

/// Embedder that drives torsions and scatters atoms around the input geometry.
///
/// Each candidate starts from the molecule's original conformer. Every
/// rotatable bond (single, acyclic, with neighbours on both ends) is twisted
/// by a uniform random angle, then every free atom is displaced by an
/// independent uniform offset of at most `amplitude` per axis. Atoms listed in
/// the request's coordinate map are placed exactly at their mapped positions,
/// and a bond is only twisted if one of its sides holds no mapped atom. This
/// is not a distance-geometry embedder; it gives the minimizer distinct
/// starting points without any external dependency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerturbationEmbedder {
    amplitude: f64,
    attempts_per_conformer: usize,
}

impl Default for PerturbationEmbedder {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            attempts_per_conformer: 10,
        }
    }
}

impl PerturbationEmbedder {
    pub fn new(amplitude: f64) -> Self {
        Self {
            amplitude: amplitude.abs(),
            ..Self::default()
        }
    }

    /// Caps candidate draws at `count * attempts` so heavy pruning terminates.
    pub fn with_attempts_per_conformer(mut self, attempts: usize) -> Self {
        self.attempts_per_conformer = attempts.max(1);
        self
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    fn draw(
        &self,
        reference: &[Point3<f64>],
        rotors: &[Rotor],
        pinned: &[Option<Point3<f64>>],
        rng: &mut impl Rng,
    ) -> Vec<Point3<f64>> {
        let mut twisted = reference.to_vec();
        for rotor in rotors {
            rotor.twist(&mut twisted, rng.gen_range(-PI..PI));
        }

        twisted
            .iter()
            .zip(pinned.iter())
            .map(|(position, pin)| match pin {
                Some(anchor) => *anchor,
                None => {
                    let offset = Vector3::new(
                        rng.gen_range(-1.0..=1.0),
                        rng.gen_range(-1.0..=1.0),
                        rng.gen_range(-1.0..=1.0),
                    );
                    position + offset * self.amplitude
                }
            })
            .collect()
    }
}

/// A rotatable bond and the atoms that turn with it.
#[derive(Debug, Clone, PartialEq)]
struct Rotor {
    /// Axis atom on the side that stays put.
    anchor: usize,
    /// Axis atom on the side that turns.
    pivot: usize,
    /// Atoms beyond `pivot`, excluding it.
    moving: Vec<usize>,
}

impl Rotor {
    fn twist(&self, coords: &mut [Point3<f64>], angle: f64) {
        let origin = coords[self.pivot];
        let Some(axis) = Unit::try_new(origin - coords[self.anchor], 1e-8) else {
            return;
        };
        let rotation = Rotation3::from_axis_angle(&axis, angle);
        for &atom in &self.moving {
            coords[atom] = origin + rotation * (coords[atom] - origin);
        }
    }
}

/// Atoms reachable from `start` without crossing the bond to `across`.
///
/// Returns `None` if `across` is reachable anyway, i.e. the bond is in a ring.
fn side_of(molecule: &Molecule, start: usize, across: usize) -> Option<Vec<bool>> {
    let mut seen = vec![false; molecule.atom_count()];
    seen[start] = true;
    let mut stack = vec![start];
    while let Some(atom) = stack.pop() {
        for &next in molecule.neighbors(atom) {
            if atom == start && next == across {
                continue;
            }
            if next == across {
                return None;
            }
            if !seen[next] {
                seen[next] = true;
                stack.push(next);
            }
        }
    }
    Some(seen)
}

/// Rotatable bonds of `molecule`, each turning the side without pinned atoms.
///
/// With both sides free the smaller one turns. Bonds with pinned atoms on
/// both sides are left alone.
fn find_rotors(molecule: &Molecule, pinned: &[Option<Point3<f64>>]) -> Vec<Rotor> {
    let is_terminal = |atom: usize| molecule.neighbors(atom).len() < 2;

    molecule
        .bonds()
        .iter()
        .filter(|bond| bond.order == BondOrder::Single)
        .filter(|bond| !is_terminal(bond.atom1) && !is_terminal(bond.atom2))
        .filter_map(|bond| {
            let far = side_of(molecule, bond.atom2, bond.atom1)?;
            let members = |on_far: bool| -> Vec<usize> {
                (0..far.len()).filter(|&i| far[i] == on_far).collect()
            };
            let (far_atoms, near_atoms) = (members(true), members(false));
            let has_pin = |atoms: &[usize]| atoms.iter().any(|&i| pinned[i].is_some());

            let turn_far = match (has_pin(&near_atoms[..]), has_pin(&far_atoms[..])) {
                (true, true) => return None,
                (true, false) => true,
                (false, true) => false,
                (false, false) => far_atoms.len() <= near_atoms.len(),
            };
            let (anchor, pivot, side) = if turn_far {
                (bond.atom1, bond.atom2, far_atoms)
            } else {
                (bond.atom2, bond.atom1, near_atoms)
            };
            Some(Rotor {
                anchor,
                pivot,
                moving: side.into_iter().filter(|&i| i != pivot).collect(),
            })
        })
        .collect()
}

impl Embedder for PerturbationEmbedder {
    #[instrument(skip_all, name = "perturbation_embed", fields(count = request.count))]
    fn embed(
        &self,
        molecule: &Molecule,
        request: &EmbedRequest,
    ) -> Result<Vec<Vec<Point3<f64>>>, EmbeddingError> {
        request.validate(molecule)?;

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let reference = molecule.positions();
        let mut pinned = vec![None; reference.len()];
        for &(index, position) in &request.coord_map {
            pinned[index] = Some(position);
        }
        let rotors = find_rotors(molecule, &pinned);
        debug!(rotors = rotors.len(), "Found rotatable bonds.");
        let heavy = molecule.heavy_atom_indices();
        let heavy_view =
            |coords: &[Point3<f64>]| heavy.iter().map(|&i| coords[i]).collect::<Vec<_>>();

        let max_attempts = request.count.saturating_mul(self.attempts_per_conformer);
        let mut accepted: Vec<Vec<Point3<f64>>> = Vec::with_capacity(request.count);
        let mut accepted_heavy: Vec<Vec<Point3<f64>>> = Vec::with_capacity(request.count);
        let mut attempts = 0;

        while accepted.len() < request.count && attempts < max_attempts {
            attempts += 1;
            let candidate = self.draw(&reference, &rotors, &pinned, &mut rng);
            let candidate_heavy = heavy_view(&candidate);

            if request.prune_rms_threshold > 0.0 {
                let duplicate = accepted_heavy.iter().any(|kept| {
                    superposed_rmsd(kept, &candidate_heavy)
                        .is_some_and(|rmsd| rmsd < request.prune_rms_threshold)
                });
                if duplicate {
                    debug!(attempt = attempts, "Pruned near-duplicate candidate.");
                    continue;
                }
            }

            accepted_heavy.push(candidate_heavy);
            accepted.push(candidate);
        }

        debug!(
            accepted = accepted.len(),
            attempts, "Perturbation embedding finished."
        );
        Ok(accepted)
    }
}

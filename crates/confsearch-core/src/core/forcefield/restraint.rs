use super::evaluator::{Evaluator, ForceField, ForceFieldError, MinimizeStatus};
use super::potentials::{flat_bottom_spring, harmonic, repulsive_wall};
use crate::core::models::molecule::Molecule;
use nalgebra::{DVector, Point3, Vector3};
use std::collections::{HashSet, VecDeque};

const LBFGS_MEMORY: usize = 8;
const MAX_ATOM_MOVE: f64 = 0.3; // Angstroms per line-search trial
const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;

/// Tunable constants of the reference evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestraintParams {
    /// Force constant of 1-2 distance restraints in kcal/(mol·Å²).
    pub bond_force_constant: f64,
    /// Force constant of 1-3 distance restraints in kcal/(mol·Å²).
    pub angle_force_constant: f64,
    /// Force constant of the non-bonded contact wall in kcal/(mol·Å²).
    pub contact_force_constant: f64,
    /// Contact distance as a multiple of the summed covalent radii.
    pub contact_scale: f64,
    /// RMS gradient below which a cycle counts as converged.
    pub gradient_tolerance: f64,
    /// Relative energy change below which a cycle counts as converged.
    pub energy_tolerance: f64,
}

impl Default for RestraintParams {
    fn default() -> Self {
        Self {
            bond_force_constant: 300.0,
            angle_force_constant: 60.0,
            contact_force_constant: 50.0,
            contact_scale: 1.6,
            gradient_tolerance: 1e-3,
            energy_tolerance: 1e-10,
        }
    }
}

/// Reference evaluator that relaxes conformers toward the input geometry.
///
/// This is not a molecular mechanics force field. It restrains bonded (1-2)
/// and angle (1-3) distances to their values in the input structure and keeps
/// non-bonded atoms from collapsing onto each other, which is enough to turn
/// a perturbed candidate into a locally relaxed, chemically sensible
/// geometry. Production searches plug a real force field in through the
/// [`ForceField`] trait instead.
#[derive(Debug, Clone, Default)]
pub struct RestraintForceField {
    params: RestraintParams,
}

impl RestraintForceField {
    pub fn new(params: RestraintParams) -> Self {
        Self { params }
    }
}

#[derive(Debug, Clone, Copy)]
struct DistanceTerm {
    i: usize,
    j: usize,
    ideal: f64,
    force_constant: f64,
}

#[derive(Debug, Clone, Copy)]
struct ContactTerm {
    i: usize,
    j: usize,
    contact: f64,
}

#[derive(Debug, Clone, Copy)]
struct PositionTerm {
    atom: usize,
    anchor: Vector3<f64>,
    max_displacement: f64,
    force_constant: f64,
}

impl ForceField for RestraintForceField {
    type Evaluator = RestraintEvaluator;

    fn create_evaluator(
        &self,
        molecule: &Molecule,
        positions: Vec<Point3<f64>>,
    ) -> Result<Self::Evaluator, ForceFieldError> {
        let atom_count = molecule.atom_count();
        if positions.len() != atom_count {
            return Err(ForceFieldError::AtomCountMismatch {
                expected: atom_count,
                actual: positions.len(),
            });
        }

        let reference = molecule.positions();
        let ideal = |i: usize, j: usize| (reference[i] - reference[j]).norm();

        let mut excluded = HashSet::new();
        let mut distance_terms = Vec::new();
        for bond in molecule.bonds() {
            let (i, j) = (bond.atom1.min(bond.atom2), bond.atom1.max(bond.atom2));
            if excluded.insert((i, j)) {
                distance_terms.push(DistanceTerm {
                    i,
                    j,
                    ideal: ideal(i, j),
                    force_constant: self.params.bond_force_constant,
                });
            }
        }
        for (i, j) in molecule.one_three_pairs() {
            if excluded.insert((i, j)) {
                distance_terms.push(DistanceTerm {
                    i,
                    j,
                    ideal: ideal(i, j),
                    force_constant: self.params.angle_force_constant,
                });
            }
        }

        let atoms = molecule.atoms();
        let mut contact_terms = Vec::new();
        for i in 0..atom_count {
            for j in (i + 1)..atom_count {
                if excluded.contains(&(i, j)) {
                    continue;
                }
                let radii = atoms[i].element.covalent_radius() + atoms[j].element.covalent_radius();
                // Never push apart a pair that is already closer in the input.
                let contact = (self.params.contact_scale * radii).min(ideal(i, j));
                contact_terms.push(ContactTerm { i, j, contact });
            }
        }

        Ok(RestraintEvaluator {
            positions,
            distance_terms,
            contact_terms,
            position_terms: Vec::new(),
            fixed: vec![false; atom_count],
            params: self.params,
            initialized: false,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RestraintEvaluator {
    positions: Vec<Point3<f64>>,
    distance_terms: Vec<DistanceTerm>,
    contact_terms: Vec<ContactTerm>,
    position_terms: Vec<PositionTerm>,
    fixed: Vec<bool>,
    params: RestraintParams,
    initialized: bool,
}

impl RestraintEvaluator {
    fn check_atom(&self, atom: usize) -> Result<(), ForceFieldError> {
        if atom < self.positions.len() {
            Ok(())
        } else {
            Err(ForceFieldError::AtomOutOfRange {
                index: atom,
                atom_count: self.positions.len(),
            })
        }
    }

    fn evaluate(&self, x: &DVector<f64>, mut grad: Option<&mut DVector<f64>>) -> f64 {
        if let Some(g) = grad.as_mut() {
            g.fill(0.0);
        }
        let mut energy = 0.0;

        for term in &self.distance_terms {
            energy += pair_term(x, term.i, term.j, grad.as_deref_mut(), |r| {
                harmonic(r, term.ideal, term.force_constant)
            });
        }
        let k_contact = self.params.contact_force_constant;
        for term in &self.contact_terms {
            energy += pair_term(x, term.i, term.j, grad.as_deref_mut(), |r| {
                repulsive_wall(r, term.contact, k_contact)
            });
        }
        for term in &self.position_terms {
            let delta = atom_vec(x, term.atom) - term.anchor;
            let displacement = delta.norm();
            let (e, de) = flat_bottom_spring(displacement, term.max_displacement, term.force_constant);
            energy += e;
            if let Some(g) = grad.as_mut() {
                if displacement > 1e-12 && de != 0.0 {
                    add_to(g, term.atom, &(delta * (de / displacement)));
                }
            }
        }

        if let Some(g) = grad.as_mut() {
            for (atom, _) in self.fixed.iter().enumerate().filter(|(_, f)| **f) {
                for k in 0..3 {
                    g[3 * atom + k] = 0.0;
                }
            }
        }
        energy
    }

    fn rms(&self, g: &DVector<f64>) -> f64 {
        if g.is_empty() {
            return 0.0;
        }
        (g.norm_squared() / g.len() as f64).sqrt()
    }

    fn line_search(
        &self,
        x: &DVector<f64>,
        energy: f64,
        g: &DVector<f64>,
        direction: &DVector<f64>,
    ) -> Option<(DVector<f64>, f64, DVector<f64>)> {
        let largest_move = (0..x.len() / 3)
            .map(|i| atom_vec(direction, i).norm())
            .fold(0.0, f64::max);
        if largest_move <= 0.0 {
            return None;
        }

        let slope = g.dot(direction);
        let mut t = if largest_move > MAX_ATOM_MOVE {
            MAX_ATOM_MOVE / largest_move
        } else {
            1.0
        };
        let mut g_new = DVector::zeros(x.len());
        for _ in 0..MAX_BACKTRACKS {
            let x_new = x + direction * t;
            let e_new = self.evaluate(&x_new, Some(&mut g_new));
            if e_new.is_finite() && e_new < energy && e_new <= energy + ARMIJO_C1 * t * slope {
                return Some((x_new, e_new, g_new));
            }
            t *= 0.5;
        }
        None
    }
}

impl Evaluator for RestraintEvaluator {
    fn add_fixed_point(&mut self, atom: usize) -> Result<(), ForceFieldError> {
        self.check_atom(atom)?;
        self.fixed[atom] = true;
        Ok(())
    }

    fn add_position_constraint(
        &mut self,
        atom: usize,
        anchor: Point3<f64>,
        max_displacement: f64,
        force_constant: f64,
    ) -> Result<(), ForceFieldError> {
        self.check_atom(atom)?;
        self.position_terms.push(PositionTerm {
            atom,
            anchor: anchor.coords,
            max_displacement,
            force_constant,
        });
        Ok(())
    }

    fn initialize(&mut self) {
        self.initialized = true;
    }

    /// Limited-memory BFGS with Armijo backtracking.
    ///
    /// Only energy-lowering steps are accepted, so the energy after a cycle
    /// never exceeds the energy before it.
    fn minimize(&mut self, max_steps: usize) -> MinimizeStatus {
        if !self.initialized {
            self.initialize();
        }

        let mut x = flatten(&self.positions);
        let mut g = DVector::zeros(x.len());
        let mut energy = self.evaluate(&x, Some(&mut g));
        let mut history: VecDeque<(DVector<f64>, DVector<f64>, f64)> =
            VecDeque::with_capacity(LBFGS_MEMORY);
        let mut status = MinimizeStatus::NotConverged;

        for _ in 0..max_steps {
            if self.rms(&g) < self.params.gradient_tolerance {
                status = MinimizeStatus::Converged;
                break;
            }

            let mut direction = lbfgs_direction(&g, &history);
            if direction.dot(&g) >= 0.0 {
                history.clear();
                direction = -&g;
            }

            match self.line_search(&x, energy, &g, &direction) {
                Some((x_new, e_new, g_new)) => {
                    let s = &x_new - &x;
                    let y = &g_new - &g;
                    let sy = s.dot(&y);
                    if sy > 1e-12 {
                        if history.len() == LBFGS_MEMORY {
                            history.pop_front();
                        }
                        history.push_back((s, y, 1.0 / sy));
                    }
                    let settled = (energy - e_new).abs()
                        <= self.params.energy_tolerance * energy.abs().max(1.0);
                    x = x_new;
                    energy = e_new;
                    g = g_new;
                    if settled {
                        status = MinimizeStatus::Converged;
                        break;
                    }
                }
                None if !history.is_empty() => history.clear(),
                // Steepest descent cannot lower the energy any further.
                None => {
                    status = MinimizeStatus::Converged;
                    break;
                }
            }
        }

        if status == MinimizeStatus::NotConverged && self.rms(&g) < self.params.gradient_tolerance {
            status = MinimizeStatus::Converged;
        }
        self.positions = unflatten(&x);
        status
    }

    fn energy(&self) -> f64 {
        self.evaluate(&flatten(&self.positions), None)
    }

    fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    fn into_positions(self) -> Vec<Point3<f64>> {
        self.positions
    }
}

fn lbfgs_direction(
    g: &DVector<f64>,
    history: &VecDeque<(DVector<f64>, DVector<f64>, f64)>,
) -> DVector<f64> {
    let mut q = g.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for (s, y, rho) in history.iter().rev() {
        let alpha = rho * s.dot(&q);
        q.axpy(-alpha, y, 1.0);
        alphas.push(alpha);
    }
    let gamma = history
        .back()
        .map_or(1.0, |(s, y, _)| s.dot(y) / y.dot(y));
    let mut r = q * gamma;
    for ((s, y, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * y.dot(&r);
        r.axpy(alpha - beta, s, 1.0);
    }
    -r
}

#[inline]
fn atom_vec(x: &DVector<f64>, i: usize) -> Vector3<f64> {
    Vector3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2])
}

#[inline]
fn add_to(g: &mut DVector<f64>, i: usize, v: &Vector3<f64>) {
    for k in 0..3 {
        g[3 * i + k] += v[k];
    }
}

fn pair_term(
    x: &DVector<f64>,
    i: usize,
    j: usize,
    grad: Option<&mut DVector<f64>>,
    potential: impl Fn(f64) -> (f64, f64),
) -> f64 {
    let delta = atom_vec(x, i) - atom_vec(x, j);
    let r = delta.norm();
    let (e, de) = potential(r);
    if let Some(g) = grad {
        if r > 1e-12 && de != 0.0 {
            let v = delta * (de / r);
            add_to(g, i, &v);
            add_to(g, j, &(-v));
        }
    }
    e
}

fn flatten(positions: &[Point3<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        positions.len() * 3,
        positions.iter().flat_map(|p| [p.x, p.y, p.z]),
    )
}

fn unflatten(x: &DVector<f64>) -> Vec<Point3<f64>> {
    (0..x.len() / 3)
        .map(|i| Point3::new(x[3 * i], x[3 * i + 1], x[3 * i + 2]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, Element};
    use crate::core::models::topology::{Bond, BondOrder};

    fn propanol_skeleton() -> Molecule {
        let atoms = vec![
            Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::C, Point3::new(1.52, 0.0, 0.0)),
            Atom::new(Element::C, Point3::new(2.03, 1.43, 0.0)),
            Atom::new(Element::O, Point3::new(3.46, 1.45, 0.1)),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
            Bond::new(2, 3, BondOrder::Single),
        ];
        Molecule::from_parts("propanol", atoms, bonds).unwrap()
    }

    fn distorted(molecule: &Molecule) -> Vec<Point3<f64>> {
        let shifts = [
            Vector3::new(0.2, -0.1, 0.15),
            Vector3::new(-0.15, 0.2, -0.1),
            Vector3::new(0.1, 0.1, 0.25),
            Vector3::new(-0.2, -0.15, 0.05),
        ];
        molecule
            .positions()
            .iter()
            .zip(shifts.iter())
            .map(|(p, s)| p + s)
            .collect()
    }

    #[test]
    fn create_evaluator_rejects_wrong_atom_count() {
        let ff = RestraintForceField::default();
        let mol = propanol_skeleton();
        let err = ff.create_evaluator(&mol, vec![Point3::origin()]).unwrap_err();
        assert_eq!(
            err,
            ForceFieldError::AtomCountMismatch {
                expected: 4,
                actual: 1
            }
        );
    }

    #[test]
    fn constraints_reject_out_of_range_atoms() {
        let mol = propanol_skeleton();
        let mut evaluator = RestraintForceField::default()
            .create_evaluator(&mol, mol.positions())
            .unwrap();
        assert!(evaluator.add_fixed_point(4).is_err());
        assert!(
            evaluator
                .add_position_constraint(7, Point3::origin(), 0.1, 1e5)
                .is_err()
        );
    }

    #[test]
    fn reference_geometry_has_zero_energy() {
        let mol = propanol_skeleton();
        let evaluator = RestraintForceField::default()
            .create_evaluator(&mol, mol.positions())
            .unwrap();
        assert!(evaluator.energy().abs() < 1e-12);
    }

    #[test]
    fn analytic_gradient_matches_finite_difference() {
        let mol = propanol_skeleton();
        let mut evaluator = RestraintForceField::default()
            .create_evaluator(&mol, distorted(&mol))
            .unwrap();
        evaluator
            .add_position_constraint(3, Point3::new(3.0, 1.0, 0.0), 0.1, 500.0)
            .unwrap();

        let x = flatten(evaluator.positions());
        let mut g = DVector::zeros(x.len());
        evaluator.evaluate(&x, Some(&mut g));

        let h = 1e-6;
        for k in 0..x.len() {
            let mut plus = x.clone();
            let mut minus = x.clone();
            plus[k] += h;
            minus[k] -= h;
            let numeric =
                (evaluator.evaluate(&plus, None) - evaluator.evaluate(&minus, None)) / (2.0 * h);
            assert!(
                (numeric - g[k]).abs() < 1e-3 * numeric.abs().max(1.0),
                "component {k}: analytic {} vs numeric {numeric}",
                g[k]
            );
        }
    }

    #[test]
    fn minimize_lowers_energy_and_converges() {
        let mol = propanol_skeleton();
        let mut evaluator = RestraintForceField::default()
            .create_evaluator(&mol, distorted(&mol))
            .unwrap();
        evaluator.initialize();
        let before = evaluator.energy();
        assert!(before > 1.0);

        let mut converged = false;
        for _ in 0..10 {
            if evaluator.minimize(200).is_converged() {
                converged = true;
                break;
            }
        }
        assert!(converged);
        let after = evaluator.energy();
        assert!(after <= before);
        assert!(after < 1e-3);
    }

    #[test]
    fn fixed_points_do_not_move() {
        let mol = propanol_skeleton();
        let start = distorted(&mol);
        let mut evaluator = RestraintForceField::default()
            .create_evaluator(&mol, start.clone())
            .unwrap();
        evaluator.add_fixed_point(0).unwrap();
        evaluator.add_fixed_point(3).unwrap();
        evaluator.initialize();
        evaluator.minimize(500);

        let end = evaluator.into_positions();
        assert_eq!(end[0], start[0]);
        assert_eq!(end[3], start[3]);
        assert_ne!(end[1], start[1]);
    }

    #[test]
    fn bounded_constraint_limits_displacement_against_a_strong_pull() {
        let atoms = vec![
            Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)),
            Atom::new(Element::C, Point3::new(1.5, 0.0, 0.0)),
        ];
        let mol =
            Molecule::from_parts("ethane", atoms, vec![Bond::new(0, 1, BondOrder::Single)])
                .unwrap();
        let anchor = Point3::new(3.0, 0.0, 0.0);
        let mut evaluator = RestraintForceField::default()
            .create_evaluator(&mol, vec![Point3::origin(), anchor])
            .unwrap();
        evaluator.add_fixed_point(0).unwrap();
        evaluator
            .add_position_constraint(1, anchor, 0.2, 1e5)
            .unwrap();
        evaluator.initialize();
        for _ in 0..10 {
            if evaluator.minimize(200).is_converged() {
                break;
            }
        }

        let moved = (evaluator.positions()[1] - anchor).norm();
        assert!(moved > 0.15, "atom should use its allowed radius, moved {moved}");
        assert!(moved <= 0.2 + 0.02, "displacement {moved} exceeds bound");
    }
}

use crate::core::embedding::Embedder;
use crate::core::embedding::perturbation::PerturbationEmbedder;
use crate::core::forcefield::evaluator::ForceField;
use crate::core::forcefield::restraint::RestraintForceField;
use crate::core::models::conformer::{Conformer, ConformerId, Ensemble, RemovalReason};
use crate::core::models::constraints::ConstraintSpec;
use crate::core::models::molecule::Molecule;
use crate::engine::config::SearchConfig;
use crate::engine::context::SearchContext;
use crate::engine::energy::EnergyTable;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks;
use nalgebra::Point3;
use tracing::{info, instrument, warn};

/// Lowest energy recorded during minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestConformer {
    pub id: ConformerId,
    pub energy: f64,
    /// `false` if a later filter removed the conformer.
    pub live: bool,
}

/// Conformer counts at each stage of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStatistics {
    pub requested: usize,
    pub generated: usize,
    pub minimized: usize,
    pub not_converged: usize,
    pub outside_window: usize,
    pub redundant: usize,
}

impl SearchStatistics {
    pub fn survivors(&self) -> usize {
        self.minimized - self.outside_window - self.redundant
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Every generated conformer; removed ones keep their removal reason.
    pub ensemble: Ensemble,
    /// Energies of the surviving conformers only.
    pub energies: EnergyTable,
    pub best: Option<BestConformer>,
    pub statistics: SearchStatistics,
}

impl SearchResult {
    /// Surviving conformers in generation order, paired with their energies.
    pub fn live_conformers(&self) -> impl Iterator<Item = (&Conformer, f64)> + '_ {
        self.ensemble
            .live()
            .filter_map(|c| self.energies.get(c.id()).map(|e| (c, e)))
    }

    /// Coordinates of the best conformer, even if it was filtered out later.
    pub fn best_positions(&self) -> Option<&[Point3<f64>]> {
        let best = self.best?;
        self.ensemble.get_any(best.id).map(Conformer::positions)
    }
}

/// Runs the full search with the built-in embedder and force field.
pub fn run_with_defaults(
    molecule: &Molecule,
    config: &SearchConfig,
    reporter: &ProgressReporter,
) -> Result<SearchResult, EngineError> {
    let embedder = PerturbationEmbedder::new(config.perturbation);
    let forcefield = RestraintForceField::default();
    run(molecule, config, &embedder, &forcefield, reporter)
}

/// Generates, minimizes, and prunes a conformer ensemble for `molecule`.
///
/// The configuration, the starting geometry, and the constraint atoms are
/// all checked before any candidate is generated. Stages then run strictly
/// in order: generation, minimization, energy window, RMS sieve.
#[instrument(skip_all, name = "search_workflow", fields(molecule = molecule.name()))]
pub fn run<E, F>(
    molecule: &Molecule,
    config: &SearchConfig,
    embedder: &E,
    forcefield: &F,
    reporter: &ProgressReporter,
) -> Result<SearchResult, EngineError>
where
    E: Embedder + ?Sized,
    F: ForceField + ?Sized,
{
    // === Phase 0: Validation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    config.validate()?;
    molecule.validate_starting_geometry()?;
    let constraints = ConstraintSpec::new(
        molecule,
        &config.constrained_atoms,
        config.max_displacement,
    )?;
    forcefield.create_evaluator(molecule, molecule.positions())?;
    info!(
        atoms = molecule.atom_count(),
        constrained = constraints.len(),
        "Inputs validated."
    );
    reporter.report(Progress::PhaseFinish);

    let context = SearchContext::new(molecule, config, &constraints, reporter);

    // === Phase 1: Candidate generation ===
    let mut ensemble = tasks::generation::run(&context, embedder)?;
    let generated = ensemble.total_count();

    // === Phase 2: Constrained minimization ===
    let tracker = tasks::minimization::run(&context, forcefield, &mut ensemble);
    let (mut energies, lowest) = tracker.into_parts();
    let minimized = energies.len();
    let not_converged = ensemble.removed_count(|r| matches!(r, RemovalReason::NotConverged));

    // === Phase 3: Energy window ===
    let outside_window = tasks::energy_window::run(&context, &mut ensemble, &mut energies)?;

    // === Phase 4: RMS sieve ===
    let redundant = tasks::rms_sieve::run(&context, &mut ensemble, &mut energies)?;

    let best = lowest.map(|(id, energy)| BestConformer {
        id,
        energy,
        live: ensemble.is_live(id),
    });
    if let Some(b) = best.filter(|b| !b.live) {
        warn!(conformer = %b.id, "Lowest-energy conformer did not survive filtering.");
    }

    let statistics = SearchStatistics {
        requested: config.num_conformers,
        generated,
        minimized,
        not_converged,
        outside_window,
        redundant,
    };
    info!(
        survivors = ensemble.live_count(),
        best_energy = best.map(|b| b.energy),
        "Search complete."
    );

    Ok(SearchResult {
        ensemble,
        energies,
        best,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::embedding::{EmbedRequest, EmbeddingError};
    use crate::core::forcefield::evaluator::{Evaluator, ForceFieldError, MinimizeStatus};
    use crate::core::models::atom::{Atom, Element};
    use crate::core::models::topology::BondOrder;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn water() -> Molecule {
        let mut mol = Molecule::new("water");
        let o = mol.add_atom(Atom::new(Element::O, Point3::new(0.0, 0.0, 0.0)));
        let h1 = mol.add_atom(Atom::new(Element::H, Point3::new(0.96, 0.0, 0.0)));
        let h2 = mol.add_atom(Atom::new(Element::H, Point3::new(-0.24, 0.93, 0.0)));
        mol.add_bond(o, h1, BondOrder::Single).unwrap();
        mol.add_bond(o, h2, BondOrder::Single).unwrap();
        mol
    }

    fn config() -> SearchConfig {
        SearchConfig {
            num_conformers: 5,
            random_seed: Some(7),
            ..SearchConfig::default()
        }
    }

    /// Returns copies of the input geometry and records whether it was called.
    #[derive(Default)]
    struct CopyEmbedder {
        called: AtomicBool,
    }

    impl Embedder for CopyEmbedder {
        fn embed(
            &self,
            molecule: &Molecule,
            request: &EmbedRequest,
        ) -> Result<Vec<Vec<Point3<f64>>>, EmbeddingError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(vec![molecule.positions(); request.count])
        }
    }

    struct StuckEvaluator(Vec<Point3<f64>>);

    impl Evaluator for StuckEvaluator {
        fn add_fixed_point(&mut self, _atom: usize) -> Result<(), ForceFieldError> {
            Ok(())
        }
        fn add_position_constraint(
            &mut self,
            _atom: usize,
            _anchor: Point3<f64>,
            _max_displacement: f64,
            _force_constant: f64,
        ) -> Result<(), ForceFieldError> {
            Ok(())
        }
        fn initialize(&mut self) {}
        fn minimize(&mut self, _max_steps: usize) -> MinimizeStatus {
            MinimizeStatus::NotConverged
        }
        fn energy(&self) -> f64 {
            0.0
        }
        fn positions(&self) -> &[Point3<f64>] {
            &self.0
        }
        fn into_positions(self) -> Vec<Point3<f64>> {
            self.0
        }
    }

    struct NeverConverges;

    impl ForceField for NeverConverges {
        type Evaluator = StuckEvaluator;
        fn create_evaluator(
            &self,
            _molecule: &Molecule,
            positions: Vec<Point3<f64>>,
        ) -> Result<StuckEvaluator, ForceFieldError> {
            Ok(StuckEvaluator(positions))
        }
    }

    #[test]
    fn identical_candidates_collapse_to_one_survivor() {
        let mol = water();
        let reporter = ProgressReporter::new();
        let result = run(
            &mol,
            &config(),
            &CopyEmbedder::default(),
            &RestraintForceField::default(),
            &reporter,
        )
        .unwrap();

        assert_eq!(result.statistics.generated, 5);
        assert_eq!(result.statistics.minimized, 5);
        assert_eq!(result.statistics.redundant, 4);
        assert_eq!(result.statistics.survivors(), 1);
        assert_eq!(result.ensemble.live_ids(), vec![ConformerId::new(0)]);

        let best = result.best.unwrap();
        assert!(best.live);
        assert_eq!(result.energies.get(best.id), Some(best.energy));
        assert_eq!(result.best_positions().unwrap().len(), 3);
    }

    #[test]
    fn invalid_constraint_fails_before_generation() {
        let mol = water();
        let embedder = CopyEmbedder::default();
        let mut cfg = config();
        cfg.constrained_atoms = vec![0, 3];
        let err = run(
            &mol,
            &cfg,
            &embedder,
            &RestraintForceField::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidConstraint { .. }));
        assert!(!embedder.called.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_molecule_has_no_starting_geometry() {
        let err = run_with_defaults(&Molecule::new("empty"), &config(), &ProgressReporter::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::NoStartingGeometry { .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = SearchConfig {
            num_conformers: 0,
            ..SearchConfig::default()
        };
        let err = run_with_defaults(&water(), &cfg, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }

    #[test]
    fn nothing_converging_surfaces_as_an_empty_ensemble() {
        let err = run(
            &water(),
            &config(),
            &CopyEmbedder::default(),
            &NeverConverges,
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::EmptyEnsemble {
                stage: "energy_window"
            }
        ));
    }

    #[test]
    fn stages_report_in_pipeline_order() {
        use std::sync::Mutex;
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        run(
            &water(),
            &config(),
            &CopyEmbedder::default(),
            &RestraintForceField::default(),
            &reporter,
        )
        .unwrap();
        drop(reporter);
        assert_eq!(
            phases.into_inner().unwrap(),
            vec![
                "Preparation",
                "Generation",
                "Minimization",
                "Energy Window",
                "RMS Sieve"
            ]
        );
    }
}

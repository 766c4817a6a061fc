use crate::core::forcefield::evaluator::{Evaluator, ForceField};
use crate::core::models::conformer::{ConformerId, Ensemble, RemovalReason};
use crate::core::models::constraints::ConstraintKind;
use crate::engine::context::SearchContext;
use crate::engine::energy::EnergyTracker;
use crate::engine::progress::Progress;
use nalgebra::Point3;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug)]
struct WorkUnit {
    id: ConformerId,
    positions: Vec<Point3<f64>>,
}

#[derive(Debug)]
struct Relaxed {
    positions: Vec<Point3<f64>>,
    energy: f64,
    cycles: usize,
}

/// Relaxes every live conformer under the search's positional constraints.
///
/// Conformers are minimized independently, in parallel when the `parallel`
/// feature is enabled. Results are merged in id order by this thread alone:
/// converged conformers get their relaxed coordinates and an energy record,
/// the rest are removed as [`RemovalReason::NotConverged`]. Failures of a
/// single conformer never abort the stage.
#[instrument(skip_all, name = "minimization_task")]
pub fn run<F>(context: &SearchContext, forcefield: &F, ensemble: &mut Ensemble) -> EnergyTracker
where
    F: ForceField + ?Sized,
{
    let work_list: Vec<WorkUnit> = ensemble
        .live()
        .map(|c| WorkUnit {
            id: c.id(),
            positions: c.positions().to_vec(),
        })
        .collect();

    info!(
        conformers = work_list.len(),
        max_cycles = context.config.max_cycles,
        "Minimizing candidate conformers."
    );
    context
        .reporter
        .report(Progress::PhaseStart { name: "Minimization" });
    context.reporter.report(Progress::TaskStart {
        total_steps: work_list.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = work_list.into_iter();

    #[cfg(feature = "parallel")]
    let iterator = work_list.into_par_iter();

    let results: Vec<(ConformerId, Option<Relaxed>)> = iterator
        .map(|unit| {
            let outcome = relax(context, forcefield, unit.id, unit.positions);
            context.reporter.report(Progress::TaskIncrement);
            (unit.id, outcome)
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);

    let mut tracker = EnergyTracker::new();
    for (id, outcome) in results {
        match outcome {
            Some(relaxed) => {
                debug!(
                    conformer = %id,
                    energy = relaxed.energy,
                    cycles = relaxed.cycles,
                    "Conformer converged."
                );
                ensemble.set_positions(id, relaxed.positions);
                tracker.record(id, relaxed.energy);
            }
            None => {
                ensemble.remove(id, RemovalReason::NotConverged);
            }
        }
    }

    info!(
        converged = tracker.table().len(),
        discarded = ensemble.removed_count(|r| matches!(r, RemovalReason::NotConverged)),
        minimum = tracker.current_minimum(),
        "Minimization finished."
    );
    context.reporter.report(Progress::StageSummary {
        stage: "minimization",
        live: ensemble.live_count(),
    });
    context.reporter.report(Progress::PhaseFinish);
    tracker
}

fn relax<F>(
    context: &SearchContext,
    forcefield: &F,
    id: ConformerId,
    positions: Vec<Point3<f64>>,
) -> Option<Relaxed>
where
    F: ForceField + ?Sized,
{
    let config = context.config;
    let mut evaluator = match forcefield.create_evaluator(context.molecule, positions) {
        Ok(evaluator) => evaluator,
        Err(e) => {
            warn!(conformer = %id, error = %e, "Could not set up evaluator; discarding conformer.");
            return None;
        }
    };

    for constraint in context.constraints.iter() {
        let added = match constraint.kind {
            ConstraintKind::Fixed => evaluator.add_fixed_point(constraint.atom),
            ConstraintKind::Bounded { max_displacement } => evaluator.add_position_constraint(
                constraint.atom,
                constraint.reference,
                max_displacement,
                config.force_constant,
            ),
        };
        if let Err(e) = added {
            warn!(conformer = %id, error = %e, "Could not add constraint; discarding conformer.");
            return None;
        }
    }

    evaluator.initialize();

    let Some(cycles) = (1..=config.max_cycles)
        .find(|_| evaluator.minimize(config.max_steps_per_cycle).is_converged())
    else {
        debug!(conformer = %id, cycles = config.max_cycles, "Conformer did not converge.");
        return None;
    };

    let energy = evaluator.energy();
    if !energy.is_finite() {
        warn!(conformer = %id, energy, "Non-finite energy after minimization; discarding conformer.");
        return None;
    }

    Some(Relaxed {
        positions: evaluator.into_positions(),
        energy,
        cycles,
    })
}

use crate::core::models::conformer::{Ensemble, RemovalReason};
use crate::engine::context::SearchContext;
use crate::engine::energy::EnergyTable;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use tracing::{debug, info, instrument};

/// Drops conformers whose energy exceeds `minimum + energy_window`.
///
/// Removal applies to both the ensemble and the energy table. The minimum
/// conformer always survives. Fails with `EmptyEnsemble` when no energy was
/// recorded at all. Returns the number of removed conformers.
#[instrument(skip_all, name = "energy_window_task")]
pub fn run(
    context: &SearchContext,
    ensemble: &mut Ensemble,
    energies: &mut EnergyTable,
) -> Result<usize, EngineError> {
    context
        .reporter
        .report(Progress::PhaseStart { name: "Energy Window" });

    let (_, minimum) = energies.minimum().ok_or(EngineError::EmptyEnsemble {
        stage: "energy_window",
    })?;
    let max_allowed = minimum + context.config.energy_window;
    info!(minimum, max_allowed, "Applying energy window.");

    let rejected: Vec<_> = energies
        .iter()
        .filter(|&(_, e)| e > max_allowed)
        .collect();
    for &(id, energy) in &rejected {
        debug!(conformer = %id, energy, "Outside energy window.");
        ensemble.remove(id, RemovalReason::OutsideEnergyWindow);
        energies.remove(id);
    }

    info!(
        removed = rejected.len(),
        remaining = energies.len(),
        "Energy window applied."
    );
    context.reporter.report(Progress::StageSummary {
        stage: "energy_window",
        live: ensemble.live_count(),
    });
    context.reporter.report(Progress::PhaseFinish);
    Ok(rejected.len())
}

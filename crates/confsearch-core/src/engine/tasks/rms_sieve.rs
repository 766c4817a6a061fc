use crate::core::models::conformer::{ConformerId, Ensemble, RemovalReason};
use crate::core::utils::geometry::{Superposition, superposed_rmsd};
use crate::engine::context::SearchContext;
use crate::engine::energy::EnergyTable;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::utils::triangular::{condensed_len, condensed_to_pair};
use nalgebra::Point3;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Removes geometric near-duplicates, keeping the lower-energy member.
///
/// All live conformers are first superposed onto the earliest live one. The
/// heavy-atom RMSD matrix is then computed once, in condensed form, and
/// scanned in order. For a pair within `rms_threshold` the higher-energy
/// conformer is removed; on equal energies the later one goes. A pair
/// involving a conformer that was already removed earlier in the scan is
/// skipped because its energy entry is gone. Returns the number of removed
/// conformers.
#[instrument(skip_all, name = "rms_sieve_task")]
pub fn run(
    context: &SearchContext,
    ensemble: &mut Ensemble,
    energies: &mut EnergyTable,
) -> Result<usize, EngineError> {
    if energies.is_empty() {
        return Err(EngineError::EmptyEnsemble { stage: "rms_sieve" });
    }
    context
        .reporter
        .report(Progress::PhaseStart { name: "RMS Sieve" });

    let ids = ensemble.live_ids();
    align_to_first(ensemble, &ids)?;

    let heavy = context.molecule.heavy_atom_indices();
    let views: Vec<Vec<Point3<f64>>> = ids
        .iter()
        .map(|&id| {
            ensemble
                .get(id)
                .map(|c| heavy.iter().map(|&i| c.positions()[i]).collect())
                .ok_or_else(|| EngineError::Internal(format!("conformer {id} vanished")))
        })
        .collect::<Result<_, _>>()?;

    let matrix = condensed_rmsd_matrix(&views)?;
    let threshold = context.config.rms_threshold;
    info!(
        conformers = ids.len(),
        pairs = matrix.len(),
        threshold,
        "Scanning pairwise heavy-atom RMSD."
    );

    let mut removed = 0;
    for (k, &rmsd) in matrix.iter().enumerate() {
        if rmsd > threshold {
            continue;
        }
        let (row, col) = condensed_to_pair(k);
        let (later, earlier) = (ids[row], ids[col]);
        let (Some(later_energy), Some(earlier_energy)) =
            (energies.get(later), energies.get(earlier))
        else {
            continue;
        };

        let (drop, keep) = if later_energy >= earlier_energy {
            (later, earlier)
        } else {
            (earlier, later)
        };
        debug!(dropped = %drop, kept = %keep, rmsd, "Redundant conformer.");
        ensemble.remove(drop, RemovalReason::Redundant { kept: keep });
        energies.remove(drop);
        removed += 1;
    }

    info!(removed, remaining = energies.len(), "RMS sieve finished.");
    context.reporter.report(Progress::StageSummary {
        stage: "rms_sieve",
        live: ensemble.live_count(),
    });
    context.reporter.report(Progress::PhaseFinish);
    Ok(removed)
}

/// Rigidly superposes every listed conformer onto the first one, using all atoms.
fn align_to_first(ensemble: &mut Ensemble, ids: &[ConformerId]) -> Result<(), EngineError> {
    let Some((&first, rest)) = ids.split_first() else {
        return Ok(());
    };
    let reference = ensemble
        .get(first)
        .map(|c| c.positions().to_vec())
        .ok_or_else(|| EngineError::Internal(format!("conformer {first} vanished")))?;

    for &id in rest {
        let positions = ensemble
            .positions_mut(id)
            .ok_or_else(|| EngineError::Internal(format!("conformer {id} vanished")))?;
        if let Some(fit) = Superposition::fit(&reference, positions) {
            fit.apply_in_place(positions);
        }
    }
    Ok(())
}

fn condensed_rmsd_matrix(views: &[Vec<Point3<f64>>]) -> Result<Vec<f64>, EngineError> {
    let len = condensed_len(views.len());

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..len;

    #[cfg(feature = "parallel")]
    let iterator = (0..len).into_par_iter();

    iterator
        .map(|k| {
            let (row, col) = condensed_to_pair(k);
            superposed_rmsd(&views[row], &views[col]).ok_or_else(|| {
                EngineError::Internal(format!("RMSD undefined for pair ({row}, {col})"))
            })
        })
        .collect()
}

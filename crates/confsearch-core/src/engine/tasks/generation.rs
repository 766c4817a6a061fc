use crate::core::embedding::{EmbedRequest, Embedder};
use crate::core::models::conformer::Ensemble;
use crate::engine::context::SearchContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use tracing::{info, instrument, warn};

/// Requests raw candidates from the embedder and wraps them in an ensemble.
///
/// Constrained atoms are passed as a coordinate map pinned to their
/// reference positions. Receiving fewer candidates than requested is normal;
/// receiving none is reported as an empty ensemble.
#[instrument(skip_all, name = "generation_task")]
pub fn run<E>(context: &SearchContext, embedder: &E) -> Result<Ensemble, EngineError>
where
    E: Embedder + ?Sized,
{
    let config = context.config;
    info!(
        requested = config.num_conformers,
        constrained_atoms = context.constraints.len(),
        "Generating candidate conformers."
    );
    context
        .reporter
        .report(Progress::PhaseStart { name: "Generation" });

    let request = EmbedRequest {
        count: config.num_conformers,
        prune_rms_threshold: config.rms_threshold,
        coord_map: context.constraints.coord_map(),
        seed: config.random_seed,
    };
    let mut coordinates = embedder.embed(context.molecule, &request)?;

    if coordinates.len() > config.num_conformers {
        warn!(
            returned = coordinates.len(),
            "Embedder returned more candidates than requested; keeping the first ones."
        );
        coordinates.truncate(config.num_conformers);
    }

    let atom_count = context.molecule.atom_count();
    let ensemble = Ensemble::from_coordinates(atom_count, coordinates).ok_or_else(|| {
        EngineError::Internal(format!(
            "embedder returned a coordinate set that does not have {atom_count} atoms"
        ))
    })?;

    info!(generated = ensemble.live_count(), "Candidate generation finished.");
    context.reporter.report(Progress::StageSummary {
        stage: "generation",
        live: ensemble.live_count(),
    });
    context.reporter.report(Progress::PhaseFinish);

    if ensemble.is_empty() {
        return Err(EngineError::EmptyEnsemble {
            stage: "generation",
        });
    }
    Ok(ensemble)
}

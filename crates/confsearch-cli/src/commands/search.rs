use crate::cli::SearchArgs;
use crate::config::{AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::paths::{OutputPaths, display_name};
use crate::utils::progress::CliProgressHandler;
use confsearch::core::io::energies;
use confsearch::core::io::molfile::{MolFile, MolHeader};
use confsearch::core::io::sdf::SdfWriter;
use confsearch::core::io::traits::MolecularFile;
use confsearch::core::models::molecule::Molecule;
use confsearch::engine::error::EngineError;
use confsearch::engine::progress::ProgressReporter;
use confsearch::workflows::report::SearchReport;
use confsearch::workflows::search::{self, SearchResult};
use tracing::{info, warn};

/// What happened to the input molecule.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed { survivors: usize, best_energy: f64 },
    Skipped { reason: String },
}

pub fn run(args: SearchArgs, quiet: bool) -> Result<()> {
    info!("Merging configuration from defaults, file, and CLI arguments...");
    let app = build_config(&args)?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting conformer search for {}...", app.input_path.display());
    match execute(&app, &reporter)? {
        SearchOutcome::Completed {
            survivors,
            best_energy,
        } => {
            println!(
                "✓ {} conformer(s) kept; lowest energy {:.4} kcal/mol. Results in {}",
                survivors,
                best_energy,
                app.output_dir.display()
            );
        }
        SearchOutcome::Skipped { reason } => {
            println!("Warning: molecule skipped: {}", reason);
        }
    }
    Ok(())
}

/// Runs the search for `app.input_path` and writes every output file.
///
/// An input that cannot be read, or that has no usable geometry, is not an
/// error: it is logged, marked as failed in the report, and skipped.
pub fn execute(app: &AppConfig, reporter: &ProgressReporter) -> Result<SearchOutcome> {
    std::fs::create_dir_all(&app.output_dir)?;
    let paths = OutputPaths::new(&app.output_dir, &app.input_path);
    let name = display_name(&app.input_path);
    let mut report = SearchReport::new(&app.core_config);

    info!("Loading input structure from {:?}", &app.input_path);
    let outcome = match MolFile::read_from_path(&app.input_path) {
        Err(e) => skip(&name, e.to_string()),
        Ok((molecule, header)) => {
            match search::run_with_defaults(&molecule, &app.core_config, reporter) {
                Ok(result) => {
                    finish(&name, &molecule, &header, &result, &paths, &mut report)?
                }
                Err(
                    e @ (EngineError::NoStartingGeometry { .. }
                    | EngineError::EmptyEnsemble { .. }),
                ) => skip(&name, e.to_string()),
                Err(e) => return Err(e.into()),
            }
        }
    };

    if let SearchOutcome::Skipped { .. } = outcome {
        report.push_failed(&name);
    }
    report
        .write_to_path(&paths.report)
        .map_err(|e| CliError::output(&paths.report, e))?;
    info!("Report written to {:?}", &paths.report);
    Ok(outcome)
}

/// Writes the outputs of a finished search. A result without a best
/// conformer has nothing to write and is skipped.
fn finish(
    name: &str,
    molecule: &Molecule,
    header: &MolHeader,
    result: &SearchResult,
    paths: &OutputPaths,
    report: &mut SearchReport,
) -> Result<SearchOutcome> {
    let Some(best) = result.best else {
        return Ok(skip(name, "no conformer was minimized".to_string()));
    };
    write_outputs(molecule, header, result, paths)?;
    report.push_energy(name, best.energy);
    Ok(SearchOutcome::Completed {
        survivors: result.ensemble.live_count(),
        best_energy: best.energy,
    })
}

fn skip(name: &str, reason: String) -> SearchOutcome {
    warn!("Couldn't process molecule {}: {}", name, reason);
    SearchOutcome::Skipped { reason }
}

fn write_outputs(
    molecule: &Molecule,
    input_header: &MolHeader,
    result: &SearchResult,
    paths: &OutputPaths,
) -> Result<()> {
    let header = MolHeader {
        name: input_header.name.clone(),
        comment: input_header.comment.clone(),
        ..MolHeader::default()
    };

    if let Some(positions) = result.best_positions() {
        MolFile::write_conformer_to_path(molecule, positions, &header, &paths.best_conformer)
            .map_err(|e| CliError::output(&paths.best_conformer, e))?;
        info!("Lowest energy conformer saved to {:?}", &paths.best_conformer);
    }

    let mut writer =
        SdfWriter::create(&paths.ensemble).map_err(|e| CliError::output(&paths.ensemble, e))?;
    let written = writer
        .write_ensemble(molecule, &header, &result.ensemble, |id| {
            result.energies.get(id)
        })
        .map_err(|e| CliError::output(&paths.ensemble, e))?;
    writer
        .finish()
        .map_err(|e| CliError::output(&paths.ensemble, e))?;
    info!("{} conformer(s) saved to {:?}", written, &paths.ensemble);

    energies::write_csv_to_path(&paths.energies, result.energies.iter())
        .map_err(|e| CliError::output(&paths.energies, e))?;

    let stats = &result.statistics;
    info!(
        generated = stats.generated,
        not_converged = stats.not_converged,
        outside_window = stats.outside_window,
        redundant = stats.redundant,
        "Search statistics."
    );
    Ok(())
}

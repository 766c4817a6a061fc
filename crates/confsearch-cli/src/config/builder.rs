use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::SearchArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use confsearch::engine::config as core_config;
use std::path::PathBuf;
use std::str::FromStr;

/// Merges defaults, the optional config file, command-line flags, and
/// `--set` overrides, in increasing order of precedence.
pub fn build_config(args: &SearchArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let search_file = file_config.search.take().unwrap_or_default();
    let min_file = file_config.minimization.take().unwrap_or_default();
    let constraints_file = file_config.constraints.take().unwrap_or_default();
    let output_file = file_config.output.take().unwrap_or_default();

    let constrained_atoms = if args.fixed_atoms.is_empty() {
        constraints_file.atoms
    } else {
        args.fixed_atoms.clone()
    };

    let core_config = core_config::SearchConfig::builder()
        .num_conformers(
            args.num_conformers
                .or(search_file.num_conformers)
                .unwrap_or(defaults.num_conformers),
        )
        .rms_threshold(
            args.rms_threshold
                .or(search_file.rms_threshold)
                .unwrap_or(defaults.rms_threshold),
        )
        .energy_window(
            args.energy_window
                .or(search_file.energy_window)
                .unwrap_or(defaults.energy_window),
        )
        .random_seed(args.seed.or(search_file.random_seed))
        .perturbation(search_file.perturbation.unwrap_or(defaults.perturbation))
        .max_cycles(
            args.max_cycles
                .or(min_file.max_cycles)
                .unwrap_or(defaults.max_cycles),
        )
        .max_steps_per_cycle(
            min_file
                .max_steps_per_cycle
                .unwrap_or(defaults.max_steps_per_cycle),
        )
        .force_constant(min_file.force_constant.unwrap_or(defaults.force_constant))
        .constrained_atoms(constrained_atoms)
        .max_displacement(args.max_displacement.or(constraints_file.max_displacement))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let output_dir = args
        .output_dir
        .clone()
        .or(output_file.directory.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(&defaults.output_dir));

    Ok(AppConfig {
        input_path: args.input.clone(),
        output_dir,
        core_config,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) =
            parser::parse_assignment(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

        match key {
            "search.num-conformers" => {
                config.search.get_or_insert_with(Default::default).num_conformers =
                    Some(parse_value(key, value, "integer")?);
            }
            "search.rms-threshold" => {
                config.search.get_or_insert_with(Default::default).rms_threshold =
                    Some(parse_value(key, value, "float")?);
            }
            "search.energy-window" => {
                config.search.get_or_insert_with(Default::default).energy_window =
                    Some(parse_value(key, value, "float")?);
            }
            "search.random-seed" => {
                config.search.get_or_insert_with(Default::default).random_seed =
                    Some(parse_value(key, value, "integer")?);
            }
            "search.perturbation" => {
                config.search.get_or_insert_with(Default::default).perturbation =
                    Some(parse_value(key, value, "float")?);
            }
            "minimization.max-cycles" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .max_cycles = Some(parse_value(key, value, "integer")?);
            }
            "minimization.max-steps-per-cycle" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .max_steps_per_cycle = Some(parse_value(key, value, "integer")?);
            }
            "minimization.force-constant" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .force_constant = Some(parse_value(key, value, "float")?);
            }
            "constraints.atoms" => {
                config.constraints.get_or_insert_with(Default::default).atoms =
                    parser::parse_atom_list(value).map_err(|e| CliError::Config(e.to_string()))?;
            }
            "constraints.max-displacement" => {
                config
                    .constraints
                    .get_or_insert_with(Default::default)
                    .max_displacement = Some(parse_value(key, value, "float")?);
            }
            "output.directory" => {
                config.output.get_or_insert_with(Default::default).directory =
                    Some(value.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

use confsearch::engine::config as core_config;

pub const DEFAULT_OUTPUT_DIR: &str = "confsearch";

/// Values used when neither the config file nor the command line sets them.
pub struct DefaultsConfig {
    pub num_conformers: usize,
    pub rms_threshold: f64,
    pub energy_window: f64,
    pub perturbation: f64,
    pub max_cycles: usize,
    pub max_steps_per_cycle: usize,
    pub force_constant: f64,
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            num_conformers: core_config::DEFAULT_NUM_CONFORMERS,
            rms_threshold: core_config::DEFAULT_RMS_THRESHOLD,
            energy_window: core_config::DEFAULT_ENERGY_WINDOW,
            perturbation: core_config::DEFAULT_PERTURBATION,
            max_cycles: core_config::DEFAULT_MAX_CYCLES,
            max_steps_per_cycle: core_config::DEFAULT_MAX_STEPS_PER_CYCLE,
            force_constant: core_config::DEFAULT_FORCE_CONSTANT,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

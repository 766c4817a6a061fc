use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub const DEFAULT_NUM_CONFORMERS: usize = 10;
pub const DEFAULT_RMS_THRESHOLD: f64 = 1.0;
pub const DEFAULT_ENERGY_WINDOW: f64 = 5.0;
pub const DEFAULT_MAX_CYCLES: usize = 10;
pub const DEFAULT_MAX_STEPS_PER_CYCLE: usize = 200;
pub const DEFAULT_FORCE_CONSTANT: f64 = 1e5;
pub const DEFAULT_PERTURBATION: f64 = 0.5;

/// Parameters of one conformer search, applied uniformly to every conformer.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Number of candidates requested from the embedder.
    pub num_conformers: usize,
    /// Heavy-atom RMSD (Angstrom) at or below which two conformers are duplicates.
    pub rms_threshold: f64,
    /// Width of the accepted band above the minimum energy (kcal/mol).
    pub energy_window: f64,
    /// Minimization cycles tried before a conformer is discarded.
    pub max_cycles: usize,
    /// Optimizer steps within one cycle.
    pub max_steps_per_cycle: usize,
    /// Allowed drift of constrained atoms. `None` fixes them in place.
    pub max_displacement: Option<f64>,
    /// 0-based indices of constrained atoms.
    pub constrained_atoms: Vec<usize>,
    /// Spring constant of bounded position constraints.
    pub force_constant: f64,
    pub random_seed: Option<u64>,
    /// Amplitude (Angstrom) of the built-in perturbation embedder.
    pub perturbation: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_conformers: DEFAULT_NUM_CONFORMERS,
            rms_threshold: DEFAULT_RMS_THRESHOLD,
            energy_window: DEFAULT_ENERGY_WINDOW,
            max_cycles: DEFAULT_MAX_CYCLES,
            max_steps_per_cycle: DEFAULT_MAX_STEPS_PER_CYCLE,
            max_displacement: None,
            constrained_atoms: Vec::new(),
            force_constant: DEFAULT_FORCE_CONSTANT,
            random_seed: None,
            perturbation: DEFAULT_PERTURBATION,
        }
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_count("num_conformers", self.num_conformers)?;
        positive_count("max_cycles", self.max_cycles)?;
        positive_count("max_steps_per_cycle", self.max_steps_per_cycle)?;
        non_negative("rms_threshold", self.rms_threshold)?;
        non_negative("energy_window", self.energy_window)?;
        non_negative("perturbation", self.perturbation)?;
        positive("force_constant", self.force_constant)?;
        if let Some(d) = self.max_displacement {
            positive("max_displacement", d)?;
        }
        Ok(())
    }
}

fn positive_count(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidParameter {
            name,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a finite, non-negative number (got {value})"),
        });
    }
    Ok(())
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be a finite, positive number (got {value})"),
        });
    }
    Ok(())
}

/// Builder for [`SearchConfig`].
///
/// The four batch parameters (conformer count, RMSD threshold, energy window
/// and cycle budget) are required. Everything else falls back to the
/// defaults of [`SearchConfig::default`].
#[derive(Default)]
pub struct SearchConfigBuilder {
    num_conformers: Option<usize>,
    rms_threshold: Option<f64>,
    energy_window: Option<f64>,
    max_cycles: Option<usize>,
    max_steps_per_cycle: Option<usize>,
    max_displacement: Option<f64>,
    constrained_atoms: Vec<usize>,
    force_constant: Option<f64>,
    random_seed: Option<u64>,
    perturbation: Option<f64>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_conformers(mut self, n: usize) -> Self {
        self.num_conformers = Some(n);
        self
    }
    pub fn rms_threshold(mut self, threshold: f64) -> Self {
        self.rms_threshold = Some(threshold);
        self
    }
    pub fn energy_window(mut self, window: f64) -> Self {
        self.energy_window = Some(window);
        self
    }
    pub fn max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = Some(cycles);
        self
    }
    pub fn max_steps_per_cycle(mut self, steps: usize) -> Self {
        self.max_steps_per_cycle = Some(steps);
        self
    }
    pub fn max_displacement(mut self, displacement: Option<f64>) -> Self {
        self.max_displacement = displacement;
        self
    }
    pub fn constrained_atoms(mut self, atoms: Vec<usize>) -> Self {
        self.constrained_atoms = atoms;
        self
    }
    pub fn force_constant(mut self, k: f64) -> Self {
        self.force_constant = Some(k);
        self
    }
    pub fn random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }
    pub fn perturbation(mut self, amplitude: f64) -> Self {
        self.perturbation = Some(amplitude);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let config = SearchConfig {
            num_conformers: self
                .num_conformers
                .ok_or(ConfigError::MissingParameter("num_conformers"))?,
            rms_threshold: self
                .rms_threshold
                .ok_or(ConfigError::MissingParameter("rms_threshold"))?,
            energy_window: self
                .energy_window
                .ok_or(ConfigError::MissingParameter("energy_window"))?,
            max_cycles: self
                .max_cycles
                .ok_or(ConfigError::MissingParameter("max_cycles"))?,
            max_steps_per_cycle: self
                .max_steps_per_cycle
                .unwrap_or(DEFAULT_MAX_STEPS_PER_CYCLE),
            max_displacement: self.max_displacement,
            constrained_atoms: self.constrained_atoms,
            force_constant: self.force_constant.unwrap_or(DEFAULT_FORCE_CONSTANT),
            random_seed: self.random_seed,
            perturbation: self.perturbation.unwrap_or(DEFAULT_PERTURBATION),
        };
        config.validate()?;
        Ok(config)
    }
}

//! Plain-text summary of one or more searches.

use crate::engine::config::SearchConfig;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// Lowest energy recorded for the molecule, in kcal/mol.
    Energy(f64),
    /// The molecule could not be processed.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub name: String,
    pub outcome: ReportOutcome,
}

/// Report header with the run parameters, followed by one line per molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    rms_threshold: f64,
    energy_window: f64,
    num_conformers: usize,
    entries: Vec<ReportEntry>,
}

impl SearchReport {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            rms_threshold: config.rms_threshold,
            energy_window: config.energy_window,
            num_conformers: config.num_conformers,
            entries: Vec::new(),
        }
    }

    pub fn push_energy(&mut self, name: impl Into<String>, energy: f64) {
        self.entries.push(ReportEntry {
            name: name.into(),
            outcome: ReportOutcome::Energy(energy),
        });
    }

    pub fn push_failed(&mut self, name: impl Into<String>) {
        self.entries.push(ReportEntry {
            name: name.into(),
            outcome: ReportOutcome::Failed,
        });
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.to_string())
    }
}

/// Fixed 8-decimal energy with a leading space for non-negative values,
/// right-aligned in 13 columns.
fn format_energy(energy: f64) -> String {
    let signed = if energy.is_sign_negative() {
        format!("{energy:.8}")
    } else {
        format!(" {energy:.8}")
    };
    format!("{signed:>13}")
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Confsearch -- RMSD threshold  = {} Angstrom,",
            self.rms_threshold
        )?;
        writeln!(
            f,
            "              energy window   = {} kcal/mol,",
            self.energy_window
        )?;
        writeln!(f, "              confs requested = {}", self.num_conformers)?;
        writeln!(f)?;
        writeln!(f, "Energies values of most stable conformers:")?;

        let longest = self
            .entries
            .iter()
            .map(|e| e.name.chars().count())
            .max()
            .unwrap_or(0);
        for entry in &self.entries {
            match entry.outcome {
                ReportOutcome::Energy(energy) => writeln!(
                    f,
                    "{:<longest$} = {} kcal/mol",
                    entry.name,
                    format_energy(energy)
                )?,
                ReportOutcome::Failed => writeln!(f, "{:<longest$} = failed", entry.name)?,
            }
        }
        Ok(())
    }
}

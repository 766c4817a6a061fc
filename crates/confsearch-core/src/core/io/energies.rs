use crate::core::models::conformer::ConformerId;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row of an exported energy table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyRecord {
    pub conformer_id: ConformerId,
    pub energy: f64,
    /// Energy above the lowest energy in the exported set.
    pub relative_energy: f64,
}

/// Builds export rows, preserving input order.
pub fn energy_records(energies: impl IntoIterator<Item = (ConformerId, f64)>) -> Vec<EnergyRecord> {
    let rows: Vec<(ConformerId, f64)> = energies.into_iter().collect();
    let minimum = rows.iter().map(|(_, e)| *e).fold(f64::INFINITY, f64::min);
    rows.into_iter()
        .map(|(conformer_id, energy)| EnergyRecord {
            conformer_id,
            energy,
            relative_energy: energy - minimum,
        })
        .collect()
}

/// Writes `conformer_id,energy,relative_energy` rows and returns the row count.
pub fn write_csv<W: Write>(
    writer: W,
    energies: impl IntoIterator<Item = (ConformerId, f64)>,
) -> Result<usize, csv::Error> {
    let records = energy_records(energies);
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in &records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}

pub fn write_csv_to_path<P: AsRef<Path>>(
    path: P,
    energies: impl IntoIterator<Item = (ConformerId, f64)>,
) -> Result<usize, csv::Error> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), energies)
}

use super::molfile::{MolFileError, MolHeader, write_ctab};
use crate::core::models::conformer::{ConformerId, Ensemble};
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const CONFORMER_ID_TAG: &str = "CONFORMER_ID";
pub const ENERGY_TAG: &str = "ENERGY";

/// Streams connection-table records into a structure-data file.
///
/// Each record is a full V2000 block followed by optional `>  <TAG>` data
/// items and the `$$$$` terminator.
pub struct SdfWriter<W: Write> {
    writer: W,
    records: usize,
}

impl SdfWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, MolFileError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> SdfWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, records: 0 }
    }

    pub fn write_record(
        &mut self,
        molecule: &Molecule,
        positions: &[Point3<f64>],
        header: &MolHeader,
        data: &[(&str, String)],
    ) -> Result<(), MolFileError> {
        write_ctab(&mut self.writer, molecule, positions, header)?;
        for (tag, value) in data {
            writeln!(self.writer, ">  <{tag}>")?;
            writeln!(self.writer, "{value}")?;
            writeln!(self.writer)?;
        }
        writeln!(self.writer, "$$$$")?;
        self.records += 1;
        Ok(())
    }

    /// Writes every live conformer in generation order.
    ///
    /// Records carry the conformer id and, when `energy_of` knows it, the
    /// conformer's energy. Returns the number of records written.
    pub fn write_ensemble(
        &mut self,
        molecule: &Molecule,
        header: &MolHeader,
        ensemble: &Ensemble,
        energy_of: impl Fn(ConformerId) -> Option<f64>,
    ) -> Result<usize, MolFileError> {
        let before = self.records;
        for conformer in ensemble.live() {
            let mut data = vec![(CONFORMER_ID_TAG, conformer.id().to_string())];
            if let Some(energy) = energy_of(conformer.id()) {
                data.push((ENERGY_TAG, format!("{energy:.8}")));
            }
            self.write_record(molecule, conformer.positions(), header, &data)?;
        }
        Ok(self.records - before)
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Flushes buffered output and hands back the inner writer.
    pub fn finish(mut self) -> Result<W, MolFileError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

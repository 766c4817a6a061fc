use super::traits::MolecularFile;
use crate::core::models::atom::{Atom, Element};
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::topology::{Bond, BondOrder};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

const PROGRAM_LINE: &str = "  confsearch      3D";
const CHARGES_PER_PROPERTY_LINE: usize = 8;

/// The three header lines of an MDL connection table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MolHeader {
    pub name: String,
    pub program: String,
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum MolFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {details}")]
    Parse { line: usize, details: String },
    #[error("V3000 connection tables are not supported")]
    UnsupportedV3000,
    #[error("Invalid molecule: {0}")]
    Molecule(#[from] MoleculeError),
    #[error("Coordinate set has {actual} atoms, molecule has {expected}")]
    AtomCountMismatch { expected: usize, actual: usize },
}

impl MolFileError {
    fn parse(line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            line,
            details: details.into(),
        }
    }
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

/// MDL molfile (V2000 connection table) holding one conformer.
pub struct MolFile;

impl MolecularFile for MolFile {
    type Metadata = MolHeader;
    type Error = MolFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Molecule, Self::Metadata), Self::Error> {
        let lines = collect_first_record(reader)?;
        parse_record(&lines)
    }

    fn write_to(
        molecule: &Molecule,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        write_ctab(writer, molecule, &molecule.positions(), metadata)
    }
}

impl MolFile {
    /// Writes `molecule` with its atoms placed at `positions`.
    pub fn write_conformer_to(
        molecule: &Molecule,
        positions: &[Point3<f64>],
        metadata: &MolHeader,
        writer: &mut impl Write,
    ) -> Result<(), MolFileError> {
        write_ctab(writer, molecule, positions, metadata)
    }

    pub fn write_conformer_to_path<P: AsRef<Path>>(
        molecule: &Molecule,
        positions: &[Point3<f64>],
        metadata: &MolHeader,
        path: P,
    ) -> Result<(), MolFileError> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_conformer_to(molecule, positions, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn collect_first_record(reader: &mut impl BufRead) -> Result<Vec<(usize, String)>, MolFileError> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let content = line?;
        if content.trim() == "$$$$" && !lines.is_empty() {
            break;
        }
        lines.push((i + 1, content));
    }
    Ok(lines)
}

fn parse_record(lines: &[(usize, String)]) -> Result<(Molecule, MolHeader), MolFileError> {
    if lines.len() < 4 {
        return Err(MolFileError::parse(
            lines.last().map_or(1, |(ln, _)| *ln),
            "connection table needs a three-line header and a counts line",
        ));
    }

    let header = MolHeader {
        name: lines[0].1.trim().to_string(),
        program: lines[1].1.trim_end().to_string(),
        comment: lines[2].1.trim_end().to_string(),
    };

    let (counts_ln, counts_line) = (&lines[3].0, &lines[3].1);
    if counts_line.contains("V3000") {
        return Err(MolFileError::UnsupportedV3000);
    }
    let atom_count = parse_count(counts_line, 0, *counts_ln, "atom count")?;
    let bond_count = parse_count(counts_line, 3, *counts_ln, "bond count")?;

    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let props_start = bond_start + bond_count;
    if lines.len() < props_start {
        return Err(MolFileError::parse(
            lines.last().map_or(*counts_ln, |(ln, _)| *ln),
            "record ended before all atoms and bonds were listed",
        ));
    }

    let mut atoms = lines[atom_start..bond_start]
        .iter()
        .map(|(ln, raw)| parse_atom(raw, *ln))
        .collect::<Result<Vec<_>, _>>()?;
    let bonds = lines[bond_start..props_start]
        .iter()
        .map(|(ln, raw)| parse_bond(raw, *ln, atom_count))
        .collect::<Result<Vec<_>, _>>()?;

    apply_properties(&lines[props_start..], &mut atoms)?;

    let molecule = Molecule::from_parts(header.name.clone(), atoms, bonds)?;
    Ok((molecule, header))
}

fn parse_count(line: &str, start: usize, ln: usize, what: &str) -> Result<usize, MolFileError> {
    slice_and_trim(line, start, start + 3)
        .parse::<usize>()
        .map_err(|_| MolFileError::parse(ln, format!("invalid {what}")))
}

fn parse_coordinate(raw: &str, start: usize, ln: usize, axis: char) -> Result<f64, MolFileError> {
    slice_and_trim(raw, start, start + 10)
        .parse::<f64>()
        .map_err(|_| MolFileError::parse(ln, format!("invalid {axis} coordinate in atom line")))
}

fn parse_atom(raw: &str, ln: usize) -> Result<Atom, MolFileError> {
    let x = parse_coordinate(raw, 0, ln, 'x')?;
    let y = parse_coordinate(raw, 10, ln, 'y')?;
    let z = parse_coordinate(raw, 20, ln, 'z')?;

    let symbol = slice_and_trim(raw, 31, 34);
    let element = symbol
        .parse::<Element>()
        .map_err(|e| MolFileError::parse(ln, e.to_string()))?;

    let charge_field = slice_and_trim(raw, 36, 39);
    let charge_code = if charge_field.is_empty() {
        0
    } else {
        charge_field
            .parse::<u8>()
            .map_err(|_| MolFileError::parse(ln, "invalid charge code in atom line"))?
    };

    Ok(Atom::new(element, Point3::new(x, y, z)).with_charge(charge_from_code(charge_code)))
}

/// Maps the atom-block charge column to a formal charge.
///
/// Code 4 marks a doublet radical and carries no charge.
fn charge_from_code(code: u8) -> i8 {
    match code {
        1 => 3,
        2 => 2,
        3 => 1,
        5 => -1,
        6 => -2,
        7 => -3,
        _ => 0,
    }
}

fn parse_bond(raw: &str, ln: usize, atom_count: usize) -> Result<Bond, MolFileError> {
    let index = |start: usize, which: &str| {
        slice_and_trim(raw, start, start + 3)
            .parse::<usize>()
            .map_err(|_| MolFileError::parse(ln, format!("invalid {which} atom index")))
    };
    let a1 = index(0, "first")?;
    let a2 = index(3, "second")?;
    let order = slice_and_trim(raw, 6, 9)
        .parse::<u8>()
        .ok()
        .and_then(BondOrder::from_ctfile_code)
        .ok_or_else(|| MolFileError::parse(ln, "unsupported bond order in bond line"))?;

    if a1 == 0 || a2 == 0 || a1 > atom_count || a2 > atom_count {
        return Err(MolFileError::parse(
            ln,
            "bond references atom outside declared range",
        ));
    }
    Ok(Bond::new(a1 - 1, a2 - 1, order))
}

/// Applies the property block up to `M  END`.
///
/// The first `M  CHG` line supersedes every charge given in the atom block.
fn apply_properties(lines: &[(usize, String)], atoms: &mut [Atom]) -> Result<(), MolFileError> {
    let mut charges_reset = false;
    for (ln, raw) in lines {
        if raw.starts_with("M  END") {
            break;
        }
        if !raw.starts_with("M  CHG") {
            continue;
        }
        if !charges_reset {
            atoms.iter_mut().for_each(|a| a.formal_charge = 0);
            charges_reset = true;
        }

        let values = raw[6..]
            .split_whitespace()
            .map(|t| t.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| MolFileError::parse(*ln, "invalid number in M  CHG line"))?;
        let (count, pairs) = values
            .split_first()
            .ok_or_else(|| MolFileError::parse(*ln, "empty M  CHG line"))?;
        let expected = usize::try_from(*count)
            .ok()
            .and_then(|n| n.checked_mul(2))
            .ok_or_else(|| MolFileError::parse(*ln, "invalid M  CHG entry count"))?;
        if pairs.len() != expected {
            return Err(MolFileError::parse(*ln, "M  CHG entry count mismatch"));
        }
        for pair in pairs.chunks_exact(2) {
            let atom = usize::try_from(pair[0])
                .ok()
                .filter(|&a| a >= 1 && a <= atoms.len())
                .ok_or_else(|| MolFileError::parse(*ln, "M  CHG references unknown atom"))?;
            let charge = i8::try_from(pair[1])
                .map_err(|_| MolFileError::parse(*ln, "formal charge out of range"))?;
            atoms[atom - 1].formal_charge = charge;
        }
    }
    Ok(())
}

/// Writes header, counts line, atom and bond blocks, charges and `M  END`.
pub(crate) fn write_ctab(
    writer: &mut impl Write,
    molecule: &Molecule,
    positions: &[Point3<f64>],
    header: &MolHeader,
) -> Result<(), MolFileError> {
    if positions.len() != molecule.atom_count() {
        return Err(MolFileError::AtomCountMismatch {
            expected: molecule.atom_count(),
            actual: positions.len(),
        });
    }

    let name = if header.name.is_empty() {
        molecule.name()
    } else {
        header.name.as_str()
    };
    let program = if header.program.is_empty() {
        PROGRAM_LINE
    } else {
        header.program.as_str()
    };
    writeln!(writer, "{name}")?;
    writeln!(writer, "{program}")?;
    writeln!(writer, "{}", header.comment)?;
    writeln!(
        writer,
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
        molecule.atom_count(),
        molecule.bonds().len()
    )?;

    for (atom, position) in molecule.atoms().iter().zip(positions) {
        writeln!(
            writer,
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
            position.x,
            position.y,
            position.z,
            atom.element.symbol()
        )?;
    }

    for bond in molecule.bonds() {
        writeln!(
            writer,
            "{:>3}{:>3}{:>3}  0",
            bond.atom1 + 1,
            bond.atom2 + 1,
            bond.order.ctfile_code()
        )?;
    }

    let charged: Vec<(usize, i8)> = molecule
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.formal_charge != 0)
        .map(|(i, a)| (i + 1, a.formal_charge))
        .collect();
    for chunk in charged.chunks(CHARGES_PER_PROPERTY_LINE) {
        write!(writer, "M  CHG{:>3}", chunk.len())?;
        for (atom, charge) in chunk {
            write!(writer, " {atom:>3} {charge:>3}")?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "M  END")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const WATER: &str = concat!(
        "water\n",
        "  handmade      3D\n",
        "test comment\n",
        "  3  2  0  0  0  0  0  0  0  0999 V2000\n",
        "    0.0000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0\n",
        "    0.9600    0.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0\n",
        "   -0.2400    0.9300    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0\n",
        "  1  2  1  0\n",
        "  1  3  1  0\n",
        "M  END\n",
    );

    const AMMONIUM_BLOCK_CHARGE: &str = concat!(
        "ammonium\n",
        "\n",
        "\n",
        "  1  0  0  0  0  0  0  0  0  0999 V2000\n",
        "    0.0000    0.0000    0.0000 N   0  3  0  0  0  0  0  0  0  0  0  0\n",
        "M  END\n",
    );

    fn read(text: &str) -> Result<(Molecule, MolHeader), MolFileError> {
        MolFile::read_from(&mut Cursor::new(text.as_bytes()))
    }

    #[test]
    fn reads_header_atoms_and_bonds() {
        let (mol, header) = read(WATER).unwrap();
        assert_eq!(mol.name(), "water");
        assert_eq!(header.program, "  handmade      3D");
        assert_eq!(header.comment, "test comment");
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.atoms()[0].element, Element::O);
        assert_eq!(mol.atoms()[2].position, Point3::new(-0.24, 0.93, 0.0));
        assert_eq!(
            mol.bonds(),
            &[
                Bond::new(0, 1, BondOrder::Single),
                Bond::new(0, 2, BondOrder::Single)
            ]
        );
    }

    #[test]
    fn atom_block_charge_code_is_decoded() {
        let (mol, _) = read(AMMONIUM_BLOCK_CHARGE).unwrap();
        assert_eq!(mol.atoms()[0].formal_charge, 1);
    }

    #[test]
    fn charge_property_overrides_atom_block_charges() {
        let text = AMMONIUM_BLOCK_CHARGE.replace("M  END\n", "M  CHG  1   1  -1\nM  END\n");
        let (mol, _) = read(&text).unwrap();
        assert_eq!(mol.atoms()[0].formal_charge, -1);
    }

    #[test]
    fn negative_charge_property_count_is_a_parse_error() {
        let text = AMMONIUM_BLOCK_CHARGE.replace("M  END\n", "M  CHG -1\nM  END\n");
        assert!(matches!(read(&text), Err(MolFileError::Parse { line: 6, .. })));
    }

    #[test]
    fn reading_stops_at_the_first_record_separator() {
        let text = format!("{WATER}$$$$\n{AMMONIUM_BLOCK_CHARGE}$$$$\n");
        let (mol, _) = read(&text).unwrap();
        assert_eq!(mol.name(), "water");
    }

    #[test]
    fn rejects_v3000() {
        let text = WATER.replace("V2000", "V3000");
        assert!(matches!(read(&text), Err(MolFileError::UnsupportedV3000)));
    }

    #[test]
    fn reports_line_of_bad_coordinate() {
        let text = WATER.replace("    0.9600", "    abcdef");
        match read(&text) {
            Err(MolFileError::Parse { line, details }) => {
                assert_eq!(line, 6);
                assert!(details.contains('x'));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_truncated_record() {
        let truncated: String = WATER.lines().take(6).map(|l| format!("{l}\n")).collect();
        assert!(matches!(read(&truncated), Err(MolFileError::Parse { .. })));
    }

    #[test]
    fn rejects_bond_to_missing_atom() {
        let text = WATER.replace("  1  3  1  0", "  1  4  1  0");
        assert!(matches!(read(&text), Err(MolFileError::Parse { line: 9, .. })));
    }

    #[test]
    fn written_conformer_reads_back_with_moved_coordinates() {
        let (mol, header) = read(WATER).unwrap();
        let moved: Vec<_> = mol
            .positions()
            .iter()
            .map(|p| Point3::new(p.x + 1.0, p.y, p.z - 2.0))
            .collect();

        let mut buf = Vec::new();
        MolFile::write_conformer_to(&mol, &moved, &header, &mut buf).unwrap();
        let (parsed, parsed_header) = read(std::str::from_utf8(&buf).unwrap()).unwrap();

        assert_eq!(parsed_header, header);
        assert_eq!(parsed.bonds(), mol.bonds());
        for (a, b) in parsed.positions().iter().zip(moved.iter()) {
            assert!((a - b).norm() < 1e-4);
        }
    }

    #[test]
    fn writer_emits_charge_properties() {
        let (mol, _) = read(AMMONIUM_BLOCK_CHARGE).unwrap();
        let mut buf = Vec::new();
        MolFile::write_molecule_to(&mol, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("M  CHG  1   1   1\n"));
        assert!(text.lines().nth(1).unwrap().contains("confsearch"));
        assert_eq!(read(&text).unwrap().0.atoms()[0].formal_charge, 1);
    }

    #[test]
    fn path_round_trip_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("water.mol");
        let (mol, header) = read(WATER).unwrap();

        MolFile::write_to_path(&mol, &header, &path).unwrap();
        let (parsed, parsed_header) = MolFile::read_from_path(&path).unwrap();

        assert_eq!(parsed_header.name, "water");
        assert_eq!(parsed.atom_count(), 3);
        assert_eq!(parsed.bonds(), mol.bonds());
    }

    #[test]
    fn write_conformer_rejects_wrong_coordinate_count() {
        let (mol, header) = read(WATER).unwrap();
        let mut buf = Vec::new();
        let err = MolFile::write_conformer_to(&mol, &[Point3::origin()], &header, &mut buf)
            .unwrap_err();
        assert!(matches!(
            err,
            MolFileError::AtomCountMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }
}

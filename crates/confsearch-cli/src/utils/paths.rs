use std::path::{Path, PathBuf};

pub const REPORT_FILE_NAME: &str = "confsearch_report.txt";

/// Output locations derived from the input file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub best_conformer: PathBuf,
    pub ensemble: PathBuf,
    pub energies: PathBuf,
    pub report: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, input: &Path) -> Self {
        let stem = file_stem(input);
        Self {
            best_conformer: output_dir.join(format!("{stem}_min_conf.mol")),
            ensemble: output_dir.join(format!("{stem}_confs.sdf")),
            energies: output_dir.join(format!("{stem}_energies.csv")),
            report: output_dir.join(REPORT_FILE_NAME),
        }
    }
}

/// File name used to label the molecule in the report.
pub fn display_name(input: &Path) -> String {
    input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "molecule".to_string())
}

use confsearch::core::embedding::perturbation::PerturbationEmbedder;
use confsearch::core::forcefield::restraint::RestraintForceField;
use confsearch::core::io::molfile::{MolFile, MolHeader};
use confsearch::core::io::sdf::SdfWriter;
use confsearch::core::io::traits::MolecularFile;
use confsearch::core::models::atom::{Atom, Element};
use confsearch::core::models::constraints::{ConstraintKind, ConstraintSpec};
use confsearch::core::models::molecule::Molecule;
use confsearch::core::models::topology::BondOrder;
use confsearch::core::utils::geometry::superposed_rmsd;
use confsearch::engine::config::SearchConfig;
use confsearch::engine::context::SearchContext;
use confsearch::engine::progress::ProgressReporter;
use confsearch::engine::tasks;
use confsearch::workflows::search::{self, SearchResult};
use nalgebra::Point3;
use std::io::Cursor;

const PROPANOL: &str = concat!(
    "propanol\n",
    "  handmade      3D\n",
    "\n",
    "  5  4  0  0  0  0  0  0  0  0999 V2000\n",
    "    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0\n",
    "    1.5200    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0\n",
    "    2.0300    1.4300    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0\n",
    "    3.4600    1.4300    0.2000 O   0  0  0  0  0  0  0  0  0  0  0  0\n",
    "    3.7800    2.3300    0.2000 H   0  0  0  0  0  0  0  0  0  0  0  0\n",
    "  1  2  1  0\n",
    "  2  3  1  0\n",
    "  3  4  1  0\n",
    "  4  5  1  0\n",
    "M  END\n",
);

fn propanol() -> Molecule {
    MolFile::read_from(&mut Cursor::new(PROPANOL.as_bytes()))
        .unwrap()
        .0
}

fn triatomic() -> Molecule {
    let mut mol = Molecule::new("triatomic");
    let a = mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
    let b = mol.add_atom(Atom::new(Element::C, Point3::new(1.5, 0.0, 0.0)));
    let c = mol.add_atom(Atom::new(Element::O, Point3::new(2.1, 1.3, 0.0)));
    mol.add_bond(a, b, BondOrder::Single).unwrap();
    mol.add_bond(b, c, BondOrder::Single).unwrap();
    mol
}

/// Octan-1-ol heavy-atom backbone as a planar zigzag.
fn octanol_backbone() -> Molecule {
    let mut mol = Molecule::new("octanol");
    let mut previous = None;
    for i in 0..9 {
        let element = if i == 8 { Element::O } else { Element::C };
        let y = if i % 2 == 0 { 0.0 } else { 0.85 };
        let atom = mol.add_atom(Atom::new(element, Point3::new(1.26 * i as f64, y, 0.0)));
        if let Some(prev) = previous {
            mol.add_bond(prev, atom, BondOrder::Single).unwrap();
        }
        previous = Some(atom);
    }
    mol
}

fn assert_within_window(result: &SearchResult, window: f64) {
    let (_, minimum) = result.energies.minimum().unwrap();
    for (_, energy) in result.energies.iter() {
        assert!(energy <= minimum + window);
    }
}

#[test]
fn three_atom_search_end_to_end() {
    let mol = triatomic();
    let config = SearchConfig::builder()
        .num_conformers(5)
        .rms_threshold(1.0)
        .energy_window(5.0)
        .max_cycles(10)
        .random_seed(Some(11))
        .build()
        .unwrap();

    let result = search::run_with_defaults(&mol, &config, &ProgressReporter::new()).unwrap();

    assert!(result.ensemble.live_count() <= 5);
    assert!(result.ensemble.live_count() >= 1);
    assert_eq!(result.ensemble.live_count(), result.energies.len());
    assert_within_window(&result, 5.0);

    let best = result.best.unwrap();
    if best.live {
        assert_eq!(result.energies.get(best.id), Some(best.energy));
    } else {
        assert!(!result.energies.contains(best.id));
    }
}

#[test]
fn default_settings_generate_more_than_one_conformer() {
    let mol = octanol_backbone();
    for seed in [1, 2] {
        let config = SearchConfig {
            random_seed: Some(seed),
            ..SearchConfig::default()
        };
        let result = search::run_with_defaults(&mol, &config, &ProgressReporter::new()).unwrap();

        assert!(
            result.statistics.generated > 1,
            "seed {seed}: {:?}",
            result.statistics
        );
        assert!(result.ensemble.live_count() >= 1);
        assert_within_window(&result, config.energy_window);
    }
}

#[test]
fn survivors_are_deduplicated_and_inside_the_window() {
    let mol = propanol();
    let config = SearchConfig {
        num_conformers: 12,
        rms_threshold: 0.05,
        energy_window: 1e6,
        perturbation: 0.6,
        random_seed: Some(3),
        ..SearchConfig::default()
    };
    let result = search::run_with_defaults(&mol, &config, &ProgressReporter::new()).unwrap();
    assert_within_window(&result, config.energy_window);

    let heavy = mol.heavy_atom_indices();
    let views: Vec<Vec<Point3<f64>>> = result
        .live_conformers()
        .map(|(c, _)| heavy.iter().map(|&i| c.positions()[i]).collect())
        .collect();
    for i in 0..views.len() {
        for j in 0..i {
            assert!(superposed_rmsd(&views[i], &views[j]).unwrap() > config.rms_threshold);
        }
    }
}

#[test]
fn same_seed_reproduces_the_same_ensemble() {
    let mol = propanol();
    let config = SearchConfig {
        num_conformers: 8,
        rms_threshold: 0.05,
        random_seed: Some(42),
        ..SearchConfig::default()
    };
    let first = search::run_with_defaults(&mol, &config, &ProgressReporter::new()).unwrap();
    let second = search::run_with_defaults(&mol, &config, &ProgressReporter::new()).unwrap();

    assert_eq!(first.ensemble.live_ids(), second.ensemble.live_ids());
    let a: Vec<_> = first.energies.iter().collect();
    let b: Vec<_> = second.energies.iter().collect();
    assert_eq!(a, b);
    assert_eq!(first.statistics, second.statistics);
}

#[test]
fn constrained_atoms_respect_their_displacement_limits() {
    let mol = propanol();
    let reporter = ProgressReporter::new();
    let embedder = PerturbationEmbedder::new(0.8);
    let forcefield = RestraintForceField::default();

    for max_displacement in [None, Some(0.1)] {
        let config = SearchConfig {
            num_conformers: 6,
            rms_threshold: 0.0,
            constrained_atoms: vec![0, 3],
            max_displacement,
            random_seed: Some(5),
            ..SearchConfig::default()
        };
        let constraints =
            ConstraintSpec::new(&mol, &config.constrained_atoms, config.max_displacement).unwrap();
        let context = SearchContext::new(&mol, &config, &constraints, &reporter);

        let mut ensemble = tasks::generation::run(&context, &embedder).unwrap();
        let tracker = tasks::minimization::run(&context, &forcefield, &mut ensemble);
        assert!(!tracker.table().is_empty());

        for conformer in ensemble.live() {
            for constraint in constraints.iter() {
                let drift = (conformer.positions()[constraint.atom] - constraint.reference).norm();
                match constraint.kind {
                    ConstraintKind::Fixed => assert!(drift < 1e-9, "fixed atom moved {drift}"),
                    ConstraintKind::Bounded { max_displacement } => {
                        assert!(drift <= max_displacement + 0.02, "bounded atom moved {drift}")
                    }
                }
            }
        }
    }
}

#[test]
fn molfile_in_search_and_structure_files_out() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("propanol.mol");
    std::fs::write(&input, PROPANOL).unwrap();

    let (mol, header) = MolFile::read_from_path(&input).unwrap();
    assert_eq!(header.name, "propanol");
    let config = SearchConfig {
        num_conformers: 6,
        rms_threshold: 0.05,
        random_seed: Some(1),
        ..SearchConfig::default()
    };
    let result = search::run_with_defaults(&mol, &config, &ProgressReporter::new()).unwrap();

    let best_path = dir.path().join("propanol_min_conf.mol");
    let out_header = MolHeader {
        name: mol.name().to_string(),
        ..MolHeader::default()
    };
    MolFile::write_conformer_to_path(&mol, result.best_positions().unwrap(), &out_header, &best_path)
        .unwrap();
    let (best_mol, _) = MolFile::read_from_path(&best_path).unwrap();
    assert_eq!(best_mol.atom_count(), mol.atom_count());
    assert_eq!(best_mol.bonds().len(), mol.bonds().len());

    let sdf_path = dir.path().join("propanol_confs.sdf");
    let mut writer = SdfWriter::create(&sdf_path).unwrap();
    let written = writer
        .write_ensemble(&mol, &out_header, &result.ensemble, |id| result.energies.get(id))
        .unwrap();
    writer.finish().unwrap();

    assert_eq!(written, result.ensemble.live_count());
    let text = std::fs::read_to_string(&sdf_path).unwrap();
    assert_eq!(text.matches("$$$$").count(), written);
    assert_eq!(text.matches(">  <ENERGY>").count(), written);
}

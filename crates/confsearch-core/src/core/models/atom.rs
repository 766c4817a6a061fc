use nalgebra::Point3;
use phf::phf_map;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements recognized in connection-table files.
///
/// The set covers the elements that occur in organic and small-molecule
/// inorganic structures. Each variant knows its symbol and a single-bond
/// covalent radius, which the reference force field uses for its
/// non-bonded contact distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Fe,
    Cu,
    Zn,
    Se,
    Br,
    Sn,
    I,
}

static ELEMENT_SYMBOLS: phf::Map<&'static str, Element> = phf_map! {
    "H" => Element::H,
    "D" => Element::H,
    "HE" => Element::He,
    "LI" => Element::Li,
    "BE" => Element::Be,
    "B" => Element::B,
    "C" => Element::C,
    "N" => Element::N,
    "O" => Element::O,
    "F" => Element::F,
    "NE" => Element::Ne,
    "NA" => Element::Na,
    "MG" => Element::Mg,
    "AL" => Element::Al,
    "SI" => Element::Si,
    "P" => Element::P,
    "S" => Element::S,
    "CL" => Element::Cl,
    "AR" => Element::Ar,
    "K" => Element::K,
    "CA" => Element::Ca,
    "FE" => Element::Fe,
    "CU" => Element::Cu,
    "ZN" => Element::Zn,
    "SE" => Element::Se,
    "BR" => Element::Br,
    "SN" => Element::Sn,
    "I" => Element::I,
};

impl Element {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::H => "H",
            Self::He => "He",
            Self::Li => "Li",
            Self::Be => "Be",
            Self::B => "B",
            Self::C => "C",
            Self::N => "N",
            Self::O => "O",
            Self::F => "F",
            Self::Ne => "Ne",
            Self::Na => "Na",
            Self::Mg => "Mg",
            Self::Al => "Al",
            Self::Si => "Si",
            Self::P => "P",
            Self::S => "S",
            Self::Cl => "Cl",
            Self::Ar => "Ar",
            Self::K => "K",
            Self::Ca => "Ca",
            Self::Fe => "Fe",
            Self::Cu => "Cu",
            Self::Zn => "Zn",
            Self::Se => "Se",
            Self::Br => "Br",
            Self::Sn => "Sn",
            Self::I => "I",
        }
    }

    /// Single-bond covalent radius in Angstroms.
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Self::H => 0.31,
            Self::He => 0.28,
            Self::Li => 1.28,
            Self::Be => 0.96,
            Self::B => 0.84,
            Self::C => 0.76,
            Self::N => 0.71,
            Self::O => 0.66,
            Self::F => 0.57,
            Self::Ne => 0.58,
            Self::Na => 1.66,
            Self::Mg => 1.41,
            Self::Al => 1.21,
            Self::Si => 1.11,
            Self::P => 1.07,
            Self::S => 1.05,
            Self::Cl => 1.02,
            Self::Ar => 1.06,
            Self::K => 2.03,
            Self::Ca => 1.76,
            Self::Fe => 1.32,
            Self::Cu => 1.32,
            Self::Zn => 1.22,
            Self::Se => 1.20,
            Self::Br => 1.20,
            Self::Sn => 1.39,
            Self::I => 1.39,
        }
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        matches!(self, Self::H)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ELEMENT_SYMBOLS
            .get(s.trim().to_ascii_uppercase().as_str())
            .copied()
            .ok_or_else(|| ParseElementError(s.trim().to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An atom of a molecule's fixed topology.
///
/// The position stored here is the atom's coordinate in the molecule's
/// original input conformer. Search conformers keep their own coordinate
/// arrays in an [`Ensemble`](super::conformer::Ensemble).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The chemical element of the atom.
    pub element: Element,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The formal charge carried over from the input file.
    pub formal_charge: i8,
}

impl Atom {
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self {
            element,
            position,
            formal_charge: 0,
        }
    }

    pub fn with_charge(mut self, formal_charge: i8) -> Self {
        self.formal_charge = formal_charge;
        self
    }
}

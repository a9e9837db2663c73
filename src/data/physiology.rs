//! Species physiology and tissue composition
//!
//! Volumes are fractional (L/kg body weight), flows are fractions of cardiac output,
//! and cardiac output, GFR and alveolar ventilation are allometric
//! (L/h/kg^0.75). Tissue composition follows the Schmitt (2008) volume-fraction
//! scheme and is shared by all species.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::PbtkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Human,
    Rat,
    Mouse,
    Dog,
}

impl Species {
    pub const ALL: [Species; 4] = [Species::Human, Species::Rat, Species::Mouse, Species::Dog];
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Species::Human => "human",
            Species::Rat => "rat",
            Species::Mouse => "mouse",
            Species::Dog => "dog",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Species {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Species::Human),
            "rat" => Ok(Species::Rat),
            "mouse" => Ok(Species::Mouse),
            "dog" => Ok(Species::Dog),
            other => Err(PbtkError::UnknownSpecies(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tissue {
    Adipose,
    Bone,
    Brain,
    Gut,
    Heart,
    Kidney,
    Liver,
    Lung,
    Muscle,
    Skin,
    Spleen,
    RedBloodCells,
}

impl Tissue {
    /// Tissues with a volume and a blood flow (red blood cells are part of blood)
    pub const ORGANS: [Tissue; 11] = [
        Tissue::Adipose,
        Tissue::Bone,
        Tissue::Brain,
        Tissue::Gut,
        Tissue::Heart,
        Tissue::Kidney,
        Tissue::Liver,
        Tissue::Lung,
        Tissue::Muscle,
        Tissue::Skin,
        Tissue::Spleen,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tissue::Adipose => "adipose",
            Tissue::Bone => "bone",
            Tissue::Brain => "brain",
            Tissue::Gut => "gut",
            Tissue::Heart => "heart",
            Tissue::Kidney => "kidney",
            Tissue::Liver => "liver",
            Tissue::Lung => "lung",
            Tissue::Muscle => "muscle",
            Tissue::Skin => "skin",
            Tissue::Spleen => "spleen",
            Tissue::RedBloodCells => "red blood cells",
        }
    }
}

impl fmt::Display for Tissue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Tissue {
    type Err = PbtkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Tissue::ORGANS
            .iter()
            .chain(std::iter::once(&Tissue::RedBloodCells))
            .find(|t| t.name() == wanted || (wanted == "rbc" && **t == Tissue::RedBloodCells))
            .copied()
            .ok_or_else(|| PbtkError::domain(format!("unknown tissue '{}'", s)))
    }
}

/// Volume fractions of one tissue.
///
/// The cellular fractions (`water` .. `protein`) refer to the cellular space,
/// `interstitial` is the fraction of tissue volume that is interstitial fluid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TissueComposition {
    pub interstitial: f64,
    pub water: f64,
    pub neutral_lipid: f64,
    pub neutral_phospholipid: f64,
    pub acidic_phospholipid: f64,
    pub protein: f64,
    /// Intracellular pH
    pub ph: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlasmaComposition {
    pub ph: f64,
    pub water: f64,
    pub protein: f64,
    pub neutral_lipid: f64,
    pub phospholipid: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TissuePhysiology {
    /// L/kg body weight
    pub volume: f64,
    /// Fraction of cardiac output
    pub flow_fraction: f64,
    pub composition: TissueComposition,
}

/// Read-only physiology for one species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysiologyProfile {
    pub species: Species,
    /// kg
    pub body_weight: f64,
    pub hematocrit: f64,
    /// L/h/kg^0.75
    pub cardiac_output: f64,
    /// L/h/kg^0.75
    pub gfr: f64,
    /// L/h/kg^0.75
    pub alveolar_ventilation: f64,
    /// L/kg
    pub plasma_volume: f64,
    /// Fraction of blood volume that is venous
    pub venous_fraction: f64,
    /// 10^6 cells per g liver
    pub hepatocellularity: f64,
    /// g/mL
    pub liver_density: f64,
    pub plasma: PlasmaComposition,
    pub red_blood_cells: TissueComposition,
    pub tissues: BTreeMap<Tissue, TissuePhysiology>,
}

impl PhysiologyProfile {
    /// Reference profile shipped with the crate
    pub fn reference(species: Species) -> Result<PhysiologyProfile, PbtkError> {
        PHYSIOLOGY
            .get(&species)
            .cloned()
            .ok_or_else(|| PbtkError::UnknownSpecies(species.to_string()))
    }

    pub fn tissue(&self, tissue: Tissue) -> Result<&TissuePhysiology, PbtkError> {
        self.tissues.get(&tissue).ok_or_else(|| {
            PbtkError::missing(
                format!("V{}c", tissue.name()),
                format!("no {} physiology for {}", tissue, self.species),
            )
        })
    }

    /// Composition of any tissue, including red blood cells
    pub fn composition(&self, tissue: Tissue) -> Result<TissueComposition, PbtkError> {
        match tissue {
            Tissue::RedBloodCells => Ok(self.red_blood_cells),
            t => Ok(self.tissue(t)?.composition),
        }
    }

    /// L/kg
    pub fn blood_volume(&self) -> f64 {
        self.plasma_volume / (1.0 - self.hematocrit)
    }

    /// L/kg
    pub fn red_blood_cell_volume(&self) -> f64 {
        self.blood_volume() * self.hematocrit
    }

    /// Scale an allometric rate (per kg^0.75) to a per-kg rate
    pub fn per_kg(&self, allometric: f64) -> f64 {
        allometric / self.body_weight.powf(0.25)
    }
}

fn composition(
    interstitial: f64,
    water: f64,
    neutral_lipid: f64,
    neutral_phospholipid: f64,
    acidic_phospholipid: f64,
    protein: f64,
    ph: f64,
) -> TissueComposition {
    TissueComposition {
        interstitial,
        water,
        neutral_lipid,
        neutral_phospholipid,
        acidic_phospholipid,
        protein,
        ph,
    }
}

lazy_static! {
    static ref COMPOSITION: HashMap<Tissue, TissueComposition> = {
        let mut m = HashMap::new();
        m.insert(Tissue::Adipose, composition(0.135, 0.150, 0.790, 0.0016, 0.0004, 0.040, 7.10));
        m.insert(Tissue::Bone, composition(0.100, 0.450, 0.070, 0.0011, 0.0005, 0.190, 7.00));
        m.insert(Tissue::Brain, composition(0.162, 0.770, 0.051, 0.0560, 0.0126, 0.080, 7.10));
        m.insert(Tissue::Gut, composition(0.267, 0.720, 0.0487, 0.0163, 0.0021, 0.180, 7.00));
        m.insert(Tissue::Heart, composition(0.100, 0.760, 0.0115, 0.0166, 0.0036, 0.180, 7.10));
        m.insert(Tissue::Kidney, composition(0.165, 0.760, 0.0207, 0.0162, 0.0051, 0.170, 7.22));
        m.insert(Tissue::Liver, composition(0.163, 0.700, 0.0348, 0.0252, 0.0047, 0.210, 7.23));
        m.insert(Tissue::Lung, composition(0.336, 0.780, 0.0030, 0.0090, 0.0011, 0.170, 6.90));
        m.insert(Tissue::Muscle, composition(0.120, 0.760, 0.0238, 0.0072, 0.0011, 0.190, 7.00));
        m.insert(Tissue::Skin, composition(0.382, 0.710, 0.0603, 0.0111, 0.0018, 0.200, 7.00));
        m.insert(Tissue::Spleen, composition(0.207, 0.790, 0.0077, 0.0113, 0.0031, 0.180, 7.00));
        m.insert(Tissue::RedBloodCells, composition(0.0, 0.630, 0.0017, 0.0029, 0.0005, 0.330, 7.22));
        m
    };

    static ref PHYSIOLOGY: HashMap<Species, PhysiologyProfile> = {
        // (tissue, volume L/kg, flow fraction)
        let human = [
            (Tissue::Adipose, 0.2142, 0.052),
            (Tissue::Bone, 0.0856, 0.050),
            (Tissue::Brain, 0.0200, 0.114),
            (Tissue::Gut, 0.0171, 0.205),
            (Tissue::Heart, 0.0047, 0.040),
            (Tissue::Kidney, 0.0044, 0.190),
            (Tissue::Liver, 0.0245, 0.065),
            (Tissue::Lung, 0.0076, 0.0),
            (Tissue::Muscle, 0.4000, 0.191),
            (Tissue::Skin, 0.0371, 0.058),
            (Tissue::Spleen, 0.0026, 0.030),
        ];
        let rat = [
            (Tissue::Adipose, 0.0700, 0.070),
            (Tissue::Bone, 0.0730, 0.122),
            (Tissue::Brain, 0.0057, 0.020),
            (Tissue::Gut, 0.0270, 0.140),
            (Tissue::Heart, 0.0033, 0.049),
            (Tissue::Kidney, 0.0073, 0.141),
            (Tissue::Liver, 0.0366, 0.021),
            (Tissue::Lung, 0.0050, 0.0),
            (Tissue::Muscle, 0.4040, 0.278),
            (Tissue::Skin, 0.1900, 0.058),
            (Tissue::Spleen, 0.0020, 0.020),
        ];
        let mouse = [
            (Tissue::Adipose, 0.0700, 0.070),
            (Tissue::Bone, 0.1070, 0.110),
            (Tissue::Brain, 0.0165, 0.033),
            (Tissue::Gut, 0.0422, 0.141),
            (Tissue::Heart, 0.0050, 0.066),
            (Tissue::Kidney, 0.0167, 0.091),
            (Tissue::Liver, 0.0549, 0.020),
            (Tissue::Lung, 0.0073, 0.0),
            (Tissue::Muscle, 0.3840, 0.159),
            (Tissue::Skin, 0.1650, 0.058),
            (Tissue::Spleen, 0.0035, 0.011),
        ];
        let dog = [
            (Tissue::Adipose, 0.1350, 0.090),
            (Tissue::Bone, 0.0810, 0.050),
            (Tissue::Brain, 0.0085, 0.020),
            (Tissue::Gut, 0.0380, 0.180),
            (Tissue::Heart, 0.0078, 0.046),
            (Tissue::Kidney, 0.0055, 0.173),
            (Tissue::Liver, 0.0329, 0.046),
            (Tissue::Lung, 0.0082, 0.0),
            (Tissue::Muscle, 0.4570, 0.217),
            (Tissue::Skin, 0.0900, 0.060),
            (Tissue::Spleen, 0.0027, 0.025),
        ];

        let tissues = |table: &[(Tissue, f64, f64)]| -> BTreeMap<Tissue, TissuePhysiology> {
            table
                .iter()
                .map(|&(tissue, volume, flow_fraction)| {
                    (
                        tissue,
                        TissuePhysiology {
                            volume,
                            flow_fraction,
                            composition: COMPOSITION[&tissue],
                        },
                    )
                })
                .collect()
        };
        let plasma = |neutral_lipid: f64, phospholipid: f64| PlasmaComposition {
            ph: 7.4,
            water: 0.945,
            protein: 0.068,
            neutral_lipid,
            phospholipid,
        };

        let mut m = HashMap::new();
        m.insert(
            Species::Human,
            PhysiologyProfile {
                species: Species::Human,
                body_weight: 70.0,
                hematocrit: 0.44,
                cardiac_output: 15.6,
                gfr: 0.31,
                alveolar_ventilation: 13.0,
                plasma_volume: 0.0429,
                venous_fraction: 2.0 / 3.0,
                hepatocellularity: 110.0,
                liver_density: 1.05,
                plasma: plasma(0.0035, 0.00225),
                red_blood_cells: COMPOSITION[&Tissue::RedBloodCells],
                tissues: tissues(&human),
            },
        );
        m.insert(
            Species::Rat,
            PhysiologyProfile {
                species: Species::Rat,
                body_weight: 0.25,
                hematocrit: 0.46,
                cardiac_output: 14.0,
                gfr: 0.22,
                alveolar_ventilation: 20.0,
                plasma_volume: 0.0312,
                venous_fraction: 2.0 / 3.0,
                hepatocellularity: 108.0,
                liver_density: 1.05,
                plasma: plasma(0.0023, 0.0013),
                red_blood_cells: COMPOSITION[&Tissue::RedBloodCells],
                tissues: tissues(&rat),
            },
        );
        m.insert(
            Species::Mouse,
            PhysiologyProfile {
                species: Species::Mouse,
                body_weight: 0.025,
                hematocrit: 0.45,
                cardiac_output: 16.0,
                gfr: 0.24,
                alveolar_ventilation: 24.0,
                plasma_volume: 0.0490,
                venous_fraction: 2.0 / 3.0,
                hepatocellularity: 125.0,
                liver_density: 1.05,
                plasma: plasma(0.0023, 0.0013),
                red_blood_cells: COMPOSITION[&Tissue::RedBloodCells],
                tissues: tissues(&mouse),
            },
        );
        m.insert(
            Species::Dog,
            PhysiologyProfile {
                species: Species::Dog,
                body_weight: 10.0,
                hematocrit: 0.42,
                cardiac_output: 12.9,
                gfr: 0.43,
                alveolar_ventilation: 12.0,
                plasma_volume: 0.0515,
                venous_fraction: 2.0 / 3.0,
                hepatocellularity: 110.0,
                liver_density: 1.05,
                plasma: plasma(0.0030, 0.0019),
                red_blood_cells: COMPOSITION[&Tissue::RedBloodCells],
                tissues: tissues(&dog),
            },
        );
        m
    };
}

use crate::core::models::params::{
    ParamFile, ParamGroup, ParamValue, time_to_steps, velocity_generation_group,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TIMESTEP_PS: f64 = 0.001;
const OUTPUT_INTERVAL_PS: f64 = 100.0;
const LANGEVIN_SEED: i32 = 42;
const REFERENCE_TEMPERATURE: &str = "330";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown preset '{0}'. Expected one of: minimize-vacuum, minimize-solvated, explicit-solvent, posres-explicit-solvent")]
pub struct UnknownPreset(pub String);

/// The stock parameter files used while preparing a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    MinimizeVacuum,
    MinimizeSolvated,
    ExplicitSolvent,
    PosresExplicitSolvent,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::MinimizeVacuum,
        Preset::MinimizeSolvated,
        Preset::ExplicitSolvent,
        Preset::PosresExplicitSolvent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::MinimizeVacuum => "minimize-vacuum",
            Preset::MinimizeSolvated => "minimize-solvated",
            Preset::ExplicitSolvent => "explicit-solvent",
            Preset::PosresExplicitSolvent => "posres-explicit-solvent",
        }
    }

    pub fn build(self) -> ParamFile {
        match self {
            Preset::MinimizeVacuum => minimize_vacuum(),
            Preset::MinimizeSolvated => minimize_solvated(),
            Preset::ExplicitSolvent => explicit_solvent(false),
            Preset::PosresExplicitSolvent => posres_explicit_solvent(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// Steepest-descent minimization without periodic boundaries.
pub fn minimize_vacuum() -> ParamFile {
    let mut mdp = ParamFile::new();
    mdp.add(
        ParamGroup::new("PARAMETERS")
            .with("define", "-DFLEXIBLE")
            .with("integrator", "steep")
            .with("emtol", "10.0")
            .with("nsteps", -1)
            .with("nstenergy", 1)
            .with("energygrps", "System")
            .with("nstlist", 1)
            .with("ns_type", "grid")
            .with("coulombtype", "Reaction-Field")
            .with("epsilon_rf", 78)
            .with("rcoulomb", 1)
            .with("rvdw", 1)
            .with("constraints", "none")
            .with("pbc", "no"),
    );
    mdp
}

/// Minimization of a solvated box: tighter tolerance, periodic in all directions.
pub fn minimize_solvated() -> ParamFile {
    let mut mdp = minimize_vacuum();
    mdp.set("emtol", "1.0");
    mdp.set("pbc", "xyz");
    mdp
}

/// Stochastic-dynamics production run in explicit solvent.
pub fn explicit_solvent(velocity_generation: bool) -> ParamFile {
    let every = time_to_steps(OUTPUT_INTERVAL_PS, TIMESTEP_PS);
    let mut mdp = ParamFile::new();

    mdp.add(ParamGroup::new("SETUP"));
    mdp.add(
        ParamGroup::new("RUN CONTROL")
            .with("integrator", "sd")
            .with("ld_seed", LANGEVIN_SEED)
            .with("dt", TIMESTEP_PS)
            .with("nsteps", -1),
    );
    mdp.add(
        ParamGroup::new("OUTPUT CONTROL")
            .with("nstxout", every)
            .with("nstvout", every)
            .with("nstfout", every)
            .with("nstlog", every)
            .with("nstenergy", every)
            .with("nstxtcout", every)
            .with("xtc_grps", "System"),
    );
    mdp.add(
        ParamGroup::new("NEIGHBOR SEARCHING")
            .with("nstlist", 10)
            .with("ns_type", "grid")
            .with("pbc", "xyz")
            .with("periodic_molecules", "no")
            .with("rlist", 1),
    );
    mdp.add(
        ParamGroup::new("ELECTROSTATICS")
            .with("coulombtype", "PME")
            .with("rcoulomb", 1),
    );
    mdp.add(
        ParamGroup::new("VdW")
            .with("vdwtype", "shift")
            .with("rvdw", 1),
    );
    mdp.add(
        ParamGroup::new("TEMPERATURE COUPLING")
            .with("tcoupl", "no")
            .with("tc_grps", ParamValue::from(&["System"][..]))
            .with("ref_t", ParamValue::from(&[REFERENCE_TEMPERATURE][..]))
            .with("tau_t", ParamValue::from(&["1.0"][..])),
    );
    mdp.add(ParamGroup::new("PRESSURE COUPLING").with("pcoupl", "no"));
    mdp.add(ParamGroup::new("BOND CONSTRAINTS").with("constraints", "none"));

    if velocity_generation {
        mdp.add(velocity_generation_group(REFERENCE_TEMPERATURE, LANGEVIN_SEED));
    }
    mdp
}

/// [`explicit_solvent`] with position restraints enabled.
pub fn posres_explicit_solvent() -> ParamFile {
    let mut mdp = explicit_solvent(false);
    mdp.set("define", "-DPOSRES");
    mdp
}

use crate::core::models::params::{ParamError, ParamFile, ParamValue};
use crate::core::presets::Preset;
use thiserror::Error;
use tracing::{debug, info, instrument};

const COUPLED_KEYS: [&str; 3] = ["tc_grps", "ref_t", "tau_t"];

#[derive(Debug, Error, PartialEq, Clone)]
pub enum RecipeError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {name}: {value} (must be a positive number)")]
    InvalidSetting { name: &'static str, value: f64 },
    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),
}

/// How the thermostat coupling time is given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CouplingTime {
    /// `tau_t` in ps.
    TauT(f64),
    /// Friction coefficient in ps⁻¹; `tau_t` becomes its inverse.
    Gamma(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MdpRecipe {
    pub preset: Preset,
    pub temperature: Option<f64>,
    pub coupling_time: Option<CouplingTime>,
    pub seed: Option<i64>,
    pub velocity_generation: Option<bool>,
    pub overrides: Vec<(String, String)>,
}

impl MdpRecipe {
    /// Produces the parameter file: preset defaults first, then explicit
    /// overrides, then coupling, seed and velocity generation.
    ///
    /// Overrides of the per-group keys (`tc_grps`, `ref_t`, `tau_t`) are split
    /// on whitespace into lists. Single-entry `ref_t` and `tau_t` values are
    /// then broadcast to every coupling group.
    #[instrument(skip_all, name = "mdp_recipe", fields(preset = %self.preset))]
    pub fn render(&self) -> Result<ParamFile, RecipeError> {
        let mut mdp = self.preset.build();
        info!("Rendering {} parameter file", self.preset);

        for (key, value) in &self.overrides {
            debug!("Override {} = {}", key, value);
            mdp.set(key.as_str(), override_value(key, value));
        }

        if let Some(temperature) = self.temperature {
            mdp.set_temperature(temperature)?;
        }
        match self.coupling_time {
            Some(CouplingTime::TauT(tau_t)) => mdp.set_tau_t(tau_t)?,
            Some(CouplingTime::Gamma(gamma)) => mdp.set_gamma(gamma)?,
            None => {}
        }
        align_coupled_values(&mut mdp)?;

        if let Some(seed) = self.seed {
            mdp.seed(seed);
        }
        match self.velocity_generation {
            Some(true) => mdp.set_velocity_generation()?,
            Some(false) => {
                if mdp.unset_velocity_generation() {
                    debug!("Removed velocity generation group");
                }
            }
            None => {}
        }
        Ok(mdp)
    }
}

fn override_value(key: &str, value: &str) -> ParamValue {
    if COUPLED_KEYS.contains(&key) {
        ParamValue::List(value.split_whitespace().map(String::from).collect())
    } else {
        ParamValue::from(value)
    }
}

/// Re-broadcasts `ref_t` and `tau_t` whose entry count differs from the
/// number of coupling groups.
fn align_coupled_values(mdp: &mut ParamFile) -> Result<(), ParamError> {
    if !mdp.contains("tc_grps") {
        return Ok(());
    }
    let groups = mdp.tc_group_count()?;
    for key in ["ref_t", "tau_t"] {
        if !mdp.contains(key) {
            continue;
        }
        let values: Vec<String> = match mdp.get(key)? {
            ParamValue::List(items) => items.clone(),
            ParamValue::Scalar(s) => s.split_whitespace().map(String::from).collect(),
        };
        if values.len() != groups {
            debug!("Aligning {} to {} coupling groups", key, groups);
            mdp.set_coupled(&[key], &values)?;
        }
    }
    Ok(())
}

#[derive(Default)]
pub struct MdpRecipeBuilder {
    preset: Option<Preset>,
    temperature: Option<f64>,
    coupling_time: Option<CouplingTime>,
    seed: Option<i64>,
    velocity_generation: Option<bool>,
    overrides: Vec<(String, String)>,
}

impl MdpRecipeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
    pub fn coupling_time(mut self, coupling_time: CouplingTime) -> Self {
        self.coupling_time = Some(coupling_time);
        self
    }
    pub fn tau_t(self, tau_t: f64) -> Self {
        self.coupling_time(CouplingTime::TauT(tau_t))
    }
    pub fn gamma(self, gamma: f64) -> Self {
        self.coupling_time(CouplingTime::Gamma(gamma))
    }
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn velocity_generation(mut self, enabled: bool) -> Self {
        self.velocity_generation = Some(enabled);
        self
    }
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }
    pub fn parameters<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> Result<MdpRecipe, RecipeError> {
        let preset = self.preset.ok_or(RecipeError::MissingParameter("preset"))?;
        if let Some(t) = self.temperature {
            positive("temperature", t)?;
        }
        match self.coupling_time {
            Some(CouplingTime::TauT(t)) => positive("tau_t", t)?,
            Some(CouplingTime::Gamma(g)) => positive("gamma", g)?,
            None => {}
        }
        Ok(MdpRecipe {
            preset,
            temperature: self.temperature,
            coupling_time: self.coupling_time,
            seed: self.seed,
            velocity_generation: self.velocity_generation,
            overrides: self.overrides,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), RecipeError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(RecipeError::InvalidSetting { name, value })
    }
}

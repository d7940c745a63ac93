use crate::cli::PresetArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use mdprep::core::presets::Preset;
use mdprep::workflows::recipe::{CouplingTime, MdpRecipe, MdpRecipeBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialCouplingConfig {
    temperature: Option<f64>,
    #[serde(rename = "tau-t")]
    tau_t: Option<f64>,
    gamma: Option<f64>,
    seed: Option<i64>,
    #[serde(rename = "velocity-generation")]
    velocity_generation: Option<bool>,
}

impl PartialCouplingConfig {
    fn coupling_time(&self) -> Result<Option<CouplingTime>> {
        match (self.tau_t, self.gamma) {
            (Some(_), Some(_)) => Err(CliError::Config(
                "Only one of 'coupling.tau-t' and 'coupling.gamma' may be set.".to_string(),
            )),
            (Some(t), None) => Ok(Some(CouplingTime::TauT(t))),
            (None, Some(g)) => Ok(Some(CouplingTime::Gamma(g))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialPrepConfig {
    preset: Option<Preset>,
    coupling: Option<PartialCouplingConfig>,
    parameters: Option<BTreeMap<String, toml::Value>>,
}

impl PartialPrepConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Resolves the final recipe. `-S` assignments are applied on top of the
    /// file values and explicit flags win over both.
    pub fn merge_with_cli(mut self, args: &PresetArgs) -> Result<MdpRecipe> {
        self.apply_set_values(&args.set_values)?;

        let coupling = self.coupling.take().unwrap_or_default();

        let preset = args.preset.or(self.preset).ok_or_else(|| {
            CliError::Config(
                "A preset is required either as an argument or as 'preset' in the config file."
                    .to_string(),
            )
        })?;
        let mut builder = MdpRecipeBuilder::new().preset(preset);

        if let Some(t) = args.temperature.or(coupling.temperature) {
            builder = builder.temperature(t);
        }

        let cli_coupling_time = args
            .tau_t
            .map(CouplingTime::TauT)
            .or(args.gamma.map(CouplingTime::Gamma));
        if let Some(time) = cli_coupling_time.or(coupling.coupling_time()?) {
            builder = builder.coupling_time(time);
        }

        if let Some(seed) = args.seed.or(coupling.seed) {
            builder = builder.seed(seed);
        }

        if let Some(enabled) = args
            .velocity_generation
            .as_option()
            .or(coupling.velocity_generation)
        {
            builder = builder.velocity_generation(enabled);
        }

        let mut overrides = Vec::new();
        for (key, value) in self.parameters.take().unwrap_or_default() {
            overrides.push((key.clone(), parameter_text(&key, &value)?));
        }
        builder = builder.parameters(overrides);

        Ok(builder.build()?)
    }

    /// `coupling.*` and `preset` keys adjust the configuration itself; any other
    /// key becomes a parameter override.
    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) =
                parser::parse_assignment(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

            match key {
                "preset" => {
                    self.preset = Some(
                        value_str
                            .parse::<Preset>()
                            .map_err(|e| CliError::Config(e.to_string()))?,
                    );
                }
                "coupling.temperature" => {
                    self.coupling.get_or_insert_with(Default::default).temperature =
                        Some(parse_float(key, value_str)?);
                }
                "coupling.tau-t" => {
                    let c = self.coupling.get_or_insert_with(Default::default);
                    c.tau_t = Some(parse_float(key, value_str)?);
                    c.gamma = None;
                }
                "coupling.gamma" => {
                    let c = self.coupling.get_or_insert_with(Default::default);
                    c.gamma = Some(parse_float(key, value_str)?);
                    c.tau_t = None;
                }
                "coupling.seed" => {
                    self.coupling.get_or_insert_with(Default::default).seed =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid integer value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                "coupling.velocity-generation" => {
                    self.coupling.get_or_insert_with(Default::default).velocity_generation =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid boolean value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                _ if key.starts_with("coupling.") => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
                _ => {
                    self.parameters
                        .get_or_insert_with(Default::default)
                        .insert(key.to_string(), toml::Value::String(value_str.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn parse_float(key: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid float value for {}: {}", key, value)))
}

/// Renders a TOML value the way it is written in an `.mdp` file. Arrays become
/// space-separated lists.
fn parameter_text(key: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(true) => Ok("yes".to_string()),
        toml::Value::Boolean(false) => Ok("no".to_string()),
        toml::Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| parameter_text(key, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(" "))
        }
        other => Err(CliError::Config(format!(
            "Unsupported value for parameter '{}': {}",
            key, other
        ))),
    }
}

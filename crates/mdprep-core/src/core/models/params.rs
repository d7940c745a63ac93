use std::collections::HashMap;
use std::fmt::{self, Write as _};
use thiserror::Error;
use tracing::debug;

/// Title of the group added by [`ParamFile::set_velocity_generation`].
pub const VELOCITY_GENERATION_TITLE: &str = "VELOCITY GENERATION";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Unknown parameter or group: '{0}'")]
    UnknownParameterKey(String),
    #[error("Invalid value for '{key}': '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("Expected {expected} coupling value(s) to match 'tc_grps', found {found}")]
    CouplingCountMismatch { expected: usize, found: usize },
}

/// A parameter value: a single token or an ordered list rendered space-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Scalar(_) => None,
            Self::List(items) => Some(items),
        }
    }

    /// The scalar itself, or the first element of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(items) => items.first().map(String::as_str),
        }
    }

    /// Number of entries: a scalar counts as one.
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(items: &[&str]) -> Self {
        Self::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// Normalizes a group title into its lookup key: whitespace collapsed, words joined by `_`.
pub fn group_key(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("_")
}

/// A titled, ordered bundle of parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamGroup {
    title: String,
    entries: Vec<(String, ParamValue)>,
    comments: HashMap<String, String>,
}

impl ParamGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn key(&self) -> String {
        group_key(&self.title)
    }

    /// Sets `key` to `value`, keeping the key's position if it already exists.
    /// Returns the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Chaining form of [`ParamGroup::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        self.comments.remove(key);
        Some(self.entries.remove(pos).1)
    }

    pub fn add_comment(&mut self, key: impl Into<String>, comment: impl Into<String>) {
        self.comments.insert(key.into(), comment.into());
    }

    pub fn comment(&self, key: &str) -> Option<&str> {
        self.comments.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; {}", self.title)?;
        for (key, value) in &self.entries {
            write!(f, "{} = {}", key, value)?;
            if let Some(comment) = self.comments.get(key) {
                write!(f, " ; {}", comment)?;
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}

/// Builds the optional velocity-generation group.
pub fn velocity_generation_group(
    temperature: impl Into<ParamValue>,
    seed: impl Into<ParamValue>,
) -> ParamGroup {
    ParamGroup::new(VELOCITY_GENERATION_TITLE)
        .with("gen_vel", "yes")
        .with("gen_temp", temperature)
        .with("gen_seed", seed)
}

/// Converts a duration into a step count for timestep `dt`, rounding to the
/// nearest integer with ties away from zero.
pub fn time_to_steps(time: f64, dt: f64) -> i64 {
    (time / dt).round() as i64
}

/// Like [`time_to_steps`], but `None` when the rounded quotient is not finite
/// or does not fit in an `i64`.
pub fn checked_time_to_steps(time: f64, dt: f64) -> Option<i64> {
    let steps = (time / dt).round();
    (steps.is_finite() && steps >= i64::MIN as f64 && steps < i64::MAX as f64)
        .then_some(steps as i64)
}

/// An ordered collection of parameter groups, keyed by normalized title.
///
/// Parameter lookups scan the groups in order and resolve to the first group
/// holding the key. [`ParamFile::find_group`] additionally falls back to a
/// group-title lookup when no group holds the name as a parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamFile {
    groups: Vec<(String, ParamGroup)>,
}

impl ParamFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `group`, or replaces in place a group with the same key.
    pub fn add(&mut self, group: ParamGroup) {
        let key = group.key();
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = group,
            None => self.groups.push((key, group)),
        }
    }

    /// Looks up a group by its title or normalized key.
    pub fn group(&self, name: &str) -> Option<&ParamGroup> {
        let key = group_key(name);
        self.groups.iter().find(|(k, _)| *k == key).map(|(_, g)| g)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut ParamGroup> {
        let key = group_key(name);
        self.groups.iter_mut().find(|(k, _)| *k == key).map(|(_, g)| g)
    }

    pub fn remove_group(&mut self, name: &str) -> Option<ParamGroup> {
        let key = group_key(name);
        let pos = self.groups.iter().position(|(k, _)| *k == key)?;
        Some(self.groups.remove(pos).1)
    }

    pub fn groups(&self) -> impl Iterator<Item = &ParamGroup> {
        self.groups.iter().map(|(_, g)| g)
    }

    pub fn group_keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// First group holding the parameter `key`.
    pub fn owning_group(&self, key: &str) -> Option<&ParamGroup> {
        self.groups.iter().map(|(_, g)| g).find(|g| g.contains(key))
    }

    /// Resolves `name` as a parameter key first, then as a group title.
    pub fn find_group(&self, name: &str) -> Result<&ParamGroup, ParamError> {
        self.owning_group(name)
            .or_else(|| self.group(name))
            .ok_or_else(|| ParamError::UnknownParameterKey(name.to_string()))
    }

    pub fn get(&self, key: &str) -> Result<&ParamValue, ParamError> {
        self.owning_group(key)
            .and_then(|g| g.get(key))
            .ok_or_else(|| ParamError::UnknownParameterKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.owning_group(key).is_some()
    }

    /// Sets `key` in the group that already holds it. New keys go to the first
    /// group; an empty file gets an untitled group to hold them.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let idx = self.groups.iter().position(|(_, g)| g.contains(&key));
        let group = match idx {
            Some(i) => &mut self.groups[i].1,
            None => {
                if self.groups.is_empty() {
                    self.groups.push((String::new(), ParamGroup::default()));
                }
                &mut self.groups[0].1
            }
        };
        group.set(key, value);
    }

    /// Sets `key` inside the group titled `title`, appending the group if absent.
    pub fn set_in(&mut self, title: &str, key: impl Into<String>, value: impl Into<ParamValue>) {
        if self.group(title).is_none() {
            self.add(ParamGroup::new(title));
        }
        if let Some(group) = self.group_mut(title) {
            group.set(key, value);
        }
    }

    /// Sets every key in `keys` to the same value.
    pub fn set_all(&mut self, keys: &[&str], value: impl Into<ParamValue>) {
        let value = value.into();
        for key in keys {
            self.set(*key, value.clone());
        }
    }

    fn get_f64(&self, key: &str) -> Result<f64, ParamError> {
        let value = self.get(key)?;
        value
            .first()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ParamError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
    }

    /// Converts a duration into a step count using the `dt` parameter.
    ///
    /// The quotient is rounded to the nearest integer with ties rounded away
    /// from zero, so `0.5` becomes `1` and `1.5` becomes `2`. A `time` whose
    /// step count is not representable is rejected as an invalid value.
    pub fn freq(&self, time: f64) -> Result<i64, ParamError> {
        let dt = self.get_f64("dt")?;
        if dt == 0.0 || !dt.is_finite() {
            return Err(ParamError::InvalidValue {
                key: "dt".to_string(),
                value: dt.to_string(),
            });
        }
        checked_time_to_steps(time, dt).ok_or_else(|| ParamError::InvalidValue {
            key: "time".to_string(),
            value: time.to_string(),
        })
    }

    /// Number of temperature-coupling groups: one for a scalar `tc_grps`,
    /// otherwise the length of the list.
    pub fn tc_group_count(&self) -> Result<usize, ParamError> {
        Ok(self.get("tc_grps")?.len())
    }

    /// Sets each key to one value per temperature-coupling group.
    ///
    /// A single value is broadcast to every group. Otherwise the number of
    /// values must equal [`ParamFile::tc_group_count`].
    pub fn set_coupled<V: ToString>(&mut self, keys: &[&str], values: &[V]) -> Result<(), ParamError> {
        let expected = self.tc_group_count()?;
        let items: Vec<String> = match values.len() {
            1 => vec![values[0].to_string(); expected],
            n if n == expected => values.iter().map(ToString::to_string).collect(),
            found => return Err(ParamError::CouplingCountMismatch { expected, found }),
        };
        self.set_all(keys, ParamValue::List(items));
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), ParamError> {
        self.set_coupled(&["ref_t"], &[temperature])
    }

    pub fn set_tau_t(&mut self, tau_t: f64) -> Result<(), ParamError> {
        debug!("setting tau_t = {}", tau_t);
        self.set_coupled(&["tau_t"], &[tau_t])
    }

    /// Sets `tau_t` from an inverse friction coefficient.
    pub fn set_gamma(&mut self, gamma: f64) -> Result<(), ParamError> {
        if gamma <= 0.0 || !gamma.is_finite() {
            return Err(ParamError::InvalidValue {
                key: "gamma".to_string(),
                value: gamma.to_string(),
            });
        }
        debug!("setting gamma = {}", gamma);
        self.set_tau_t(1.0 / gamma)
    }

    /// Adds the velocity-generation group, targeting the first `ref_t` and
    /// reusing `ld_seed`.
    pub fn set_velocity_generation(&mut self) -> Result<(), ParamError> {
        debug!("Setting velocity generation");
        let temperature = self
            .get("ref_t")?
            .first()
            .map(str::to_string)
            .ok_or_else(|| ParamError::InvalidValue {
                key: "ref_t".to_string(),
                value: String::new(),
            })?;
        let seed = self.get("ld_seed")?.clone();
        self.add(velocity_generation_group(temperature, seed));
        Ok(())
    }

    /// Removes the velocity-generation group. Returns whether it was present.
    pub fn unset_velocity_generation(&mut self) -> bool {
        let removed = self.remove_group(VELOCITY_GENERATION_TITLE).is_some();
        if removed {
            debug!("Unsetting velocity generation");
        }
        removed
    }

    /// Sets `ld_seed` and `gen_seed` wherever they are present.
    pub fn seed(&mut self, value: i64) {
        for key in ["ld_seed", "gen_seed"] {
            if self.contains(key) {
                debug!("Setting {} to {}", key, value);
                self.set(key, value);
            }
        }
    }

    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParamFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, group) in &self.groups {
            writeln!(f, "{}", group)?;
        }
        Ok(())
    }
}

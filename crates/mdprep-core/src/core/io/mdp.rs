use crate::core::io::traits::{FormatReader, FormatWriter};
use crate::core::models::params::{ParamFile, ParamGroup, ParamValue};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum MdpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Unable to parse line {line}: \"{content}\"")]
    MalformedGroupLine { line: usize, content: String },
    #[error("Parameter on line {line} appears before any group header")]
    NoActiveGroup { line: usize },
    #[error("Refusing to overwrite existing file: {0}")]
    PathExists(PathBuf),
}

/// Codec for GROMACS `.mdp` parameter files.
///
/// Groups are introduced by a `; <title>` line, entries are `key = value`
/// with an optional trailing `; comment`. Lines with zero or several `=` are
/// skipped with a warning; an entry before the first header is an error.
pub struct MdpFile;

impl MdpFile {
    pub fn loads(text: &str) -> Result<ParamFile, MdpError> {
        let mut mdp = ParamFile::new();
        let mut current: Option<ParamGroup> = None;

        for (line_num, raw) in text.lines().enumerate() {
            let line_num = line_num + 1;
            let line = raw.trim();

            if line.starts_with(';') {
                if let Some(group) = current.take() {
                    mdp.add(group);
                }
                let title: String = line.chars().skip(2).collect();
                current = Some(ParamGroup::new(title));
                continue;
            }
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('=').collect();
            if fields.len() != 2 {
                warn!(
                    "{}",
                    MdpError::MalformedGroupLine {
                        line: line_num,
                        content: line.to_string(),
                    }
                );
                continue;
            }

            let group = current
                .as_mut()
                .ok_or(MdpError::NoActiveGroup { line: line_num })?;
            let key = fields[0].trim();
            let (value, comment) = match fields[1].split_once(';') {
                Some((value, comment)) => (value.trim(), Some(comment.trim())),
                None => (fields[1].trim(), None),
            };
            group.set(key, ParamValue::from(value));
            if let Some(comment) = comment {
                group.add_comment(key, comment);
            }
        }

        if let Some(group) = current.take() {
            mdp.add(group);
        }
        debug!("Parsed {} parameter groups", mdp.len());
        Ok(mdp)
    }

    pub fn dumps(mdp: &ParamFile) -> String {
        mdp.format()
    }

    /// Writes `mdp` to `path`. With `overwrite` unset an existing file is left
    /// untouched and [`MdpError::PathExists`] is returned.
    pub fn save(mdp: &ParamFile, path: &Path, overwrite: bool) -> Result<(), MdpError> {
        if !overwrite && path.exists() {
            return Err(MdpError::PathExists(path.to_path_buf()));
        }
        Self::write_to_path(mdp, path)?;
        info!("Saved file {}", path.display());
        Ok(())
    }
}

impl FormatReader for MdpFile {
    type Output = ParamFile;
    type Error = MdpError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::loads(&text)
    }
}

impl FormatWriter for MdpFile {
    fn write_to(value: &Self::Output, writer: &mut impl Write) -> Result<(), Self::Error> {
        writer.write_all(value.format().as_bytes())?;
        Ok(())
    }
}

/// Serde adapter that stores a [`ParamFile`] as its `.mdp` text.
///
/// Opt a field in with `#[serde(with = "mdprep::core::io::mdp::text")]`.
pub mod text {
    use super::MdpFile;
    use crate::core::models::params::ParamFile;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(mdp: &ParamFile, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&mdp.format())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ParamFile, D::Error> {
        use serde::de::Error;
        let text = String::deserialize(deserializer)?;
        MdpFile::loads(&text).map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::io::Cursor;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
; RUN CONTROL
integrator = sd
dt = 0.001 ; 1 fs
nsteps = -1

; TEMPERATURE COUPLING
tc_grps = Protein SOL
ref_t = 300 300
";

    fn scalar_file() -> ParamFile {
        let mut mdp = ParamFile::new();
        mdp.add(
            ParamGroup::new("RUN CONTROL")
                .with("integrator", "sd")
                .with("dt", "0.001")
                .with("nsteps", "-1"),
        );
        mdp.add(ParamGroup::new("SETUP"));
        mdp.add(
            ParamGroup::new("NEIGHBOR SEARCHING")
                .with("ns_type", "grid")
                .with("rlist", "1"),
        );
        mdp
    }

    #[test]
    fn loads_groups_entries_and_comments() {
        let mdp = MdpFile::loads(SAMPLE).unwrap();
        let titles: Vec<_> = mdp.groups().map(|g| g.title()).collect();
        assert_eq!(titles, vec!["RUN CONTROL", "TEMPERATURE COUPLING"]);
        assert_eq!(mdp.get("dt").unwrap(), &ParamValue::from("0.001"));
        assert_eq!(
            mdp.group("RUN CONTROL").unwrap().comment("dt"),
            Some("1 fs")
        );
        assert_eq!(mdp.get("tc_grps").unwrap(), &ParamValue::from("Protein SOL"));
        let keys: Vec<_> = mdp.group("RUN_CONTROL").unwrap().keys().collect();
        assert_eq!(keys, vec!["integrator", "dt", "nsteps"]);
    }

    #[test]
    fn scalar_files_round_trip() {
        let original = scalar_file();
        let reloaded = MdpFile::loads(&original.format()).unwrap();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn comments_round_trip() {
        let mut original = scalar_file();
        original
            .group_mut("RUN CONTROL")
            .unwrap()
            .add_comment("dt", "ps");
        let text = original.format();
        assert!(text.contains("dt = 0.001 ; ps\n"));
        assert_eq!(MdpFile::loads(&text).unwrap(), original);
    }

    #[test]
    fn list_values_reload_as_joined_scalar() {
        let mut mdp = ParamFile::new();
        mdp.add(ParamGroup::new("TC").with("tc_grps", ParamValue::from(&["Protein", "SOL"][..])));
        let reloaded = MdpFile::loads(&mdp.format()).unwrap();
        assert_eq!(reloaded.get("tc_grps").unwrap(), &ParamValue::from("Protein SOL"));
    }

    #[test]
    fn line_with_two_equals_is_skipped() {
        let mdp = MdpFile::loads("; A\nfoo = bar = baz\nx = 1\n").unwrap();
        assert!(!mdp.contains("foo"));
        assert_eq!(mdp.get("x").unwrap(), &ParamValue::from("1"));
    }

    #[test]
    fn line_without_equals_is_skipped() {
        let mdp = MdpFile::loads("; A\njunk\nx = 1\n").unwrap();
        assert_eq!(mdp.group("A").unwrap().len(), 1);
    }

    #[test]
    fn entry_before_header_fails() {
        let err = MdpFile::loads("x = 1\n; A\n").unwrap_err();
        assert!(matches!(err, MdpError::NoActiveGroup { line: 1 }));
    }

    #[test]
    fn bare_semicolon_starts_untitled_group() {
        let mdp = MdpFile::loads(";\nx = 1\n").unwrap();
        assert_eq!(mdp.groups().next().unwrap().title(), "");
    }

    #[test]
    fn read_and_write_through_traits() {
        let mut cursor = Cursor::new(SAMPLE.as_bytes().to_vec());
        let mdp = MdpFile::read_from(&mut cursor).unwrap();
        let mut out = Vec::new();
        MdpFile::write_to(&mdp, &mut out).unwrap();
        assert_eq!(MdpFile::loads(&String::from_utf8(out).unwrap()).unwrap(), mdp);
    }

    #[test]
    fn save_respects_overwrite_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mdp");
        let mdp = scalar_file();
        MdpFile::save(&mdp, &path, false).unwrap();
        assert!(matches!(
            MdpFile::save(&mdp, &path, false),
            Err(MdpError::PathExists(_))
        ));
        MdpFile::save(&mdp, &path, true).unwrap();
        assert_eq!(MdpFile::read_from_path(&path).unwrap(), mdp);
    }

    #[derive(Serialize, Deserialize)]
    struct Stage {
        name: String,
        #[serde(with = "text")]
        mdp: ParamFile,
    }

    #[test]
    fn text_adapter_embeds_mdp_in_documents() {
        let stage = Stage {
            name: "equilibrate".into(),
            mdp: scalar_file(),
        };
        let doc = toml::to_string(&stage).unwrap();
        let back: Stage = toml::from_str(&doc).unwrap();
        assert_eq!(back.name, "equilibrate");
        assert_eq!(back.mdp, stage.mdp);
    }
}

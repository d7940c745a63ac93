use crate::cli::{MdpArgs, MdpCommands, PresetArgs, SetArgs};
use crate::config::PartialPrepConfig;
use crate::error::{CliError, Result};
use crate::utils::parser;
use mdprep::core::io::mdp::MdpFile;
use mdprep::core::io::traits::FormatReader;
use mdprep::core::models::params::{ParamFile, ParamValue};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn run(args: MdpArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.command {
        MdpCommands::Preset(args) => handle_preset(&args, &mut out)?,
        MdpCommands::Get { file, name } => handle_get(&file, &name, &mut out)?,
        MdpCommands::Set(args) => handle_set(&args)?,
        MdpCommands::Steps { file, times } => handle_steps(&file, &times, &mut out)?,
    }
    Ok(())
}

fn load(path: &Path) -> Result<ParamFile> {
    info!("Loading parameter file from {:?}", path);
    MdpFile::read_from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn handle_preset(args: &PresetArgs, out: &mut impl Write) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialPrepConfig::from_file(path)?,
        None => PartialPrepConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let recipe = partial_config.merge_with_cli(args)?;
    let mdp = recipe.render()?;

    match &args.output {
        Some(path) => {
            MdpFile::save(&mdp, path, args.force)?;
            println!("✓ Parameter file written to: {}", path.display());
        }
        None => write!(out, "{}", mdp)?,
    }
    Ok(())
}

fn handle_get(file: &Path, name: &str, out: &mut impl Write) -> Result<()> {
    let mdp = load(file)?;
    if mdp.contains(name) {
        writeln!(out, "{}", mdp.get(name)?)?;
    } else {
        write!(out, "{}", mdp.find_group(name)?)?;
    }
    Ok(())
}

fn handle_set(args: &SetArgs) -> Result<()> {
    let mut mdp = load(&args.file)?;
    for kv_pair in &args.set_values {
        let (key, value) =
            parser::parse_assignment(kv_pair).map_err(|e| CliError::Argument(e.to_string()))?;
        info!("Setting {} = {}", key, value);
        mdp.set(key, ParamValue::from(value));
    }

    let (target, overwrite): (PathBuf, bool) = match &args.output {
        Some(path) => (path.clone(), args.force),
        None => (args.file.clone(), true),
    };
    MdpFile::save(&mdp, &target, overwrite)?;
    println!("✓ Parameter file written to: {}", target.display());
    Ok(())
}

fn handle_steps(file: &Path, times: &[f64], out: &mut impl Write) -> Result<()> {
    let mdp = load(file)?;
    for time in times {
        writeln!(out, "{}\t{}", time, mdp.freq(*time)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use mdprep::core::models::params::ParamError;
    use std::fs;
    use tempfile::tempdir;

    const RUN_MDP: &str = "\
; RUN CONTROL
integrator = sd
dt = 0.002
nsteps = -1

; TEMPERATURE COUPLING
tc_grps = System
ref_t = 300
";

    fn mdp_args(args: &[&str]) -> MdpCommands {
        let mut argv = vec!["mdprep", "mdp"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Mdp(args) => args.command,
            _ => panic!("Expected 'mdp' subcommand"),
        }
    }

    fn run_to_string(command: MdpCommands) -> Result<String> {
        let mut out = Vec::new();
        match command {
            MdpCommands::Preset(args) => handle_preset(&args, &mut out)?,
            MdpCommands::Get { file, name } => handle_get(&file, &name, &mut out)?,
            MdpCommands::Set(args) => handle_set(&args)?,
            MdpCommands::Steps { file, times } => handle_steps(&file, &times, &mut out)?,
        }
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn preset_prints_to_stdout_without_output() {
        let text = run_to_string(mdp_args(&["preset", "minimize-solvated"])).unwrap();
        assert!(text.starts_with("; PARAMETERS\n"));
        assert!(text.contains("pbc = xyz\n"));
    }

    #[test]
    fn preset_refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("md.mdp");
        fs::write(&path, "keep me").unwrap();
        let path_str = path.to_str().unwrap();

        let result = run_to_string(mdp_args(&["preset", "explicit-solvent", "-o", path_str]));
        assert!(matches!(result, Err(CliError::Mdp(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");

        run_to_string(mdp_args(&["preset", "explicit-solvent", "-o", path_str, "-f"])).unwrap();
        let mdp = MdpFile::read_from_path(&path).unwrap();
        assert_eq!(mdp.get("integrator").unwrap(), &ParamValue::from("sd"));
    }

    #[test]
    fn get_prints_values_and_groups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mdp");
        fs::write(&path, RUN_MDP).unwrap();
        let path_str = path.to_str().unwrap();

        let value = run_to_string(mdp_args(&["get", path_str, "dt"])).unwrap();
        assert_eq!(value, "0.002\n");

        let group = run_to_string(mdp_args(&["get", path_str, "TEMPERATURE_COUPLING"])).unwrap();
        assert_eq!(group, "; TEMPERATURE COUPLING\ntc_grps = System\nref_t = 300\n");

        let missing = run_to_string(mdp_args(&["get", path_str, "gen_vel"]));
        assert!(matches!(
            missing,
            Err(CliError::Param(ParamError::UnknownParameterKey(_)))
        ));
    }

    #[test]
    fn set_edits_in_place_or_writes_elsewhere() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mdp");
        fs::write(&path, RUN_MDP).unwrap();
        let path_str = path.to_str().unwrap();

        run_to_string(mdp_args(&["set", path_str, "-S", "nsteps=5000", "ld_seed=9"])).unwrap();
        let mdp = MdpFile::read_from_path(&path).unwrap();
        assert_eq!(mdp.get("nsteps").unwrap(), &ParamValue::from("5000"));
        assert_eq!(mdp.find_group("ld_seed").unwrap().title(), "RUN CONTROL");

        let copy = dir.path().join("copy.mdp");
        run_to_string(mdp_args(&[
            "set",
            path_str,
            "-S",
            "ref_t=310",
            "-o",
            copy.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(
            MdpFile::read_from_path(&copy).unwrap().get("ref_t").unwrap(),
            &ParamValue::from("310")
        );
        assert_eq!(
            MdpFile::read_from_path(&path).unwrap().get("ref_t").unwrap(),
            &ParamValue::from("300")
        );
    }

    #[test]
    fn steps_uses_file_timestep() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mdp");
        fs::write(&path, RUN_MDP).unwrap();

        let text = run_to_string(mdp_args(&["steps", path.to_str().unwrap(), "100", "0.001"]))
            .unwrap();
        assert_eq!(text, "100\t50000\n0.001\t1\n");
    }

    #[test]
    fn unreadable_file_reports_path() {
        let result = run_to_string(mdp_args(&["get", "/nonexistent/run.mdp", "dt"]));
        assert!(matches!(result, Err(CliError::FileParsing { path, .. }) if path.ends_with("run.mdp")));
    }
}

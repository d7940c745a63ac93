use crate::cli::{StatsArgs, XpmArgs, XpmCommands};
use crate::error::{CliError, Result};
use crate::utils::progress::FileProgress;
use mdprep::analysis::ss_stats::SsStats;
use mdprep::core::io::xpm::XpmFile;
use mdprep::core::models::matrix::{AxisName, StructureMatrix};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: XpmArgs, quiet: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.command {
        XpmCommands::Info { file } => handle_info(&file, &mut out)?,
        XpmCommands::Stats(args) => {
            let progress = if quiet {
                FileProgress::hidden(args.files.len())
            } else {
                FileProgress::new(args.files.len())
            };
            handle_stats(&args, &progress, &mut out)?
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<StructureMatrix> {
    info!("Loading structure matrix from {:?}", path);
    XpmFile::load(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn axis_extent(matrix: &StructureMatrix, name: AxisName) -> String {
    let axis = matrix.axis(name);
    match (axis.get(0), axis.get(axis.len().saturating_sub(1))) {
        (Some(first), Some(last)) => format!("{} .. {} ({} ticks)", first, last, axis.len()),
        _ => "none".to_string(),
    }
}

fn handle_info(file: &Path, out: &mut impl Write) -> Result<()> {
    let matrix = load(file)?;
    let (cols, rows) = matrix.dimensions();
    writeln!(out, "columns: {}", cols)?;
    writeln!(out, "rows:    {}", rows)?;
    writeln!(out, "x-axis:  {}", axis_extent(&matrix, AxisName::X))?;
    writeln!(out, "y-axis:  {}", axis_extent(&matrix, AxisName::Y))?;
    writeln!(out, "legend:")?;
    for (code, entry) in matrix.legend() {
        writeln!(out, "  {}  {:<10} {}", code, entry.color, entry.name)?;
    }
    Ok(())
}

fn handle_stats(args: &StatsArgs, progress: &FileProgress, out: &mut impl Write) -> Result<()> {
    let mut stats = SsStats::new();
    for path in &args.files {
        progress.start(path);
        let matrix = load(path)?;
        stats.absorb(&matrix)?;
        progress.advance();
    }
    progress.finish();

    let keep: BTreeSet<char> = if args.keep.is_empty() {
        stats.legend().keys().copied().collect()
    } else {
        stats.codes_for_names(&args.keep)?
    };
    if keep.is_empty() {
        warn!("No legend categories to report; every code is counted as 'other'.");
    }
    let collapsed = stats.collapse(&keep);

    match &args.output {
        Some(path) => {
            collapsed.write_csv(File::create(path)?)?;
            info!(
                "Wrote {} time buckets to {}",
                collapsed.buckets().len(),
                path.display()
            );
        }
        None => collapsed.write_csv(out)?,
    }
    Ok(())
}

use elfcommon::prelude::*;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use derive_more::derive::Deref;
use elfcommon::system::Executor;
use elfread::Object;

use crate::cli::{CommonOptions, TopLevelOptions};
use crate::config::Config;
use crate::error::Error;

mod checker;

/// CLI Options for the check command
#[derive(Debug, Clone, PartialEq, Args, Deref)]
pub struct Options {
    /// Files or directories to check. Directories are searched recursively
    /// for ELF files.
    ///
    /// Uses `paths` from the `[check]` section of Elftool.toml if not given
    pub paths: Vec<String>,

    /// Select the check profile
    #[clap(short, long, default_value = "none")]
    pub profile: String,

    /// Common options
    #[deref]
    #[clap(flatten)]
    pub options: CommonOptions,
}

pub fn run(top: &TopLevelOptions, options: &Options) -> Result<(), Error> {
    let start_time = Instant::now();
    let root = Path::new(&top.dir).to_abs().change_context(Error::Collect)?;
    let root = root.as_path();

    let config = Config::load_or_default(root)?;
    let check = config
        .check
        .unwrap_or_default()
        .get_profile(&options.profile)?;

    let paths = if options.paths.is_empty() {
        &check.paths
    } else {
        &options.paths
    };
    if paths.is_empty() {
        errorln!("Error", "No files to check");
        hintln!(
            "Consider",
            "Pass files on the command line or set `paths` in the `[check]` section"
        );
        bail!(Error::NoInput);
    }

    let files = collect_files(root, paths)?;
    if files.is_empty() {
        errorln!("Error", "No ELF files found");
        bail!(Error::NoInput);
    }

    let executor = Executor::new();
    let checker = checker::load(root, check, &executor)?;
    let objects = load_objects(root, files, &executor)?;
    let report = checker.check(&objects)?;

    if !report.is_ok() {
        report.print();
        errorln!(
            "Failed",
            "{} problem(s) found in {} file(s)",
            report.problem_count(),
            objects.len()
        );
        bail!(Error::CheckError);
    }

    let elapsed = start_time.elapsed();
    infoln!(
        "Finished",
        "checked {} file(s) in {:.2}s",
        objects.len(),
        elapsed.as_secs_f32()
    );
    Ok(())
}

/// Expand the paths into the files to check
///
/// A file reached through more than one path is only returned once
fn collect_files(root: &Path, paths: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    let mut seen = BTreeSet::new();
    for path in paths {
        let path = root.join(path);
        if !path.exists() {
            errorln!("Error", "'{}' does not exist", path.display());
            return Err(report!(Error::Collect))
                .attach_printable(format!("path: {}", path.display()));
        }
        for file in system::find_files(&path, is_elf_file).change_context(Error::Collect)? {
            if seen.insert(file.to_abs().change_context(Error::Collect)?) {
                files.push(file);
            } else {
                verboseln!("'{}' is already included", file.display());
            }
        }
    }
    Ok(files)
}

/// Check the magic of a file without reading the whole file
fn is_elf_file(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .is_ok()
        && elfread::is_elf(&magic)
}

/// Parse the files in parallel. Objects are named by their path relative to root
fn load_objects(
    root: &Path,
    files: Vec<PathBuf>,
    executor: &Executor,
) -> Result<Vec<Object>, Error> {
    let tasks: Vec<_> = files
        .into_iter()
        .map(|path| {
            let name = path.rebase(root).display().to_string();
            let task_name = name.clone();
            let task = executor.execute(move || -> Result<Object, elfread::Error> {
                let mut object = Object::from_path(&path)?;
                object.name = task_name;
                verboseln!(
                    "loaded '{}' ({} symbols)",
                    object.name,
                    object.symbols.len() + object.dynamic_symbols.len()
                );
                Ok(object)
            });
            (name, task)
        })
        .collect();

    let mut objects = Vec::with_capacity(tasks.len());
    for (name, task) in tasks {
        let object = task
            .wait()
            .change_context_lazy(|| Error::Load(name.clone()))?
            .change_context_lazy(|| Error::Load(name.clone()))?;
        objects.push(object);
    }
    Ok(objects)
}

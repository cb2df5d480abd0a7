use elfcommon::print;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Inspect ELF files and check object files against a symbol policy
#[derive(Debug, Clone, PartialEq, Parser)]
#[clap(version, bin_name = "elftool")]
pub struct Cli {
    /// Top level options
    #[clap(flatten)]
    pub top: TopLevelOptions,

    /// Subcommand
    #[clap(subcommand)]
    pub command: Command,
}

/// Top level options
#[derive(Debug, Clone, PartialEq, Args)]
pub struct TopLevelOptions {
    /// Change the directory to run in
    ///
    /// Paths on the command line and in Elftool.toml are relative to it
    #[clap(short('C'), long, default_value = ".")]
    pub dir: String,
}

impl Cli {
    pub fn apply_print_options(&self) {
        if self.command.verbose {
            print::verbose_on();
        }

        match self.command.color {
            Some(ColorOption::Never) => print::color_off(),
            // color is already on by default
            Some(ColorOption::Always) => {}
            None => print::auto_color(),
        }
    }

    #[inline]
    pub fn is_trace_on(&self) -> bool {
        self.command.trace
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print the header, sections, segments and symbols of an ELF file
    Dump(crate::cmd_dump::Options),
    /// Check object files for unresolved, missing or disallowed symbols
    ///
    /// The rules are read from the `[check]` section of Elftool.toml
    Check(crate::cmd_check::Options),
}

impl std::ops::Deref for Command {
    type Target = CommonOptions;

    fn deref(&self) -> &Self::Target {
        match self {
            Command::Dump(x) => x,
            Command::Check(x) => x,
        }
    }
}

/// Common options for all commands
#[derive(Debug, Clone, PartialEq, Args)]
pub struct CommonOptions {
    /// Enable verbose output
    #[clap(short = 'V', long)]
    pub verbose: bool,

    /// Enable error trace
    #[clap(short = 'T', long)]
    pub trace: bool,

    /// Set output color option
    ///
    /// By default, color is enabled when stderr is terminal
    #[clap(long)]
    pub color: Option<ColorOption>,
}

/// Color options for output
#[derive(Debug, Clone, PartialEq, ValueEnum)]
pub enum ColorOption {
    Always,
    Never,
}

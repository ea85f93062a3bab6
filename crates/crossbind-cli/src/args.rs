//! Command-line argument definitions.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use crossbind_api::{ModelError, Platform};

/// Top-level invocation: `crossbind <command>`.
#[derive(Parser, Debug)]
#[command(name = "crossbind", version, about = "Compile and link cross-platform plugin APIs")]
pub struct Cli {
    /// Raise the log filter to debug.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// The build step to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The two build steps.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce one platform's fragment manifest.
    Compile(CompileArgs),

    /// Merge fragment manifests into a target's merged manifest.
    Link(LinkArgs),
}

/// Arguments to `crossbind compile <platform>`.
#[derive(clap::Args, Debug)]
pub struct CompileArgs {
    /// The platform whose sources to reflect.
    #[arg(value_parser = parse_platform)]
    pub platform: Platform,

    /// Directory holding the platform's reflected API manifest.
    #[arg(short = 's', long, default_value = ".")]
    pub source: PathBuf,

    /// Intermediate directory receiving the fragment manifest.
    #[arg(short = 'i', long, default_value = "build")]
    pub intermediate: PathBuf,

    /// Explicit output file, overriding the intermediate layout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Build the debug configuration (the default).
    #[arg(short = 'd', long, conflicts_with = "release")]
    pub debug: bool,

    /// Build the release configuration.
    #[arg(short = 'r', long)]
    pub release: bool,
}

impl CompileArgs {
    /// The selected build configuration.
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        Configuration::from_flags(self.release)
    }
}

/// Arguments to `crossbind link <target>`.
#[derive(clap::Args, Debug)]
pub struct LinkArgs {
    /// Target toolchain receiving the merged manifest.
    #[arg(value_enum)]
    pub target: LinkTarget,

    /// Intermediate directory holding fragment manifests; repeatable,
    /// one per compiled platform.
    #[arg(short = 'i', long = "intermediate", required = true)]
    pub intermediates: Vec<PathBuf>,

    /// Output file for the merged manifest.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Link the debug configuration (the default).
    #[arg(short = 'd', long, conflicts_with = "release")]
    pub debug: bool,

    /// Link the release configuration.
    #[arg(short = 'r', long)]
    pub release: bool,
}

impl LinkArgs {
    /// The selected build configuration.
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        Configuration::from_flags(self.release)
    }
}

/// Toolchains a merged manifest can be linked for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    /// Apache Cordova plugin packaging.
    Cordova,
    /// React Native module packaging.
    #[value(name = "reactnative")]
    ReactNative,
    /// Xamarin bindings packaging.
    Xamarin,
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cordova => "cordova",
            Self::ReactNative => "reactnative",
            Self::Xamarin => "xamarin",
        };
        f.write_str(name)
    }
}

/// Debug or release; debug unless `-r` is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    /// Unoptimized build with debug symbols.
    Debug,
    /// Optimized build.
    Release,
}

impl Configuration {
    fn from_flags(release: bool) -> Self {
        if release { Self::Release } else { Self::Debug }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Release => "release",
        })
    }
}

fn parse_platform(value: &str) -> Result<Platform, ModelError> {
    value.parse()
}

use crate::export::Target;
use crate::facebook::Config;
use clap::Parser;
use simplelog::LevelFilter;
use std::path::PathBuf;

fn select_log_level_filter(verbosity: i32) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init_logging(verbosity: i32) -> Result<(), log::SetLoggerError> {
    simplelog::TermLogger::init(
        select_log_level_filter(verbosity),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
}

#[derive(Debug, Parser)]
#[clap(name = "fbexport", version, author)]
/// Export a Facebook feed or message history to a directory
pub struct Opts {
    /// Level of verbosity
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: i32,
    /// Collection to export
    #[clap(short, long, value_enum, default_value = "messages")]
    pub target: Target,
    /// Optional TOML file containing Graph API settings
    #[clap(short, long)]
    pub key_file: Option<String>,
    /// Gzip each exported file
    #[clap(short = 'z', long)]
    pub compress: bool,
    /// Graph API access token
    pub access_token: Option<String>,
    /// Directory to write the export to
    pub output_dir: Option<PathBuf>,
}

impl Opts {
    /// The token and output directory handed to the export routine.
    ///
    /// Missing values become empty rather than defaults; the key file's token
    /// is only a fallback for a missing positional.
    pub fn invocation(&self, config: Option<&Config>) -> (String, PathBuf) {
        let token = self
            .access_token
            .clone()
            .or_else(|| config.and_then(|config| config.access_token().map(str::to_string)))
            .unwrap_or_default();

        (token, self.output_dir.clone().unwrap_or_default())
    }
}

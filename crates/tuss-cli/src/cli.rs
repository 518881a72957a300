//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tuss_map::DEFAULT_TOP_N;
use tuss_normalization::{DEFAULT_CONTRIB_FILE, DEFAULT_FUZZY_THRESHOLD, DEFAULT_LLM_THRESHOLD};
use tuss_persistence::DEFAULT_CACHE_FILE;

#[derive(Parser)]
#[command(
    name = "tuss",
    version,
    about = "Normalize free-text exam names to TUSS codes",
    long_about = "Normalize free-text medical exam names to TUSS standard names and codes.\n\n\
                  Names are matched against a dictionary of exams and aliases, first exactly,\n\
                  then by fuzzy similarity. Results are remembered in a mapping cache."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow raw exam names in trace output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize one or more exam names.
    Normalize(NormalizeArgs),

    /// Normalize every record of a JSON array file.
    Batch(BatchArgs),

    /// Record an externally resolved name in the cache.
    Resolve(ResolveArgs),

    /// Show mapping cache statistics.
    CacheStats(CacheArgs),

    /// Check a dictionary file for structural and data-quality problems.
    Validate(ValidateArgs),

    /// Show or refresh the cached remote dictionary.
    Dict(DictArgs),
}

/// Where the dictionary comes from.
#[derive(Args, Clone)]
pub struct DictionaryArgs {
    /// Local dictionary file (skips the remote dictionary).
    #[arg(long = "dict", value_name = "PATH", conflicts_with_all = ["remote_url", "refresh"])]
    pub dict: Option<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,
}

#[derive(Args, Clone)]
pub struct RemoteArgs {
    /// Remote dictionary URL.
    #[arg(long = "remote-url", value_name = "URL")]
    pub remote_url: Option<String>,

    /// Directory for the downloaded dictionary and its ETag.
    #[arg(long = "dict-cache-dir", value_name = "DIR")]
    pub dict_cache_dir: Option<PathBuf>,

    /// Dictionary used when the remote and its cache are unavailable.
    #[arg(long = "fallback", value_name = "PATH")]
    pub fallback: Option<PathBuf>,

    /// Ignore the dictionary cache TTL and ask the server.
    #[arg(long = "refresh")]
    pub refresh: bool,
}

#[derive(Args, Clone)]
pub struct EngineArgs {
    #[command(flatten)]
    pub dictionary: DictionaryArgs,

    /// Minimum fuzzy score to accept a match (0-100).
    #[arg(long = "threshold", value_name = "SCORE", default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    pub threshold: f64,

    /// Fuzzy matches below this score are flagged for external resolution (0-100).
    #[arg(long = "llm-threshold", value_name = "SCORE", default_value_t = DEFAULT_LLM_THRESHOLD)]
    pub llm_threshold: f64,

    /// Number of fuzzy candidates kept.
    #[arg(long = "top-n", value_name = "N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Mapping cache file.
    #[arg(long = "cache", value_name = "PATH", default_value = DEFAULT_CACHE_FILE)]
    pub cache: PathBuf,
}

#[derive(Parser)]
pub struct NormalizeArgs {
    /// Exam names to normalize.
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Print results as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,

    /// Print a resolution prompt for every name that needs one.
    #[arg(long = "prompt")]
    pub prompt: bool,
}

#[derive(Parser)]
pub struct BatchArgs {
    /// JSON array of exam records or names ("-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// Name as it appeared in the source system.
    #[arg(value_name = "ORIGINAL")]
    pub original: String,

    /// Standardized name chosen by the resolver.
    #[arg(value_name = "RESOLVED")]
    pub resolved: String,

    /// TUSS code, when known.
    #[arg(long = "code", value_name = "CODE")]
    pub code: Option<String>,

    /// Intake system the name came from.
    #[arg(long = "portal", value_name = "NAME", default_value = "unknown")]
    pub portal: String,

    /// Queue the mapping as a dictionary contribution in this file.
    #[arg(
        long = "contrib",
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_CONTRIB_FILE
    )]
    pub contrib: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Parser)]
pub struct CacheArgs {
    /// Mapping cache file.
    #[arg(long = "cache", value_name = "PATH", default_value = DEFAULT_CACHE_FILE)]
    pub cache: PathBuf,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Dictionary file to check.
    #[arg(value_name = "DICT")]
    pub dict: PathBuf,
}

#[derive(Parser)]
pub struct DictArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Delete the downloaded dictionary and its ETag.
    #[arg(long = "invalidate", conflicts_with = "refresh")]
    pub invalidate: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

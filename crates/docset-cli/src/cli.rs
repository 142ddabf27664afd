use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "docset",
    about = "Key-value, hash and sorted-set operations on a document snapshot",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON snapshot holding every collection
    #[arg(long, global = true, default_value = "docset.json")]
    pub data: PathBuf,

    /// TOML store configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Collection to operate on instead of the configured default
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read the object stored under a key
    Get(GetArgs),
    /// Upsert an object from a JSON document
    Set(SetArgs),
    /// Delete every object under the given keys
    Del(DelArgs),
    /// Add a sorted-set member
    Zadd(ZaddArgs),
    /// Remove a sorted-set member
    Zrem(ZremArgs),
    /// Read members by index range
    Zrange(ZrangeArgs),
    /// Read members by lexical range
    Zlex(ZlexArgs),
    /// Search members by prefix or wildcard
    Zsearch(ZsearchArgs),
    /// Count the intersection of sorted sets
    Zinter(ZinterArgs),
    /// Increment a counter field
    Incr(IncrArgs),
    /// Decrement a counter field
    Decr(CounterArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    /// Reshape the result to these fields
    #[arg(short, long = "field")]
    pub fields: Vec<String>,
    /// Return every object under the key
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    /// JSON object with the fields to write
    pub json: String,
}

#[derive(Args)]
pub struct DelArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args)]
pub struct ZaddArgs {
    pub key: String,
    #[arg(allow_negative_numbers = true)]
    pub rank: f64,
    pub value: String,
    /// Store the member as a number
    #[arg(long)]
    pub numeric: bool,
}

#[derive(Args)]
pub struct ZremArgs {
    pub key: String,
    pub value: String,
    #[arg(long)]
    pub numeric: bool,
}

#[derive(Args)]
pub struct ZrangeArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub start: i64,
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub stop: i64,
    #[arg(long, allow_negative_numbers = true)]
    pub min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub max: Option<f64>,
    /// Highest rank first
    #[arg(long)]
    pub rev: bool,
    #[arg(long)]
    pub with_ranks: bool,
}

#[derive(Args)]
pub struct ZlexArgs {
    pub key: String,
    /// Lower bound: `-`, `[value` or `(value`
    #[arg(allow_hyphen_values = true)]
    pub min: String,
    /// Upper bound: `+`, `[value` or `(value`
    #[arg(allow_hyphen_values = true)]
    pub max: String,
    #[arg(long)]
    pub rev: bool,
    #[arg(long, default_value_t = 0)]
    pub start: u64,
    #[arg(long)]
    pub count: Option<u64>,
    /// Print only the number of matches
    #[arg(long)]
    pub count_only: bool,
}

#[derive(Args)]
pub struct ZsearchArgs {
    pub key: String,
    /// Prefix to match; `*` matches anything
    pub term: String,
    #[arg(long, default_value_t = 0)]
    pub skip: u64,
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long)]
    pub with_ranks: bool,
}

#[derive(Args)]
pub struct ZinterArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args)]
pub struct IncrArgs {
    pub key: String,
    pub field: String,
    /// Amount to add instead of one
    #[arg(long, allow_negative_numbers = true)]
    pub by: Option<f64>,
}

#[derive(Args)]
pub struct CounterArgs {
    pub key: String,
    pub field: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get_with_fields() {
        let cli = Cli::try_parse_from(["docset", "get", "user:1", "-f", "name", "-f", "age"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.key, "user:1");
            assert_eq!(args.fields, vec!["name", "age"]);
            assert!(!args.all);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_zadd_negative_rank() {
        let cli = Cli::try_parse_from(["docset", "zadd", "s", "-2.5", "a"]).unwrap();
        if let Command::Zadd(args) = cli.command {
            assert_eq!(args.rank, -2.5);
            assert_eq!(args.value, "a");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_zrange_defaults() {
        let cli = Cli::try_parse_from(["docset", "zrange", "a", "b"]).unwrap();
        if let Command::Zrange(args) = cli.command {
            assert_eq!(args.keys, vec!["a", "b"]);
            assert_eq!((args.start, args.stop), (0, -1));
            assert!(!args.rev && !args.with_ranks);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_zrange_negative_window() {
        let cli = Cli::try_parse_from(["docset", "zrange", "s", "--start", "-3", "--stop", "-2", "--rev"]).unwrap();
        if let Command::Zrange(args) = cli.command {
            assert_eq!((args.start, args.stop), (-3, -2));
            assert!(args.rev);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_zlex_open_bounds() {
        let cli = Cli::try_parse_from(["docset", "zlex", "s", "-", "+"]).unwrap();
        if let Command::Zlex(args) = cli.command {
            assert_eq!(args.min, "-");
            assert_eq!(args.max, "+");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "docset", "--data", "/tmp/s.json", "--collection", "sessions", "-v", "--format", "json", "zinter", "a", "b",
        ])
        .unwrap();
        assert_eq!(cli.data, PathBuf::from("/tmp/s.json"));
        assert_eq!(cli.collection.as_deref(), Some("sessions"));
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn zinter_needs_keys() {
        assert!(Cli::try_parse_from(["docset", "zinter"]).is_err());
    }
}

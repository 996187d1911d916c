//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use ia_miner::mine::constants::{DEFAULT_MAX_RETRIES, DEFAULT_ROWS, DEFAULT_WORKERS};

/// Concurrently retrieve metadata from Archive.org items.
///
/// Mines item metadata, search results, or arbitrary archive URLs and
/// writes each JSON response to stdout, one document per line.
#[derive(Parser, Debug)]
#[command(name = "ia-mine")]
#[command(author, version, about)]
pub struct Args {
    /// File containing identifiers to mine, one per line ("-" for stdin)
    pub input: Option<String>,

    /// Mine metadata for every item in the archive
    #[arg(short, long, conflicts_with_all = ["input", "search"])]
    pub all: bool,

    /// Mine search results for the given query
    #[arg(short, long, value_name = "QUERY", conflicts_with = "input")]
    pub search: Option<String>,

    /// Mine the metadata of each item in the search results
    #[arg(short, long, group = "output_mode")]
    pub mine_ids: bool,

    /// Print the response header for the given search and exit
    #[arg(short, long, group = "output_mode")]
    pub info: bool,

    /// Print the total number of hits for the given search and exit
    #[arg(short, long, group = "output_mode")]
    pub num_found: bool,

    /// Print identifiers only, one per line
    #[arg(long, group = "output_mode")]
    pub itemlist: bool,

    /// Metadata field to return for each search document (repeatable)
    #[arg(short, long, value_name = "FIELD")]
    pub field: Vec<String>,

    /// Number of search documents per page
    #[arg(long, default_value_t = DEFAULT_ROWS, value_parser = clap::value_parser!(u32).range(1..))]
    pub rows: u32,

    /// Maximum concurrent requests
    #[arg(short, long, default_value_t = DEFAULT_WORKERS as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: u64,

    /// Maximum retry attempts per request
    #[arg(short, long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub retries: u32,

    /// Use HTTPS for all requests
    #[arg(long)]
    pub secure: bool,

    /// File containing a list of hosts to shuffle requests across
    #[arg(short = 'H', long, value_name = "FILE")]
    pub hosts: Option<PathBuf>,

    /// Allow responses to be served from the archive's cache
    #[arg(short, long)]
    pub cache: bool,

    /// Turn on verbose logging
    #[arg(short, long)]
    pub debug: bool,

    /// Path to the credential config file
    #[arg(short = 'C', long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Prompt for credentials, exchange them for keys, and save the config
    #[arg(long)]
    pub configure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["ia-mine"]).unwrap();
        assert!(args.input.is_none());
        assert!(!args.all);
        assert!(args.search.is_none());
        assert_eq!(args.rows, 50); // DEFAULT_ROWS
        assert_eq!(args.workers, 100); // DEFAULT_WORKERS
        assert_eq!(args.retries, 10); // DEFAULT_MAX_RETRIES
        assert!(!args.secure);
        assert!(!args.cache);
        assert!(!args.debug);
    }

    #[test]
    fn test_cli_positional_itemlist_file() {
        let args = Args::try_parse_from(["ia-mine", "items.txt"]).unwrap();
        assert_eq!(args.input.as_deref(), Some("items.txt"));
    }

    #[test]
    fn test_cli_dash_means_stdin() {
        let args = Args::try_parse_from(["ia-mine", "-"]).unwrap();
        assert_eq!(args.input.as_deref(), Some("-"));
    }

    #[test]
    fn test_cli_search_flag_takes_query() {
        let args = Args::try_parse_from(["ia-mine", "-s", "collection:nasa"]).unwrap();
        assert_eq!(args.search.as_deref(), Some("collection:nasa"));

        let args = Args::try_parse_from(["ia-mine", "--search", "mediatype:texts"]).unwrap();
        assert_eq!(args.search.as_deref(), Some("mediatype:texts"));
    }

    #[test]
    fn test_cli_all_conflicts_with_input_and_search() {
        let result = Args::try_parse_from(["ia-mine", "--all", "items.txt"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );

        let result = Args::try_parse_from(["ia-mine", "--all", "-s", "nasa"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_search_conflicts_with_itemlist_input() {
        let result = Args::try_parse_from(["ia-mine", "items.txt", "-s", "nasa"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_repeatable_field_flag() {
        let args =
            Args::try_parse_from(["ia-mine", "-s", "nasa", "-f", "title", "-f", "date"]).unwrap();
        assert_eq!(args.field, vec!["title", "date"]);
    }

    #[test]
    fn test_cli_output_modes_are_mutually_exclusive() {
        for flags in [
            ["--mine-ids", "--itemlist"],
            ["--info", "--num-found"],
            ["--mine-ids", "--info"],
            ["--itemlist", "--num-found"],
        ] {
            let result = Args::try_parse_from(["ia-mine", "-s", "nasa", flags[0], flags[1]]);
            assert!(result.is_err(), "{flags:?} should conflict");
            assert_eq!(
                result.unwrap_err().kind(),
                clap::error::ErrorKind::ArgumentConflict
            );
        }
    }

    #[test]
    fn test_cli_workers_zero_rejected() {
        let result = Args::try_parse_from(["ia-mine", "-w", "0"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_rows_zero_rejected() {
        let result = Args::try_parse_from(["ia-mine", "--rows", "0"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_retries_zero_allowed() {
        // 0 retries means a single attempt per request
        let args = Args::try_parse_from(["ia-mine", "-r", "0"]).unwrap();
        assert_eq!(args.retries, 0);
    }

    #[test]
    fn test_cli_hosts_and_config_paths() {
        let args = Args::try_parse_from([
            "ia-mine",
            "-H",
            "hosts.txt",
            "-C",
            "/tmp/creds.toml",
        ])
        .unwrap();
        assert_eq!(args.hosts, Some(PathBuf::from("hosts.txt")));
        assert_eq!(args.config_file, Some(PathBuf::from("/tmp/creds.toml")));
    }

    #[test]
    fn test_cli_combined_search_flags() {
        let args = Args::try_parse_from([
            "ia-mine", "-s", "nasa", "--mine-ids", "--rows", "200", "-w", "8", "--secure",
            "--cache", "-d",
        ])
        .unwrap();
        assert_eq!(args.search.as_deref(), Some("nasa"));
        assert!(args.mine_ids);
        assert_eq!(args.rows, 200);
        assert_eq!(args.workers, 8);
        assert!(args.secure && args.cache && args.debug);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["ia-mine", "--help"]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["ia-mine", "--version"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["ia-mine", "--invalid-flag"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::UnknownArgument
        );
    }
}

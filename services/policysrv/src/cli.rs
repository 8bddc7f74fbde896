use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about = "Reactive signal policy engine", long_about = None)]
pub struct Args {
    /// Rule document (YAML sequence of condition/emit blocks)
    #[arg(value_name = "RULES")]
    pub rules: PathBuf,

    /// Initial-state document (YAML sequence of "name = value" entries)
    #[arg(short, long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Signal transport: stdio or replay:<path>
    #[arg(short, long, value_name = "SELECTOR")]
    pub transport: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter, overrides the configured level (RUST_LOG still wins)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Compile the rules, print a summary and exit
    #[arg(long)]
    pub check: bool,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let args = Args::try_parse_from(["policysrv", "rules.yaml"]).unwrap();
        assert_eq!(args.rules, PathBuf::from("rules.yaml"));
        assert!(args.state.is_none());
        assert!(args.transport.is_none());
        assert!(!args.check);
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "policysrv",
            "rules.yaml",
            "--state",
            "state.yaml",
            "--transport",
            "replay:in.txt",
            "--config",
            "policysrv.yaml",
            "--log-level",
            "debug",
            "--check",
        ])
        .unwrap();
        assert_eq!(args.state, Some(PathBuf::from("state.yaml")));
        assert_eq!(args.transport.as_deref(), Some("replay:in.txt"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.check);
    }

    #[test]
    fn test_rules_path_is_required() {
        assert!(Args::try_parse_from(["policysrv"]).is_err());
    }
}

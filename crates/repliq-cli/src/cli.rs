//! Command-line arguments and their validation.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use repliq_engine::{FilterSpec, ReplError, ReportFormat};

/// Arguments of the `repliq` binary.
#[derive(Parser, Debug)]
#[command(name = "repliq")]
#[command(
    about = "Discover directories one level below a basepath and manage their replication relationships",
    long_about = None
)]
pub struct Cli {
    /// What to do
    #[arg(long, value_enum, default_value_t = ActionArg::Summary)]
    pub action: ActionArg,

    /// Source cluster hostname or IP address
    #[arg(long = "src_host")]
    pub src_host: Option<String>,

    /// Source cluster username
    #[arg(long = "src_user")]
    pub src_user: Option<String>,

    /// Source cluster password (prompted when omitted)
    #[arg(long = "src_password", env = "REPLIQ_SRC_PASSWORD", hide_env_values = true)]
    pub src_password: Option<String>,

    /// Destination cluster hostname or IP address
    #[arg(long = "dst_host")]
    pub dst_host: Option<String>,

    /// Destination cluster username
    #[arg(long = "dst_user")]
    pub dst_user: Option<String>,

    /// Destination cluster password (prompted when omitted)
    #[arg(long = "dst_password", env = "REPLIQ_DST_PASSWORD", hide_env_values = true)]
    pub dst_password: Option<String>,

    /// Destination floating addresses to use instead of a whole network
    #[arg(long = "dst", num_args = 1..)]
    pub dst: Vec<String>,

    /// Destination network whose floating addresses receive new relationships
    #[arg(long = "dst_network")]
    pub dst_network: Option<String>,

    /// Prefix prepended to every source path on the destination
    #[arg(long = "dst_path")]
    pub dst_path: Option<String>,

    /// Directory whose immediate children are replicated
    #[arg(long, default_value = "/")]
    pub basepath: String,

    /// Only directories whose name contains one of these terms
    #[arg(long, num_args = 1..)]
    pub filteri: Vec<String>,

    /// Skip directories whose name contains one of these terms
    #[arg(long, num_args = 1..)]
    pub filtere: Vec<String>,

    /// Allow replication into non-empty directories
    #[arg(long = "allow_non_empty_dir")]
    pub allow_non_empty_dir: bool,

    /// Ask before accepting pending relationships
    #[arg(long)]
    pub confirm: bool,

    /// Make source directories read-only before deleting their relationships
    #[arg(long = "set_readonly")]
    pub set_readonly: bool,

    /// Screen format of the summary
    #[arg(long, value_enum, default_value_t = FormatArg::Table)]
    pub format: FormatArg,

    /// Save the summary to this CSV file
    #[arg(long, value_name = "FILEPATH")]
    pub csv: Option<PathBuf>,

    /// Write the CSV file without printing the summary
    #[arg(long = "csv-only")]
    pub csv_only: bool,

    /// Tool configuration file (.toml or .json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for the per-run log file
    #[arg(long = "log_dir")]
    pub log_dir: Option<PathBuf>,
}

/// Action selected with `--action`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionArg {
    /// Report relationships on both clusters.
    Summary,
    /// Create relationships for the children of `--basepath`.
    Create,
    /// Accept pending relationships on the destination.
    Accept,
    /// Delete relationships, and ENDED remnants on the destination.
    Clean,
}

/// Screen format selected with `--format`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// Fixed-width table.
    Table,
    /// One block per relationship.
    Card,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Table => ReportFormat::Table,
            FormatArg::Card => ReportFormat::Card,
        }
    }
}

impl Cli {
    /// Source host and user were both given.
    pub fn has_source(&self) -> bool {
        self.src_host.is_some() && self.src_user.is_some()
    }

    /// Destination host and user were both given.
    pub fn has_destination(&self) -> bool {
        self.dst_host.is_some() && self.dst_user.is_some()
    }

    /// Check the argument combination before any connection is made.
    pub fn validate(&self) -> Result<(), ReplError> {
        let action = match self.action {
            ActionArg::Summary => "summary",
            ActionArg::Create => "create",
            ActionArg::Accept => "accept",
            ActionArg::Clean => "clean",
        };

        if matches!(self.action, ActionArg::Summary | ActionArg::Create) && !self.has_source() {
            return Err(ReplError::Configuration(format!(
                "--src_host and --src_user are required for '{}' action",
                action
            )));
        }
        if matches!(self.action, ActionArg::Create | ActionArg::Accept) && !self.has_destination()
        {
            return Err(ReplError::Configuration(format!(
                "--dst_host and --dst_user are required for '{}' action",
                action
            )));
        }
        if self.action == ActionArg::Clean && !self.has_source() && !self.has_destination() {
            return Err(ReplError::Configuration(
                "'clean' action requires at least src or dst credentials".to_string(),
            ));
        }
        if self.csv_only && self.csv.is_none() {
            return Err(ReplError::Configuration(
                "--csv-only requires --csv FILEPATH".to_string(),
            ));
        }
        self.filter()?;
        Ok(())
    }

    /// Directory filter from `--filteri`/`--filtere`.
    pub fn filter(&self) -> Result<FilterSpec, ReplError> {
        FilterSpec::from_terms(&self.filteri, &self.filtere)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repliq_engine::FilterMode;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["repliq"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--src_host", "src", "--src_user", "admin"]);
        assert_eq!(cli.action, ActionArg::Summary);
        assert_eq!(cli.basepath, "/");
        assert_eq!(cli.format, FormatArg::Table);
        assert!(cli.dst.is_empty());
        assert!(!cli.confirm);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_create_arguments() {
        let cli = parse(&[
            "--action", "create",
            "--src_host", "src", "--src_user", "admin",
            "--dst_host", "dst", "--dst_user", "admin",
            "--dst", "10.1.1.20", "10.1.1.21",
            "--dst_path", "/backup",
            "--basepath", "/data",
            "--filteri", "prod", "db",
        ]);
        assert_eq!(cli.action, ActionArg::Create);
        assert_eq!(cli.dst, vec!["10.1.1.20", "10.1.1.21"]);
        assert_eq!(cli.dst_path.as_deref(), Some("/backup"));
        assert_eq!(cli.filter().unwrap().mode(), FilterMode::Include);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_summary_requires_source() {
        let cli = parse(&["--dst_host", "dst", "--dst_user", "admin"]);
        let err = cli.validate().unwrap_err();
        assert!(err.to_string().contains("--src_host and --src_user"));
    }

    #[test]
    fn test_create_requires_destination() {
        let cli = parse(&["--action", "create", "--src_host", "src", "--src_user", "admin"]);
        assert!(cli.validate().unwrap_err().to_string().contains("--dst_host"));
    }

    #[test]
    fn test_accept_needs_only_destination() {
        let cli = parse(&["--action", "accept", "--dst_host", "dst", "--dst_user", "admin", "--confirm"]);
        assert!(cli.validate().is_ok());
        assert!(cli.confirm);
    }

    #[test]
    fn test_clean_needs_one_side() {
        let cli = parse(&["--action", "clean"]);
        assert!(cli.validate().is_err());
        let cli = parse(&["--action", "clean", "--dst_host", "dst", "--dst_user", "admin"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_csv_only_requires_csv() {
        let cli = parse(&["--src_host", "src", "--src_user", "admin", "--csv-only"]);
        assert!(cli.validate().is_err());
        let cli = parse(&[
            "--src_host", "src", "--src_user", "admin", "--csv", "out.csv", "--csv-only",
        ]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_both_filters_rejected() {
        let cli = parse(&[
            "--src_host", "src", "--src_user", "admin", "--filteri", "a", "--filtere", "b",
        ]);
        let err = cli.validate().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_empty_filter_term_rejected() {
        let cli = parse(&["--action", "clean", "--src_host", "s", "--src_user", "u", "--filtere", ""]);
        let err = cli.validate().unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_card_format() {
        let cli = parse(&["--src_host", "s", "--src_user", "u", "--format", "card"]);
        assert_eq!(ReportFormat::from(cli.format), ReportFormat::Card);
    }
}

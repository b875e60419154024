use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use mira_harness::devices::{desktop_chrome, device_catalogue, safari_projects, DeviceProfile};

/// Scenario bundle to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Single iteration on desktop Chrome, fastest signal.
    Quick,
    /// The historically failure-prone targets (2, then 3), back to back.
    Iterations,
    /// Complete flow across every configured device project.
    Full,
    /// Complete flow once, intended for scheduled health checks.
    Monitoring,
    /// Complete flow plus a 50-property bulk callback.
    Stress,
    /// Complete flow across the WebKit projects only.
    Safari,
}

impl RunMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Iterations => "iterations",
            Self::Full => "full",
            Self::Monitoring => "monitoring",
            Self::Stress => "stress",
            Self::Safari => "safari",
        }
    }

    /// Device projects the mode runs against.
    pub fn device_projects(self) -> Vec<DeviceProfile> {
        match self {
            Self::Quick | Self::Iterations | Self::Monitoring | Self::Stress => {
                vec![desktop_chrome()]
            }
            Self::Full => device_catalogue(),
            Self::Safari => safari_projects(),
        }
    }

    /// Highest conversation iteration the mode drives to.
    pub fn target_iteration(self) -> u32 {
        match self {
            Self::Quick => 1,
            _ => 3,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mira-qa",
    about = "End-to-end QA harness for the chat property-search callback pipeline",
    version
)]
pub struct Cli {
    #[arg(value_enum, default_value_t = RunMode::Quick, help = "Scenario bundle to run")]
    pub mode: RunMode,

    #[arg(long, help = "Run the browser headed instead of headless")]
    pub headed: bool,

    #[arg(long, help = "Enable debug-level logging")]
    pub debug: bool,

    #[arg(long, help = "Write the aggregated JSON report under qa-reports/")]
    pub report: bool,

    #[arg(long, help = "Run device projects concurrently")]
    pub parallel: bool,

    #[arg(long, env = "MIRA_BASE_URL", help = "Application under test")]
    pub base_url: Option<String>,

    #[arg(long, env = "MIRA_CONFIG", help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "MIRA_BRIDGE_CLI",
        help = "Path to the Playwright bridge CLI; omit to run against the in-process client double"
    )]
    pub bridge_cli: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, RunMode};

    #[test]
    fn unit_default_mode_is_quick() {
        let cli = Cli::parse_from(["mira-qa"]);
        assert_eq!(cli.mode, RunMode::Quick);
        assert!(!cli.report);
    }

    #[test]
    fn unit_mode_bundles_map_to_expected_projects() {
        assert_eq!(RunMode::Quick.device_projects().len(), 1);
        assert_eq!(RunMode::Full.device_projects().len(), 11);
        assert!(RunMode::Safari.device_projects().len() < 11);
        assert_eq!(RunMode::Quick.target_iteration(), 1);
        assert_eq!(RunMode::Full.target_iteration(), 3);
    }

    #[test]
    fn functional_flags_parse_together() {
        let cli = Cli::parse_from([
            "mira-qa",
            "stress",
            "--report",
            "--parallel",
            "--base-url",
            "http://localhost:3000",
        ]);
        assert_eq!(cli.mode, RunMode::Stress);
        assert!(cli.report);
        assert!(cli.parallel);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:3000"));
    }
}

use crate::app::POLL_INTERVAL_ACTIVE;
use crate::prefs::{PreferenceKey, PreferenceValue, StaticPreferences};
use clap::Parser;
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "plw", version = VERSION, about = "Jenkins pipeline run log watcher TUI")]
pub struct Cli {
    /// Jenkins base URL (e.g. https://ci.example.com)
    #[arg(short, long, value_parser = validate_url)]
    pub url: String,

    /// Pipeline full name; folders are separated by '/'
    #[arg(short, long)]
    pub pipeline: String,

    /// Branch of a multibranch pipeline
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Run id to follow
    #[arg(short, long)]
    pub run: String,

    /// Node (stage) to focus initially
    #[arg(short, long)]
    pub node: Option<String>,

    /// Blue Ocean organization
    #[arg(long, default_value = "jenkins")]
    pub organization: String,

    /// Credentials as user:api-token
    #[arg(long)]
    pub user: Option<String>,

    /// Run poll interval in seconds while the run is active
    #[arg(short, long, default_value_t = POLL_INTERVAL_ACTIVE, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// JSON file of message overrides (key -> template)
    #[arg(long)]
    pub messages: Option<PathBuf>,

    /// Show the "waiting for backend" placeholder while loading
    #[arg(long, value_enum, default_value_t = PreferenceValue::Default)]
    pub show_pending: PreferenceValue,

    /// Follow the running step
    #[arg(long, value_enum, default_value_t = PreferenceValue::Default)]
    pub karaoke: PreferenceValue,

    /// Reload everything once the run finishes
    #[arg(long, value_enum, default_value_t = PreferenceValue::Default)]
    pub update_on_finish: PreferenceValue,

    /// `always`: clicking a node never resumes following
    #[arg(long, value_enum, default_value_t = PreferenceValue::Default)]
    pub stop_on_click: PreferenceValue,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Enable verbose logging to $XDG_STATE_HOME/plw/debug.log
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    pub fn preferences(&self) -> StaticPreferences {
        StaticPreferences::new()
            .with(PreferenceKey::ShowPending, self.show_pending)
            .with(PreferenceKey::Karaoke, self.karaoke)
            .with(PreferenceKey::UpdateOnFinish, self.update_on_finish)
            .with(PreferenceKey::StopKaraokeOnAnyNodeClick, self.stop_on_click)
    }
}

/// Accepts absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<String, String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !url.contains(char::is_whitespace) => {
            Ok(url.trim_end_matches('/').to_string())
        }
        _ => Err(format!(
            "Invalid Jenkins URL '{url}'. Expected e.g. 'https://ci.example.com'."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{DisplayPreferences, PreferenceStore};

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["plw", "--url", "https://ci.example.com", "--pipeline", "app", "--run", "12"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
    }

    #[test]
    fn valid_urls() {
        assert_eq!(validate_url("https://ci.example.com/").unwrap(), "https://ci.example.com");
        assert!(validate_url("http://localhost:8080/jenkins").is_ok());
    }

    #[test]
    fn invalid_urls() {
        assert!(validate_url("ci.example.com").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("ftp://ci").is_err());
        assert!(validate_url("https://ci example").is_err());
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.organization, "jenkins");
        assert_eq!(cli.interval, POLL_INTERVAL_ACTIVE);
        assert_eq!(cli.branch, None);
        let prefs = DisplayPreferences::load(&cli.preferences());
        assert!(prefs.karaoke_allowed);
        assert!(prefs.show_pending);
        assert!(prefs.update_on_finish);
        assert!(!prefs.stop_on_click);
    }

    #[test]
    fn preference_flags() {
        let cli = parse(&["--karaoke", "never", "--stop-on-click", "always"]).unwrap();
        let store = cli.preferences();
        assert_eq!(store.get(PreferenceKey::Karaoke), PreferenceValue::Never);
        assert_eq!(store.get(PreferenceKey::StopKaraokeOnAnyNodeClick), PreferenceValue::Always);
        assert_eq!(store.get(PreferenceKey::ShowPending), PreferenceValue::Default);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["--karaoke", "sometimes"]).is_err());
        assert!(parse(&["--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["plw", "--pipeline", "app", "--run", "1"]).is_err());
    }
}

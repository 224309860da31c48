//! Configuration commands.

use crate::config::Settings;
use crate::error::{CliError, CliResult};
use crate::secret::SecretRef;

const REDACTED: &str = "<redacted>";

/// Dump the current configuration to stdout.
pub fn dump(settings: &Settings) -> CliResult<()> {
    let toml_str = render(settings)?;
    println!("# config.toml ({})", Settings::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Renders settings as TOML with literal tokens hidden.
///
/// `env::` and `pass::` references are shown as written.
pub fn render(settings: &Settings) -> CliResult<String> {
    let mut shown = settings.clone();
    if let Some(ref token) = shown.token {
        if matches!(SecretRef::parse(token), SecretRef::Literal(_)) {
            shown.token = Some(REDACTED.to_string());
        }
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(settings: &Settings) -> CliResult<()> {
    settings.fetcher.to_fetcher_config()?;

    if settings.upstream.base_url.is_some() {
        settings.upstream.to_http_config(None)?;
        println!("Upstream URL is valid.");
    }

    if settings.resolve_token()?.is_some() {
        println!("Token reference resolves.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", Settings::default_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_token_is_redacted() {
        let settings = Settings {
            token: Some("abc123".to_string()),
            ..Default::default()
        };
        let rendered = render(&settings).unwrap();
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn token_reference_is_shown() {
        let settings = Settings {
            token: Some("env::PORTAL_TOKEN".to_string()),
            ..Default::default()
        };
        assert!(render(&settings).unwrap().contains("env::PORTAL_TOKEN"));
    }

    #[test]
    fn rendered_config_parses_back() {
        let mut settings = Settings::default();
        settings.fetcher.page_cap = 7;
        settings.upstream.base_url = Some("https://portal.example.edu/api".to_string());

        let parsed: Settings = toml::from_str(&render(&settings).unwrap()).unwrap();
        assert_eq!(parsed.fetcher.page_cap, 7);
        assert_eq!(parsed.upstream.base_url, settings.upstream.base_url);
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.upstream.base_url = Some("ftp://portal.example.edu".to_string());
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&Settings::default()).is_ok());
    }
}

//! `calscrape fetch`.

use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use calscrape_core::CalendarResponse;
use calscrape_upstream::{CalendarFetcher, CancellationToken, HttpSessionClient};

use crate::cli::FetchArgs;
use crate::config::Settings;
use crate::error::CliResult;

/// Fetches the requested month.
///
/// Only setup problems are errors; a failed fetch is returned as a
/// response with `Error` set. Ctrl-C cancels the fetch in flight.
pub async fn run(args: &FetchArgs, settings: &Settings) -> CliResult<CalendarResponse> {
    let fetcher_config = settings.fetcher.to_fetcher_config()?;
    let http_config = settings.upstream.to_http_config(args.base_url.as_deref())?;
    let token = select_token(args.token.as_deref(), settings)?;
    let year = args.year.unwrap_or_else(|| current_year(fetcher_config.timezone));

    debug!(
        upstream = %http_config.base_url,
        year,
        month = args.month,
        "starting fetch"
    );

    let fetcher = CalendarFetcher::new(HttpSessionClient::new(http_config)?, fetcher_config);

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let response = fetcher
        .fetch_month_with_cancel(&token, year, args.month, &cancel)
        .await;
    watcher.abort();

    Ok(response)
}

/// Command line token first, then the configured one.
///
/// No token at all yields an empty string, which the fetcher reports as a
/// missing credential.
pub fn select_token(cli_token: Option<&str>, settings: &Settings) -> CliResult<String> {
    if let Some(token) = cli_token {
        return Ok(token.to_string());
    }
    Ok(settings.resolve_token()?.unwrap_or_default())
}

/// Renders the response as JSON.
pub fn render(response: &CalendarResponse, pretty: bool) -> CliResult<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    Ok(rendered)
}

fn current_year(tz: Tz) -> i32 {
    Utc::now().with_timezone(&tz).year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_token_wins_over_config() {
        let settings = Settings {
            token: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(select_token(Some("from-cli"), &settings).unwrap(), "from-cli");
        assert_eq!(select_token(None, &settings).unwrap(), "from-config");
    }

    #[test]
    fn no_token_is_empty() {
        assert_eq!(select_token(None, &Settings::default()).unwrap(), "");
    }

    #[test]
    fn unresolvable_token_errors() {
        let settings = Settings {
            token: Some("env::_CALSCRAPE_FETCH_UNSET_4321".to_string()),
            ..Default::default()
        };
        assert!(select_token(None, &settings).is_err());
    }

    #[test]
    fn renders_compact_and_pretty() {
        let response = CalendarResponse::failure(401, "Missing authentication token");

        let compact = render(&response, false).unwrap();
        assert_eq!(
            compact,
            r#"{"Error":true,"Message":"Missing authentication token","Status":401,"Calendar":[]}"#
        );

        let pretty = render(&response, true).unwrap();
        assert!(pretty.contains("\n  \"Status\": 401"));
    }

    #[tokio::test]
    async fn missing_base_url_is_setup_error() {
        let args = FetchArgs {
            month: 10,
            year: Some(2025),
            token: Some("abc123".to_string()),
            base_url: None,
            pretty: false,
        };
        assert!(run(&args, &Settings::default()).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_failed_response() {
        let mut settings = Settings::default();
        settings.fetcher.retry.max_attempts = 1;
        settings.upstream.request_timeout_secs = 1;
        let args = FetchArgs {
            month: 10,
            year: Some(2025),
            token: Some("abc123".to_string()),
            base_url: Some("http://127.0.0.1:9".to_string()),
            pretty: false,
        };

        let response = run(&args, &settings).await.unwrap();
        assert!(response.error);
        assert_eq!(response.status, 502);
        assert!(response.calendar.is_empty());
    }
}

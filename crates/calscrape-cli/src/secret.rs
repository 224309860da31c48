//! Secret references in configuration values.
//!
//! The `token` in `config.toml` does not have to be stored in the file:
//!
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - `pass::path/in/store` reads the first line of `pass show path/in/store`
//! - anything else is the literal value

use std::process::Command;

use crate::error::{CliError, CliResult};

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Env(&'a str),
    Pass(&'a str),
    Literal(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Literal(value)
        }
    }

    /// Returns the secret the reference points at.
    pub fn resolve(&self) -> CliResult<String> {
        match *self {
            Self::Env(var) => std::env::var(var).map_err(|_| {
                CliError::Secret(format!("environment variable `{}` is not set", var))
            }),
            Self::Pass(path) => read_pass(path),
            Self::Literal(value) => Ok(value.to_string()),
        }
    }
}

/// Resolves `value`, expanding `env::` and `pass::` references.
pub fn resolve(value: &str) -> CliResult<String> {
    SecretRef::parse(value).resolve()
}

fn read_pass(path: &str) -> CliResult<String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| CliError::Secret(format!("cannot run `pass show {}`: {}", path, e)))?;

    if !output.status.success() {
        return Err(CliError::Secret(format!(
            "`pass show {}` exited with {}: {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| CliError::Secret(format!("`pass show {}` printed nothing", path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixes() {
        assert_eq!(SecretRef::parse("env::TOKEN"), SecretRef::Env("TOKEN"));
        assert_eq!(SecretRef::parse("pass::portal/token"), SecretRef::Pass("portal/token"));
        assert_eq!(SecretRef::parse("abc123"), SecretRef::Literal("abc123"));
        assert_eq!(SecretRef::parse("env:TOKEN"), SecretRef::Literal("env:TOKEN"));
    }

    #[test]
    fn literal_passthrough() {
        assert_eq!(resolve("abc123").unwrap(), "abc123");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn env_reference_resolves() {
        unsafe {
            std::env::set_var("_CALSCRAPE_TEST_SECRET", "tok-from-env");
        }
        assert_eq!(resolve("env::_CALSCRAPE_TEST_SECRET").unwrap(), "tok-from-env");
        unsafe {
            std::env::remove_var("_CALSCRAPE_TEST_SECRET");
        }
    }

    #[test]
    fn missing_env_var_errors() {
        let err = resolve("env::_CALSCRAPE_UNSET_VAR_98765").unwrap_err();
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn unknown_pass_entry_errors() {
        assert!(resolve("pass::calscrape/does/not/exist/98765").is_err());
    }
}

//! Credential file expiry check.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::monitor::{CredentialCheckOptions, MonitorError};
use crate::result::{CheckResult, PerfData};

const JWT_BEGIN: &str = "-----BEGIN NATS USER JWT-----";

/// Claims read from the user JWT.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserClaims {
    pub name: String,
    pub sub: String,
    pub iat: Option<i64>,
    pub exp: Option<i64>,
}

/// Extract and decode the user JWT claims from a `.creds` document.
pub fn parse_user_claims(creds: &str) -> Result<UserClaims, MonitorError> {
    let jwt = creds
        .lines()
        .skip_while(|l| !l.trim().starts_with(JWT_BEGIN))
        .skip(1)
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| MonitorError::Credential("no user JWT found".to_string()))?;

    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| MonitorError::Credential("malformed JWT".to_string()))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| MonitorError::Credential(format!("invalid JWT encoding: {}", e)))?;

    Ok(serde_json::from_slice(&decoded)?)
}

/// Evaluate the expiry of the credential in `opts.file` at `now`.
pub fn check_credential_at(
    result: &mut CheckResult,
    opts: &CredentialCheckOptions,
    now: DateTime<Utc>,
) -> Result<(), MonitorError> {
    let content = std::fs::read_to_string(&opts.file)
        .map_err(|e| MonitorError::Credential(format!("could not read {}: {}", opts.file, e)))?;
    let claims = parse_user_claims(&content)?;

    let Some(exp) = claims.exp.filter(|e| *e > 0) else {
        if opts.require_expiry {
            result.critical("never expires");
        } else {
            result.ok("no expiry");
        }
        return Ok(());
    };

    let remaining = exp - now.timestamp();
    let warn = opts.validity_warning.map(secs).unwrap_or(-1.0);
    let crit = opts.validity_critical.map(secs).unwrap_or(-1.0);
    result.attach_metric(
        PerfData::new("expiry", remaining as f64)
            .with_unit("s")
            .with_thresholds(warn, crit)
            .with_help("Seconds until the credential expires"),
    );

    if remaining <= 0 {
        result.critical("expired");
        return Ok(());
    }

    let left = Duration::from_secs(remaining as u64);
    let critical = opts.validity_critical.is_some_and(|c| left <= c);
    if result.raise(crate::result::Severity::Critical, critical, format!("expires in {}", human(left))) {
        return Ok(());
    }
    let warning = opts.validity_warning.is_some_and(|w| left <= w);
    if !result.raise(crate::result::Severity::Warning, warning, format!("expires in {}", human(left))) {
        result.ok(format!("expires in {}", human(left)));
    }
    Ok(())
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

fn human(d: Duration) -> String {
    humantime_serde::re::humantime::format_duration(d).to_string()
}

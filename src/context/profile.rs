//! Connection profiles and the options derived from them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::context::{ContextError, DEFAULT_CONTEXT};

/// Server used when a profile does not name one.
pub const DEFAULT_SERVER_URL: &str = "nats://127.0.0.1:4222";

const DEFAULT_PORT: u16 = 4222;
const CLIENT_NAME: &str = "nats-check-exporter";

/// On-disk profile document (JSON).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProfileSettings {
    pub description: String,
    pub url: String,
    pub user: String,
    pub password: String,
    pub creds: String,
    pub nkey: String,
    pub token: String,
    pub cert: String,
    pub key: String,
    pub ca: String,
    /// nsc user reference; kept for round-tripping, not used to connect.
    pub nsc: String,
    pub jetstream_domain: String,
    pub jetstream_api_prefix: String,
    pub inbox_prefix: String,
    pub user_jwt: String,
    pub tls_first: bool,
}

/// A resolved (or deferred) connection profile.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    path: Option<PathBuf>,
    settings: Option<ProfileSettings>,
}

impl Profile {
    /// Parse a profile document from `path`.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self, ContextError> {
        let content = std::fs::read_to_string(path).map_err(|source| ContextError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: ProfileSettings =
            serde_json::from_str(&content).map_err(|source| ContextError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            name: name.into(),
            path: Some(path.to_path_buf()),
            settings: Some(settings),
        })
    }

    /// A named reference with no document behind it yet.
    pub fn deferred(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            settings: None,
        }
    }

    pub fn from_settings(name: impl Into<String>, settings: ProfileSettings) -> Self {
        Self {
            name: name.into(),
            path: None,
            settings: Some(settings),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn description(&self) -> &str {
        self.settings.as_ref().map(|s| s.description.as_str()).unwrap_or("")
    }

    /// Derive the server list and client options.
    ///
    /// A deferred reference only succeeds for the built-in default profile.
    pub fn connection_options(&self) -> Result<(String, ConnectionOptions), ContextError> {
        let settings = match &self.settings {
            Some(settings) => settings.clone(),
            None if self.name == DEFAULT_CONTEXT => ProfileSettings::default(),
            None => return Err(ContextError::UnknownContext(self.name.clone())),
        };

        let url = if settings.url.trim().is_empty() {
            DEFAULT_SERVER_URL.to_string()
        } else {
            settings.url.clone()
        };
        let servers = parse_servers(&url)?;
        let server_address = servers.iter().map(|u| u.as_str().trim_end_matches('/')).collect::<Vec<_>>().join(",");

        let auth = if !settings.creds.is_empty() {
            Auth::Credentials(existing_file("creds", &settings.creds)?)
        } else if !settings.nkey.is_empty() {
            Auth::NKey(existing_file("nkey", &settings.nkey)?)
        } else if !settings.user_jwt.is_empty() {
            Auth::UserJwt(settings.user_jwt.clone())
        } else if !settings.token.is_empty() {
            Auth::Token(settings.token.clone())
        } else if !settings.user.is_empty() {
            Auth::UserPassword {
                user: settings.user.clone(),
                password: settings.password.clone(),
            }
        } else {
            Auth::None
        };

        let tls = match (settings.cert.is_empty(), settings.key.is_empty()) {
            (true, true) if settings.ca.is_empty() => None,
            (true, true) => Some(TlsFiles {
                cert: None,
                key: None,
                ca: Some(existing_file("ca", &settings.ca)?),
            }),
            (false, false) => Some(TlsFiles {
                cert: Some(existing_file("cert", &settings.cert)?),
                key: Some(existing_file("key", &settings.key)?),
                ca: if settings.ca.is_empty() {
                    None
                } else {
                    Some(existing_file("ca", &settings.ca)?)
                },
            }),
            _ => return Err(ContextError::IncompleteTls),
        };

        let jetstream_prefix = if !settings.jetstream_api_prefix.is_empty() {
            settings.jetstream_api_prefix.trim_end_matches('.').to_string()
        } else if !settings.jetstream_domain.is_empty() {
            format!("$JS.{}.API", settings.jetstream_domain)
        } else {
            "$JS.API".to_string()
        };

        let inbox_prefix = if settings.inbox_prefix.is_empty() {
            "_INBOX".to_string()
        } else {
            settings.inbox_prefix.trim_end_matches('.').to_string()
        };

        let options = ConnectionOptions {
            name: CLIENT_NAME.to_string(),
            auth,
            tls,
            tls_first: settings.tls_first,
            jetstream_prefix,
            inbox_prefix,
            connect_timeout: Duration::from_secs(2),
        };

        Ok((server_address, options))
    }
}

/// Client authentication material.
#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    None,
    UserPassword { user: String, password: String },
    Token(String),
    UserJwt(String),
    Credentials(PathBuf),
    NKey(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlsFiles {
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub ca: Option<PathBuf>,
}

/// Everything a check needs to reach the cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    pub name: String,
    pub auth: Auth,
    pub tls: Option<TlsFiles>,
    pub tls_first: bool,
    /// Subject prefix for JetStream API requests (`$JS.API`).
    pub jetstream_prefix: String,
    pub inbox_prefix: String,
    pub connect_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            name: CLIENT_NAME.to_string(),
            auth: Auth::None,
            tls: None,
            tls_first: false,
            jetstream_prefix: "$JS.API".to_string(),
            inbox_prefix: "_INBOX".to_string(),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl ConnectionOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Parse a comma separated server list into URLs with explicit ports.
pub fn parse_servers(list: &str) -> Result<Vec<Url>, ContextError> {
    let mut servers = Vec::new();
    for raw in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("nats://{}", raw)
        };

        let mut url = Url::parse(&candidate).map_err(|e| ContextError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !matches!(url.scheme(), "nats" | "tls" | "ws" | "wss") {
            return Err(ContextError::InvalidUrl(format!("{}: unsupported scheme {}", raw, url.scheme())));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ContextError::InvalidUrl(format!("{}: missing host", raw)));
        }
        if url.port().is_none() && matches!(url.scheme(), "nats" | "tls") {
            url.set_port(Some(DEFAULT_PORT))
                .map_err(|_| ContextError::InvalidUrl(format!("{}: cannot set port", raw)))?;
        }
        servers.push(url);
    }

    if servers.is_empty() {
        return Err(ContextError::InvalidUrl("no servers given".to_string()));
    }
    Ok(servers)
}

fn existing_file(field: &'static str, raw: &str) -> Result<PathBuf, ContextError> {
    let path = expand_home(raw);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ContextError::MissingFile { field, path })
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

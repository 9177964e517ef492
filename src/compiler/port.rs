//! TCP port token parsing.
//!
//! # Grammar
//! ```text
//! token := port | port "/" mode | mode ":" port
//! mode  := "ssl" | "tls" | "tcp" | "plain"     (case-insensitive)
//! port  := 1..=65535
//! ```
//! `ssl`/`tls` ask for TLS, `tcp`/`plain` refuse it, and a bare port
//! inherits: TLS whenever any certificate is configured.

use crate::compiler::tls::TlsMaterial;
use crate::config::Settings;

/// How a token asks for TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Inherit,
    Tls,
    Plain,
}

/// A parsed TCP port token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpPortSpec {
    /// The literal token as declared, used to look up extra bind settings.
    pub token: String,
    pub port: u16,
    pub mode: TlsMode,
}

/// A port token that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortParseError {
    #[error("empty port token")]
    Empty,

    #[error("invalid port number in `{0}`")]
    InvalidPort(String),

    #[error("unknown TLS mode `{mode}` in `{token}`")]
    UnknownMode { token: String, mode: String },
}

impl TcpPortSpec {
    pub fn parse(token: &str) -> Result<Self, PortParseError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PortParseError::Empty);
        }

        let (port, mode) = if let Some((port, mode)) = token.split_once('/') {
            (port, Some(mode))
        } else if let Some((mode, port)) = token.split_once(':') {
            (port, Some(mode))
        } else {
            (token, None)
        };

        let mode = match mode.map(|m| m.trim().to_ascii_lowercase()) {
            None => TlsMode::Inherit,
            Some(m) if m == "ssl" || m == "tls" => TlsMode::Tls,
            Some(m) if m == "tcp" || m == "plain" => TlsMode::Plain,
            Some(m) => {
                return Err(PortParseError::UnknownMode {
                    token: token.to_string(),
                    mode: m,
                })
            }
        };

        let port = match port.trim().parse::<u16>() {
            Ok(p) if p > 0 => p,
            _ => return Err(PortParseError::InvalidPort(token.to_string())),
        };

        Ok(Self {
            token: token.to_string(),
            port,
            mode,
        })
    }

    /// TLS is on when requested or inherited and a certificate exists.
    pub fn tls_enabled(&self, tls: &TlsMaterial) -> bool {
        match self.mode {
            TlsMode::Inherit | TlsMode::Tls => tls.enabled(),
            TlsMode::Plain => false,
        }
    }

    /// Listener address clause: port, TLS suffix, extra bind settings.
    ///
    /// Extra settings are keyed by the literal token, falling back to the
    /// bare port number.
    pub fn bind_string(&self, tls: &TlsMaterial, settings: &Settings) -> String {
        let mut bind = self.port.to_string();
        if self.tls_enabled(tls) {
            if let Some(ssl) = tls.ssl_bind_string() {
                bind.push(' ');
                bind.push_str(ssl);
            }
        }
        let extra = settings
            .extra_bind(&self.token)
            .or_else(|| settings.extra_bind(&self.port.to_string()));
        if let Some(extra) = extra.filter(|e| !e.trim().is_empty()) {
            bind.push(' ');
            bind.push_str(extra.trim());
        }
        bind
    }
}

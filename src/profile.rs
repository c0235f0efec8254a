//! Connection profiles.
//!
//! A [`Profile`] holds everything the transport collaborator needs to open a
//! session: target host and port, protocol version with its credentials
//! ([`Auth`]), and the request timeout and retry count.
//!
//! ```rust
//! use snmp_poller::{Auth, AuthProtocol, PrivProtocol, Profile};
//!
//! // v2c with the default "public" community
//! let p = Profile::new("192.0.2.1");
//! assert_eq!(p.endpoint(), "192.0.2.1:161");
//!
//! // v3 authPriv
//! let p = Profile::new("router1").with_auth(
//!     Auth::usm("admin")
//!         .auth(AuthProtocol::Sha256, "authpassword")
//!         .privacy(PrivProtocol::Aes128, "privpassword"),
//! );
//! assert!(p.validate().is_ok());
//! ```
//!
//! Profiles deserialize with defaults for every omitted field, so a minimal
//! configuration only names the host:
//!
//! ```rust
//! use snmp_poller::{Profile, Version};
//!
//! let p: Profile = serde_json::from_str(r#"{"host": "switch1", "timeout": 2}"#).unwrap();
//! assert_eq!(p.port, 161);
//! assert_eq!(p.version(), Version::V2c);
//! ```

use crate::error::{Error, Result};
use crate::util::secs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Well-known management port.
pub const DEFAULT_PORT: u16 = 161;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default retry count.
pub const DEFAULT_RETRIES: u32 = 3;

/// Error returned when parsing a version, security level or protocol name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProtocolError {
    input: String,
    kind: ProtocolKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProtocolKind {
    Version,
    Level,
    Auth,
    Priv,
}

impl fmt::Display for ParseProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ProtocolKind::Version => write!(
                f,
                "invalid snmp version '{}'; expected one of: 1, 2, 2c, 3",
                self.input
            ),
            ProtocolKind::Level => write!(
                f,
                "invalid security level '{}'; expected one of: NoAuthNoPriv, AuthNoPriv, AuthPriv",
                self.input
            ),
            ProtocolKind::Auth => write!(
                f,
                "unknown authentication protocol '{}'; expected one of: MD5, SHA, SHA-224, SHA-256, SHA-384, SHA-512",
                self.input
            ),
            ProtocolKind::Priv => write!(
                f,
                "unknown privacy protocol '{}'; expected one of: DES, AES, AES-128, AES-192, AES-256",
                self.input
            ),
        }
    }
}

impl std::error::Error for ParseProtocolError {}

impl From<ParseProtocolError> for Box<Error> {
    fn from(e: ParseProtocolError) -> Self {
        Error::config(e)
    }
}

/// Implements string-based serde for a `FromStr + Display` enum.
macro_rules! string_serde {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = ParseProtocolError;

            fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(v: $ty) -> String {
                v.to_string()
            }
        }
    };
}

/// Protocol version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Version {
    V1,
    #[default]
    V2c,
    V3,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "1"),
            Self::V2c => write!(f, "2c"),
            Self::V3 => write!(f, "3"),
        }
    }
}

impl FromStr for Version {
    type Err = ParseProtocolError;

    /// An empty string selects v2c.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(Self::V1),
            "" | "2" | "2c" | "v2c" => Ok(Self::V2c),
            "3" | "v3" => Ok(Self::V3),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Version,
            }),
        }
    }
}

string_serde!(Version);

/// SNMPv3 security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAuthNoPriv => write!(f, "NoAuthNoPriv"),
            Self::AuthNoPriv => write!(f, "AuthNoPriv"),
            Self::AuthPriv => write!(f, "AuthPriv"),
        }
    }
}

impl FromStr for SecurityLevel {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "noauthnopriv" => Ok(Self::NoAuthNoPriv),
            "authnopriv" => Ok(Self::AuthNoPriv),
            "authpriv" => Ok(Self::AuthPriv),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Level,
            }),
        }
    }
}

string_serde!(SecurityLevel);

/// Authentication protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthProtocol {
    /// HMAC-MD5-96 (RFC 3414)
    Md5,
    /// HMAC-SHA-96 (RFC 3414)
    Sha1,
    /// HMAC-SHA-224 (RFC 7860)
    Sha224,
    /// HMAC-SHA-256 (RFC 7860)
    Sha256,
    /// HMAC-SHA-384 (RFC 7860)
    Sha384,
    /// HMAC-SHA-512 (RFC 7860)
    Sha512,
}

impl fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA"),
            Self::Sha224 => write!(f, "SHA-224"),
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Sha384 => write!(f, "SHA-384"),
            Self::Sha512 => write!(f, "SHA-512"),
        }
    }
}

impl FromStr for AuthProtocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA" | "SHA1" | "SHA-1" => Ok(Self::Sha1),
            "SHA224" | "SHA-224" => Ok(Self::Sha224),
            "SHA256" | "SHA-256" => Ok(Self::Sha256),
            "SHA384" | "SHA-384" => Ok(Self::Sha384),
            "SHA512" | "SHA-512" => Ok(Self::Sha512),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Auth,
            }),
        }
    }
}

string_serde!(AuthProtocol);

impl AuthProtocol {
    /// Digest output length in bytes, which bounds the privacy key material
    /// the protocol can produce.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Whether this protocol yields enough key material for `priv_protocol`.
    ///
    /// ```rust
    /// use snmp_poller::{AuthProtocol, PrivProtocol};
    ///
    /// assert!(AuthProtocol::Sha256.is_compatible_with(PrivProtocol::Aes256));
    /// assert!(!AuthProtocol::Sha1.is_compatible_with(PrivProtocol::Aes256));
    /// ```
    pub fn is_compatible_with(self, priv_protocol: PrivProtocol) -> bool {
        self.digest_len() >= priv_protocol.key_len()
    }
}

/// Privacy protocol identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PrivProtocol {
    /// DES-CBC (RFC 3414)
    Des,
    /// AES-128-CFB (RFC 3826)
    Aes128,
    /// AES-192-CFB
    Aes192,
    /// AES-256-CFB
    Aes256,
}

impl fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Des => write!(f, "DES"),
            Self::Aes128 => write!(f, "AES"),
            Self::Aes192 => write!(f, "AES-192"),
            Self::Aes256 => write!(f, "AES-256"),
        }
    }
}

impl FromStr for PrivProtocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DES" => Ok(Self::Des),
            "AES" | "AES128" | "AES-128" => Ok(Self::Aes128),
            "AES192" | "AES-192" => Ok(Self::Aes192),
            "AES256" | "AES-256" => Ok(Self::Aes256),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Priv,
            }),
        }
    }
}

string_serde!(PrivProtocol);

impl PrivProtocol {
    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Des => 16, // 8 key + 8 pre-IV
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

/// Version for community-based authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunityVersion {
    V1,
    #[default]
    V2c,
}

/// Credentials for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Auth {
    /// Community string authentication (SNMPv1 or v2c).
    Community {
        #[serde(default)]
        version: CommunityVersion,
        community: String,
    },
    /// User-based Security Model (SNMPv3).
    Usm(UsmAuth),
}

impl Default for Auth {
    fn default() -> Self {
        Auth::v2c("public")
    }
}

impl Auth {
    /// SNMPv1 community authentication.
    pub fn v1(community: impl Into<String>) -> Self {
        Auth::Community {
            version: CommunityVersion::V1,
            community: community.into(),
        }
    }

    /// SNMPv2c community authentication.
    pub fn v2c(community: impl Into<String>) -> Self {
        Auth::Community {
            version: CommunityVersion::V2c,
            community: community.into(),
        }
    }

    /// Start building SNMPv3 USM credentials.
    pub fn usm(username: impl Into<String>) -> UsmBuilder {
        UsmBuilder::new(username)
    }

    pub fn version(&self) -> Version {
        match self {
            Auth::Community {
                version: CommunityVersion::V1,
                ..
            } => Version::V1,
            Auth::Community { .. } => Version::V2c,
            Auth::Usm(_) => Version::V3,
        }
    }
}

/// SNMPv3 USM parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsmAuth {
    pub username: String,
    /// Explicit security level. When absent the level follows from which
    /// protocols are configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SecurityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_protocol: Option<AuthProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priv_protocol: Option<PrivProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priv_password: Option<String>,
    /// Context name for VACM context selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_name: Option<String>,
}

impl UsmAuth {
    /// Effective security level.
    pub fn security_level(&self) -> SecurityLevel {
        self.level.unwrap_or(match (self.auth_protocol, self.priv_protocol) {
            (Some(_), Some(_)) => SecurityLevel::AuthPriv,
            (Some(_), None) => SecurityLevel::AuthNoPriv,
            _ => SecurityLevel::NoAuthNoPriv,
        })
    }
}

/// Builder for SNMPv3 USM credentials.
pub struct UsmBuilder {
    username: String,
    level: Option<SecurityLevel>,
    auth: Option<(AuthProtocol, String)>,
    privacy: Option<(PrivProtocol, String)>,
    context_name: Option<String>,
}

impl UsmBuilder {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            level: None,
            auth: None,
            privacy: None,
            context_name: None,
        }
    }

    /// Add authentication (authNoPriv or authPriv).
    pub fn auth(mut self, protocol: AuthProtocol, password: impl Into<String>) -> Self {
        self.auth = Some((protocol, password.into()));
        self
    }

    /// Add privacy (authPriv). Requires authentication; checked by
    /// [`Profile::validate`].
    pub fn privacy(mut self, protocol: PrivProtocol, password: impl Into<String>) -> Self {
        self.privacy = Some((protocol, password.into()));
        self
    }

    /// Pin the security level instead of inferring it.
    pub fn level(mut self, level: SecurityLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn context_name(mut self, name: impl Into<String>) -> Self {
        self.context_name = Some(name.into());
        self
    }
}

impl From<UsmBuilder> for Auth {
    fn from(b: UsmBuilder) -> Auth {
        Auth::Usm(UsmAuth {
            username: b.username,
            level: b.level,
            auth_protocol: b.auth.as_ref().map(|(p, _)| *p),
            auth_password: b.auth.map(|(_, pw)| pw),
            priv_protocol: b.privacy.as_ref().map(|(p, _)| *p),
            priv_password: b.privacy.map(|(_, pw)| pw),
            context_name: b.context_name,
        })
    }
}

/// Connection parameters for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub host: String,
    pub port: u16,
    pub auth: Auth,
    /// Per-request timeout.
    #[serde(with = "secs")]
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            auth: Auth::default(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl Profile {
    /// Profile for `host` with default port, credentials, timeout and retries.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_auth(mut self, auth: impl Into<Auth>) -> Self {
        self.auth = auth.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn version(&self) -> Version {
        self.auth.version()
    }

    /// `host:port`, bracketing bare IPv6 literals.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Check the profile for setup errors.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("no host specified"));
        }
        let Auth::Usm(usm) = &self.auth else {
            return Ok(());
        };
        let host = &self.host;
        if usm.username.is_empty() {
            return Err(Error::config(format_args!(
                "username not found for snmpv3 host {}",
                host
            )));
        }

        let level = usm.security_level();
        let needs_auth = matches!(level, SecurityLevel::AuthNoPriv | SecurityLevel::AuthPriv);
        let needs_priv = level == SecurityLevel::AuthPriv;

        if needs_priv && usm.priv_protocol.is_none() {
            return Err(Error::config(format_args!(
                "security level {} requires a privacy protocol for host {}",
                level, host
            )));
        }
        if usm.priv_protocol.is_some() && usm.auth_protocol.is_none() {
            return Err(Error::config("privacy requires authentication"));
        }
        if needs_auth {
            if usm.auth_protocol.is_none() {
                return Err(Error::config(format_args!(
                    "security level {} requires an auth protocol for host {}",
                    level, host
                )));
            }
            if usm.auth_password.as_deref().is_none_or(str::is_empty) {
                return Err(Error::config(format_args!(
                    "no SNMPv3 password for host {}",
                    host
                )));
            }
        }
        if needs_priv {
            if usm.priv_password.as_deref().is_none_or(str::is_empty) {
                return Err(Error::config("missing snmp v3 privacy password"));
            }
            if let (Some(a), Some(p)) = (usm.auth_protocol, usm.priv_protocol)
                && !a.is_compatible_with(p)
            {
                return Err(Error::config(format_args!(
                    "{} does not provide enough key material for {}",
                    a, p
                )));
            }
        }
        Ok(())
    }
}

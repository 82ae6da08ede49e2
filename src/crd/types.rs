//! Supporting types shared by the Domain and ClusterDomainRoute CRDs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Role a domain plays in the federation
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DomainRole {
    /// Participates through a cross-organization link
    #[serde(rename = "partner")]
    Partner,
    /// Locally administered domain
    #[default]
    #[serde(rename = "")]
    Other,
}

impl DomainRole {
    /// Returns true for partner domains
    pub fn is_partner(&self) -> bool {
        matches!(self, Self::Partner)
    }
}

impl std::fmt::Display for DomainRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Partner => write!(f, "partner"),
            Self::Other => write!(f, ""),
        }
    }
}

/// Interconnection protocol between domains
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum InterConnProtocol {
    /// Native Kuscia protocol
    #[default]
    Kuscia,
    /// BFIA interconnection protocol
    Bfia,
}

impl InterConnProtocol {
    /// Returns true for the native Kuscia protocol
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Kuscia)
    }
}

impl std::str::FromStr for InterConnProtocol {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kuscia" => Ok(Self::Kuscia),
            "bfia" => Ok(Self::Bfia),
            _ => Err(crate::Error::validation(
                crate::error::UNKNOWN_DOMAIN,
                format!("invalid interconnection protocol: {s}, expected one of: kuscia, bfia"),
            )),
        }
    }
}

impl std::fmt::Display for InterConnProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kuscia => write!(f, "kuscia"),
            Self::Bfia => write!(f, "bfia"),
        }
    }
}

/// How a trust route authenticates outbound requests
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AuthenticationType {
    /// Bearer token in a request header
    #[default]
    Token,
    /// Mutual TLS
    #[serde(rename = "MTLS")]
    Mtls,
    /// No authentication
    #[serde(rename = "None")]
    Disabled,
}

/// How route tokens are generated
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum TokenGenMethod {
    /// RSA-encrypted token exchange
    #[default]
    #[serde(rename = "RSA-GEN")]
    RsaGen,
    /// Random token
    #[serde(rename = "RAND-GEN")]
    RandGen,
    /// UID-bound RSA token
    #[serde(rename = "UID-RSA-GEN")]
    UidRsaGen,
}

/// Trust-center configuration declared by a domain
///
/// Its presence means the domain needs a trust route to the control plane.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthCenter {
    /// Authentication type for the trust route
    pub authentication_type: AuthenticationType,

    /// Token generation method for the trust route
    #[serde(default)]
    pub token_gen_method: TokenGenMethod,
}

/// Credential rotation settings carried on a trust route
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    /// Token generation method
    pub token_gen_method: TokenGenMethod,

    /// Rotation period in seconds
    pub rolling_update_period: i64,
}

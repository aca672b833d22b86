//! Identity claims required to open a session.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{flow_error, Error, DomainErrorKind, FlowErrorKind};
use crate::gateway::VerifiedIdToken;
use crate::session::Profile;

/// The claims this service relies on. Anything else in the token is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub sub: String,
    pub name: String,
    pub nric: String,
}

// Wire shape. Profile claims may be absent; some providers send `nama` in place of `name`.
#[derive(Deserialize)]
struct RawClaims {
    sub: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    nama: String,
    #[serde(default)]
    nric: String,
}

impl IdentityClaims {
    pub fn profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            national_id: self.nric.clone(),
        }
    }
}

impl From<RawClaims> for IdentityClaims {
    fn from(raw: RawClaims) -> Self {
        let name = if raw.name.is_empty() { raw.nama } else { raw.name };
        Self {
            sub: raw.sub,
            name,
            nric: raw.nric,
        }
    }
}

/// Decode [`IdentityClaims`] from a token that has already passed verification.
///
/// `sub` must be present and non-blank. Missing profile claims decode as empty strings;
/// a claim of the wrong JSON type is rejected.
pub fn extract(verified: &VerifiedIdToken) -> Result<IdentityClaims, Error> {
    let raw: RawClaims = serde_json::from_value(Value::Object(verified.claims.clone()))
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Flow(FlowErrorKind::Claims),
        })?;

    if raw.sub.trim().is_empty() {
        return Err(flow_error(FlowErrorKind::Claims, "empty sub claim"));
    }

    Ok(raw.into())
}

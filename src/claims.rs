use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::Error;
use crate::types::{AuthUser, SubjectId};

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    realm_access: Option<RealmAccess>,
}

#[derive(Debug, Deserialize)]
struct RealmAccess {
    #[serde(default)]
    roles: Option<Vec<String>>,
}

/// Decodes the user from a JWT's payload segment.
///
/// The signature is NOT checked. The token came straight from the identity
/// provider's token endpoint; the result is for display only.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the token is not three dot-separated segments,
/// the payload is not base64url, or it is not a JSON claims object.
pub fn decode_user(token: &str) -> Result<AuthUser, Error> {
    let payload = payload_segment(token)?;
    let claims: IdTokenClaims =
        serde_json::from_slice(&payload).map_err(|e| Error::Decode(e.to_string()))?;

    let display_name = claims
        .name
        .filter(|n| !n.is_empty())
        .or(claims.preferred_username)
        .unwrap_or_default();

    Ok(AuthUser {
        subject_id: SubjectId(claims.sub),
        email: claims.email.unwrap_or_default(),
        display_name,
        roles: claims
            .realm_access
            .and_then(|r| r.roles)
            .map(|roles| roles.into_iter().collect())
            .unwrap_or_default(),
    })
}

fn payload_segment(token: &str) -> Result<Vec<u8>, Error> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::Decode(format!(
            "expected 3 segments, got {}",
            parts.len()
        )));
    }

    // Some issuers pad; the no-pad engine rejects '='.
    URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| Error::Decode(format!("payload: {e}")))
}

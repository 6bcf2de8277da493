use serde::Deserialize;
use url::Url;

use crate::context::AuthContext;
use crate::error::Error;

/// Query parameters the identity provider appends to the callback route.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse the parameters from the full redirect URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        params
    }
}

/// Terminal, user-visible outcome of a failed callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The identity provider reported an error instead of a code.
    #[error("Authentication failed: {}", denied_message(.error, .description))]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("Missing authorisation code or state parameter.")]
    MissingParams,

    #[error(transparent)]
    Auth(#[from] Error),
}

fn denied_message<'a>(error: &'a str, description: &'a Option<String>) -> &'a str {
    description.as_deref().unwrap_or(error)
}

/// Finish sign-in from the callback route's parameters.
///
/// A provider-reported `error` short-circuits before any exchange; a missing
/// or empty `code`/`state` is terminal.
///
/// # Errors
///
/// See [`CallbackError`]. None of them are retried: the user has to start a
/// new login.
pub async fn complete_sign_in(
    ctx: &AuthContext,
    params: CallbackParams,
) -> Result<(), CallbackError> {
    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Identity provider returned an error"
        );
        return Err(CallbackError::Denied {
            error,
            description: params.error_description,
        });
    }

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(code), Some(state)) = (non_empty(params.code), non_empty(params.state)) else {
        return Err(CallbackError::MissingParams);
    };

    ctx.handle_callback(&code, &state).await?;
    Ok(())
}

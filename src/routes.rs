use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;

use crate::callback::{CallbackError, CallbackParams, complete_sign_in};
use crate::config::CALLBACK_PATH;
use crate::context::AuthContext;
use crate::error::Error;

/// Router serving the OAuth callback route.
///
/// On success the browser is sent to `/`; failures render the error message.
pub fn callback_routes(ctx: AuthContext) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback))
        .with_state(ctx)
}

async fn callback(
    State(ctx): State<AuthContext>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, CallbackError> {
    complete_sign_in(&ctx, params).await?;
    Ok(Redirect::to("/"))
}

impl CallbackError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Denied { .. } | Self::MissingParams => StatusCode::BAD_REQUEST,
            Self::Auth(Error::InvalidState | Error::MissingVerifier) => StatusCode::UNAUTHORIZED,
            Self::Auth(Error::TokenExchangeFailed { .. }) => StatusCode::BAD_GATEWAY,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Sign-in callback failed");
        }
        (status, self.to_string()).into_response()
    }
}

#![doc = include_str!("../README.md")]

pub mod api_client;
pub mod callback;
pub mod claims;
pub mod config;
pub mod context;
pub mod error;
pub mod navigator;
pub mod oauth;
pub mod pkce;
pub mod provider;
#[cfg(feature = "axum")]
pub mod routes;
pub mod session;
pub mod token_store;
pub mod traits;
pub mod types;

// Re-exports for convenient access
pub use api_client::ApiClient;
pub use callback::{CallbackError, CallbackParams, complete_sign_in};
pub use config::{AuthConfig, CALLBACK_PATH, Settings};
pub use context::{AuthContext, AuthSnapshot, use_auth};
pub use error::Error;
pub use navigator::RecordingNavigator;
pub use oauth::{AuthClient, AuthorizationRequest, TokenResponse};
pub use pkce::{PkceTransaction, generate_code_challenge, generate_code_verifier, generate_state};
pub use provider::KeycloakProvider;
#[cfg(feature = "axum")]
pub use routes::callback_routes;
pub use session::MemorySessionStorage;
pub use token_store::{Clock, ManualClock, SystemClock, TokenSet, TokenStore};
pub use traits::{AuthProvider, Navigator, SessionStorage};
pub use types::{AuthUser, SubjectId};

use roam_common::identity::{IdentityError, IdentityProvider};

use actix_web::dev::Payload;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::bearer_credential;

/// A caller whose access token the identity provider accepted.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = HttpErrorResponse;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let access_token = bearer_credential(req).map(|t| Zeroizing::new(String::from(t)));
        let identity_provider = req
            .app_data::<Data<IdentityProvider>>()
            .map(|p| Arc::clone(p.get_ref()));

        Box::pin(async move {
            let Some(access_token) = access_token else {
                return Err(HttpErrorResponse::TokenMissing(String::from(
                    "An access token is required",
                )));
            };

            let Some(identity_provider) = identity_provider else {
                log::error!("Identity provider missing from app data");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to authenticate request",
                )));
            };

            match identity_provider.authenticate(&access_token).await {
                Ok(user_id) => Ok(AuthenticatedUser { user_id }),
                Err(IdentityError::CredentialRejected | IdentityError::NotFound) => {
                    Err(HttpErrorResponse::IncorrectCredential(String::from(
                        "Access token is invalid or expired",
                    )))
                }
                Err(e) => {
                    log::error!("{e}");
                    Err(HttpErrorResponse::InternalError(String::from(
                        "Failed to authenticate request",
                    )))
                }
            }
        })
    }
}

use roam_common::html::templates::{
    RestoreAccountAlreadyRestoredPage, RestoreAccountDeletionInProgressPage,
    RestoreAccountInternalErrorPage, RestoreAccountInvalidLinkPage,
    RestoreAccountMissingTokenPage, RestoreAccountSuccessPage,
};
use roam_common::lifecycle::{
    DeletionInitiator, LifecycleError, OAuthUnlinkGuard, RestorationHandler,
};
use roam_common::request_io::{
    unix_seconds, InputOAuthProvider, InputRestorationToken, OutputDeletionScheduled,
    OutputDeletionStatus, OutputMessage, OutputUnlinkedProvider,
};

use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::AuthenticatedUser;

pub async fn init_delete(
    initiator: web::Data<DeletionInitiator>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    // The notification task keeps running after its handle is dropped
    let initiated = initiator.initiate(user.user_id).await?;

    Ok(HttpResponse::Accepted().json(OutputDeletionScheduled {
        message: initiated.message,
        scheduled_for_deletion_at: unix_seconds(initiated.scheduled_for_deletion_at),
    }))
}

pub async fn deletion_status(
    initiator: web::Data<DeletionInitiator>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    let status = initiator.status(user.user_id).await?;

    Ok(HttpResponse::Ok().json(OutputDeletionStatus {
        is_listed_for_deletion: status.is_listed_for_deletion,
        scheduled_for_deletion_at: status.scheduled_for_deletion_at.map(unix_seconds),
    }))
}

pub async fn restore(
    restoration_handler: web::Data<RestorationHandler>,
    restoration_token: web::Json<InputRestorationToken>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let restored = restoration_handler
        .restore(&restoration_token.token)
        .await?;

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: restored.message,
    }))
}

pub async fn restore_from_link(
    restoration_handler: web::Data<RestorationHandler>,
    restoration_token: web::Query<InputRestorationToken>,
) -> HttpResponse {
    let result = restoration_handler
        .restore(&restoration_token.token)
        .await;

    let (mut resp, page) = match result {
        Ok(_) => (HttpResponse::Ok(), RestoreAccountSuccessPage::generate()),
        Err(LifecycleError::MissingToken) => (
            HttpResponse::BadRequest(),
            RestoreAccountMissingTokenPage::generate(),
        ),
        Err(LifecycleError::InvalidToken) => (
            HttpResponse::NotFound(),
            RestoreAccountInvalidLinkPage::generate(),
        ),
        Err(LifecycleError::AlreadyRestored) => (
            HttpResponse::Ok(),
            RestoreAccountAlreadyRestoredPage::generate(),
        ),
        Err(LifecycleError::DeletionInProgress) => (
            HttpResponse::Conflict(),
            RestoreAccountDeletionInProgressPage::generate(),
        ),
        Err(e) => {
            log::error!("{e}");
            (
                HttpResponse::InternalServerError(),
                RestoreAccountInternalErrorPage::generate(),
            )
        }
    };

    resp.content_type(ContentType::html()).body(page)
}

pub async fn unlink_provider(
    unlink_guard: web::Data<OAuthUnlinkGuard>,
    user: AuthenticatedUser,
    provider: web::Json<InputOAuthProvider>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let unlinked = unlink_guard.unlink(user.user_id, &provider.provider).await?;

    Ok(HttpResponse::Ok().json(OutputUnlinkedProvider {
        message: unlinked.message,
        provider: unlinked.provider,
    }))
}

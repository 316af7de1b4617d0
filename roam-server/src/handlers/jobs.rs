use roam_common::lifecycle::Sweeper;

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::bearer::BearerCredential;

/// Runs one deletion sweep. The caller must present the trigger secret as a bearer credential.
pub async fn sweep_deletions(
    sweeper: web::Data<Sweeper>,
    secret: BearerCredential,
) -> Result<HttpResponse, HttpErrorResponse> {
    let summary = sweeper.sweep(secret.as_deref()).await?;

    if !summary.failed.is_empty() {
        log::warn!(
            "Deletion sweep finished with {} failure(s) out of {} request(s)",
            summary.failed.len(),
            summary.processed,
        );
    }

    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use roam_common::lifecycle::{DeletionInitiator, SweepSummary};
    use roam_common::request_io::{ErrorType, ServerErrorResponse};
    use roam_common::testing::{
        deletion_settings, sweep_settings, ManualClock, MemoryDeletionStore,
        MockIdentityGateway, RecordingSender, TEST_SWEEP_SECRET,
    };
    use std::sync::Arc;
    use std::time::Duration;

    #[actix_web::test]
    async fn sweep_requires_the_trigger_secret() {
        let store = Arc::new(MemoryDeletionStore::new());
        let identity = Arc::new(MockIdentityGateway::new());
        let clock = Arc::new(ManualClock::new());

        let app = test::init_service(
            App::new()
                .app_data(Data::new(Sweeper::new(
                    store.clone(),
                    identity.clone(),
                    clock,
                    sweep_settings(),
                )))
                .route("/sweep", web::post().to(sweep_deletions)),
        )
        .await;

        let req = TestRequest::post().uri("/sweep").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/sweep")
            .insert_header(("Authorization", "Bearer not-the-secret"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body = test::read_body(resp).await;
        let body: ServerErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.err_type, ErrorType::IncorrectCredential);

        assert_eq!(store.accesses(), 0);
        assert_eq!(identity.delete_calls(), 0);
    }

    #[actix_web::test]
    async fn sweep_deletes_overdue_users_and_reports_summary() {
        let store = Arc::new(MemoryDeletionStore::new());
        let identity = Arc::new(MockIdentityGateway::new());
        let clock = Arc::new(ManualClock::new());

        let user_id = identity.add_password_user("overdue@roam.test");
        store.add_profile(user_id);

        let initiator = DeletionInitiator::new(
            store.clone(),
            identity.clone(),
            Arc::new(RecordingSender::new()),
            clock.clone(),
            deletion_settings(),
        );
        initiator.initiate(user_id).await.unwrap();

        clock.advance(Duration::from_secs(31 * 24 * 60 * 60));

        let app = test::init_service(
            App::new()
                .app_data(Data::new(Sweeper::new(
                    store.clone(),
                    identity.clone(),
                    clock,
                    sweep_settings(),
                )))
                .configure(crate::services::api::configure),
        )
        .await;

        let req = TestRequest::post()
            .uri("/api/jobs/sweep-deletions")
            .insert_header(("Authorization", format!("Bearer {TEST_SWEEP_SECRET}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let summary: SweepSummary = test::read_body_json(resp).await;
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(summary.failed.is_empty());

        assert!(!identity.has_user(user_id));
        assert!(store.requests_for_user(user_id).is_empty());
    }
}

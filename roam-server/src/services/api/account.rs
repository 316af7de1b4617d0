use actix_web::web::*;

use crate::handlers::account;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/account")
            .route("", delete().to(account::init_delete))
            .route("/deletion", get().to(account::deletion_status))
            .route("/restore", post().to(account::restore))
            .route("/identities", delete().to(account::unlink_provider)),
    );
}

use actix_web::web::*;

use crate::handlers::jobs;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/jobs").route("/sweep-deletions", post().to(jobs::sweep_deletions)));
}

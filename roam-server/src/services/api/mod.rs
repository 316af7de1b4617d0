use actix_web::web::*;

mod account;
mod jobs;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(account::configure)
            .configure(jobs::configure),
    );
}

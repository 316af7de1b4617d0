use roam_common::db::{self, create_db_async_pool};
use roam_common::email::senders::{MockSender, SmtpSender};
use roam_common::email::EmailSender;
use roam_common::identity::{HttpIdentityGateway, IdentityProvider};
use roam_common::lifecycle::{
    DeletionInitiator, DeletionStore, OAuthUnlinkGuard, RestorationHandler, SharedClock, Sweeper,
    SystemClock,
};

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use std::sync::Arc;

mod env;
mod handlers;
mod middleware;
mod services;

use handlers::health::HealthEndpointKey;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("127.0.0.1:{}", &port);

    let _logger = Logger::with(
        LogSpecification::parse(&env::CONF.log_level).unwrap_or_else(|_| LogSpecification::info()),
    )
    .log_to_file(FileSpec::default().directory("./logs"))
    .rotate(
        Criterion::Age(Age::Day),
        Naming::Timestamps,
        Cleanup::KeepLogAndCompressedFiles(60, 365),
    )
    .cleanup_in_background_thread(true)
    .duplicate_to_stdout(Duplicate::All)
    .write_mode(WriteMode::Async)
    .format(|writer, now, record| {
        write!(
            writer,
            "{:5} | {} | {}:{} | {}",
            record.level(),
            now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            record.module_path().unwrap_or("<unknown>"),
            record.line().unwrap_or(0),
            record.args()
        )
    })
    .use_utc()
    .start()
    .expect("Failed to start logger");

    let actix_workers = env::CONF.actix_worker_count;

    log::info!("Connecting to database...");

    // To prevent resource starvation, max connections must be at least as large as the number of
    // actix workers
    let db_max_connections = env::CONF.db_max_connections.max(actix_workers as u32);

    let db_async_pool = match create_db_async_pool(&env::CONF.database_uri(), db_max_connections)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    log::info!("Successfully connected to database");

    let email_sender: EmailSender = if env::CONF.email_enabled {
        log::info!("Connecting to SMTP relay...");

        let smtp_sender = SmtpSender::with_credentials(
            &env::CONF.smtp_username,
            &env::CONF.smtp_password,
            &env::CONF.smtp_address,
            env::CONF.max_smtp_connections,
            env::CONF.smtp_idle_timeout,
        )
        .expect("Failed to connect to SMTP relay");

        match smtp_sender.test_connection().await {
            Ok(true) => (),
            Ok(false) => panic!("Failed to connect to SMTP relay"),
            Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
        }

        log::info!("Successfully connected to SMTP relay");

        Arc::new(smtp_sender)
    } else {
        log::info!("Emails are disabled. Using mock email sender.");
        Arc::new(MockSender::new())
    };

    let identity_provider: IdentityProvider = match HttpIdentityGateway::new(
        &env::CONF.identity_api_url,
        &env::CONF.identity_service_key,
        env::CONF.identity_timeout,
    ) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            eprintln!("ERROR: Failed to create identity provider client: {e}");
            std::process::exit(1);
        }
    };

    let store: DeletionStore = Arc::new(db::deletion_request::Dao::new(&db_async_pool));
    let clock: SharedClock = Arc::new(SystemClock);

    let initiator = Data::new(DeletionInitiator::new(
        Arc::clone(&store),
        Arc::clone(&identity_provider),
        email_sender,
        Arc::clone(&clock),
        env::CONF.deletion_settings(),
    ));
    let restoration_handler = Data::new(RestorationHandler::new(
        Arc::clone(&store),
        Arc::clone(&clock),
    ));
    let sweeper = Data::new(Sweeper::new(
        store,
        Arc::clone(&identity_provider),
        clock,
        env::CONF.sweep_settings(),
    ));
    let unlink_guard = Data::new(OAuthUnlinkGuard::new(Arc::clone(&identity_provider)));
    let health_key = Data::new(HealthEndpointKey::new(&env::CONF.health_endpoint_key));

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db_async_pool.clone()))
            .app_data(Data::new(Arc::clone(&identity_provider)))
            .app_data(initiator.clone())
            .app_data(restoration_handler.clone())
            .app_data(sweeper.clone())
            .app_data(unlink_guard.clone())
            .app_data(health_key.clone())
            .configure(services::api::configure)
            .configure(services::web::configure)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    // Safe because all other threads have been joined at this point
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}

pub mod account;
pub mod health;
pub mod jobs;

pub mod error {
    use roam_common::lifecycle::LifecycleError;
    use roam_common::request_io::{ErrorType, ServerErrorResponse};

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use std::fmt;

    #[derive(Debug)]
    pub enum DoesNotExistType {
        User,
        RestorationToken,
        LinkedProvider,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),
        MissingRestorationToken(String),
        MissingProvider(String),
        NoPasswordSet(String),

        // 401
        IncorrectCredential(String),
        TokenMissing(String),

        // 404
        DoesNotExist(String, DoesNotExistType),

        // 409
        AlreadyRestored(String),
        DeletionAlreadyScheduled(String),
        DeletionInProgress(String),

        // 500
        InternalError(String),

        // 502
        ProviderError(String),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectlyFormed,
                    err_message: format!("Incorrectly formed request: {msg}"),
                },
                HttpErrorResponse::MissingRestorationToken(msg) => ServerErrorResponse {
                    err_type: ErrorType::MissingToken,
                    err_message: format!("Missing token: {msg}"),
                },
                HttpErrorResponse::MissingProvider(msg) => ServerErrorResponse {
                    err_type: ErrorType::MissingProvider,
                    err_message: format!("Missing provider: {msg}"),
                },
                HttpErrorResponse::NoPasswordSet(msg) => ServerErrorResponse {
                    err_type: ErrorType::NoPasswordSet,
                    err_message: format!("No password set: {msg}"),
                },

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectCredential,
                    err_message: format!("Incorrect credential: {msg}"),
                },
                HttpErrorResponse::TokenMissing(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenMissing,
                    err_message: format!("Token missing: {msg}"),
                },

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => ServerErrorResponse {
                    err_type: match dne_type {
                        DoesNotExistType::User => ErrorType::UserDoesNotExist,
                        DoesNotExistType::RestorationToken => ErrorType::TokenDoesNotExist,
                        DoesNotExistType::LinkedProvider => ErrorType::ProviderNotLinked,
                    },
                    err_message: format!("Does not exist: {msg}"),
                },

                // 409
                HttpErrorResponse::AlreadyRestored(msg) => ServerErrorResponse {
                    err_type: ErrorType::AlreadyRestored,
                    err_message: format!("Already restored: {msg}"),
                },
                HttpErrorResponse::DeletionAlreadyScheduled(msg) => ServerErrorResponse {
                    err_type: ErrorType::DeletionAlreadyScheduled,
                    err_message: format!("Deletion already scheduled: {msg}"),
                },
                HttpErrorResponse::DeletionInProgress(msg) => ServerErrorResponse {
                    err_type: ErrorType::DeletionInProgress,
                    err_message: format!("Deletion in progress: {msg}"),
                },

                // 500
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse {
                    err_type: ErrorType::InternalError,
                    err_message: format!("Internal error: {msg}"),
                },

                // 502
                HttpErrorResponse::ProviderError(msg) => ServerErrorResponse {
                    err_type: ErrorType::ProviderError,
                    err_message: format!("Identity provider error: {msg}"),
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::MissingRestorationToken(_)
                | HttpErrorResponse::MissingProvider(_)
                | HttpErrorResponse::NoPasswordSet(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_) | HttpErrorResponse::TokenMissing(_) => {
                    StatusCode::UNAUTHORIZED
                }
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::AlreadyRestored(_)
                | HttpErrorResponse::DeletionAlreadyScheduled(_)
                | HttpErrorResponse::DeletionInProgress(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                HttpErrorResponse::ProviderError(_) => StatusCode::BAD_GATEWAY,
            }
        }
    }

    impl From<LifecycleError> for HttpErrorResponse {
        fn from(err: LifecycleError) -> Self {
            match err {
                LifecycleError::MissingToken => HttpErrorResponse::MissingRestorationToken(
                    String::from("A restoration token is required"),
                ),
                LifecycleError::MissingProvider => HttpErrorResponse::MissingProvider(
                    String::from("A provider name is required"),
                ),
                LifecycleError::InvalidToken => HttpErrorResponse::DoesNotExist(
                    String::from("No pending deletion matches this restoration token"),
                    DoesNotExistType::RestorationToken,
                ),
                LifecycleError::AlreadyRestored => HttpErrorResponse::AlreadyRestored(
                    String::from("This account has already been restored"),
                ),
                LifecycleError::DeletionInProgress => HttpErrorResponse::DeletionInProgress(
                    String::from("This account is being deleted and can no longer be restored"),
                ),
                LifecycleError::DeletionAlreadyScheduled => {
                    HttpErrorResponse::DeletionAlreadyScheduled(String::from(
                        "This account is already scheduled for deletion",
                    ))
                }
                LifecycleError::UserNotFound => HttpErrorResponse::DoesNotExist(
                    String::from("User not found"),
                    DoesNotExistType::User,
                ),
                LifecycleError::ProviderNotLinked => HttpErrorResponse::DoesNotExist(
                    String::from("That provider is not linked to this account"),
                    DoesNotExistType::LinkedProvider,
                ),
                LifecycleError::NoPasswordSet => HttpErrorResponse::NoPasswordSet(String::from(
                    "Set a password before unlinking a social login",
                )),
                LifecycleError::ProviderError(msg) => HttpErrorResponse::ProviderError(msg),
                LifecycleError::Unauthorized => HttpErrorResponse::IncorrectCredential(
                    String::from("Trigger secret is missing or incorrect"),
                ),
                e @ (LifecycleError::StoreFailure(_) | LifecycleError::IdentityFailure(_)) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError(String::from(
                        "The request could not be completed",
                    ))
                }
            }
        }
    }

}

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputDeletionScheduled {
    pub message: String,
    pub scheduled_for_deletion_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputDeletionStatus {
    pub is_listed_for_deletion: bool,
    pub scheduled_for_deletion_at: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputUnlinkedProvider {
    pub message: String,
    pub provider: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    IncorrectlyFormed,
    MissingToken,
    MissingProvider,
    NoPasswordSet,

    IncorrectCredential,
    TokenMissing,

    DeletionInProgress,

    UserDoesNotExist,
    TokenDoesNotExist,
    ProviderNotLinked,

    AlreadyRestored,
    DeletionAlreadyScheduled,

    ProviderError,
    InternalError,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerErrorResponse {
    pub err_type: ErrorType,
    pub err_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_serializes_as_snake_case() {
        let resp = ServerErrorResponse {
            err_type: ErrorType::DeletionAlreadyScheduled,
            err_message: String::from("Conflict"),
        };

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["err_type"], "deletion_already_scheduled");
        assert_eq!(json["err_message"], "Conflict");
    }
}

pub mod deletion_request;
pub mod job_registry_item;
pub mod profile;

use async_trait::async_trait;

use crate::email::{EmailError, EmailMessage, SendEmail};

/// Stands in for the SMTP relay when email is disabled. Messages are logged, not delivered.
#[derive(Default)]
pub struct MockSender {}

impl MockSender {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl SendEmail for MockSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        log::info!(
            "Email delivery disabled; dropping \"{}\" to {}",
            message.subject,
            message.destination
        );
        Ok(())
    }
}

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use zeroize::Zeroizing;

use crate::middleware::bearer_credential;

/// The raw bearer credential, if one was presented. Checking it is left to the handler.
pub struct BearerCredential(pub Option<Zeroizing<String>>);

impl BearerCredential {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.as_str())
    }
}

impl FromRequest for BearerCredential {
    type Error = actix_web::error::Error;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        future::ok(BearerCredential(
            bearer_credential(req).map(|c| Zeroizing::new(String::from(c))),
        ))
    }
}

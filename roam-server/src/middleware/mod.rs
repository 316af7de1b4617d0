pub mod auth;
pub mod bearer;

use actix_web::http::header;
use actix_web::HttpRequest;

/// Extracts the credential from an `Authorization: Bearer <credential>` header.
pub fn bearer_credential(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credential) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::test::TestRequest;

    #[test]
    fn bearer_credential_requires_bearer_scheme_and_value() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_credential(&req), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "bearer   padded "))
            .to_http_request();
        assert_eq!(bearer_credential(&req), Some("padded"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert_eq!(bearer_credential(&req), None);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();
        assert_eq!(bearer_credential(&req), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_credential(&req), None);
    }
}

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{
    IdentityDeletion, IdentityError, IdentityGateway, IdentityRecord, LinkedIdentity, NewIdentity,
};

/// Identity gateway backed by the identity provider's admin REST API.
pub struct HttpIdentityGateway {
    client: Client,
    base_url: String,
    service_key: Zeroizing<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    identities: Vec<IdentityResponse>,
}

#[derive(Deserialize)]
struct IdentityResponse {
    identity_id: String,
    provider: String,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    email_confirm: bool,
}

impl From<UserResponse> for IdentityRecord {
    fn from(user: UserResponse) -> Self {
        IdentityRecord {
            user_id: user.id,
            email: user.email.unwrap_or_default(),
            identities: user
                .identities
                .into_iter()
                .map(|i| LinkedIdentity {
                    identity_id: i.identity_id,
                    provider: i.provider,
                })
                .collect(),
        }
    }
}

impl HttpIdentityGateway {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: Zeroizing::new(service_key.to_string()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", self.service_key.as_str())
    }

    fn admin_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .bearer_auth(self.service_key.as_str())
    }

    async fn send(request: RequestBuilder) -> Result<Response, IdentityError> {
        request
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))
    }

    async fn parse_user(response: Response) -> Result<UserResponse, IdentityError> {
        response
            .json::<UserResponse>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}

async fn status_error(response: Response) -> IdentityError {
    let status = response.status();

    match status {
        StatusCode::NOT_FOUND => IdentityError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => IdentityError::CredentialRejected,
        _ => {
            let body = response.text().await.unwrap_or_default();
            IdentityError::UnexpectedStatus(status.as_u16(), body)
        }
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn authenticate(&self, access_token: &str) -> Result<Uuid, IdentityError> {
        let response = Self::send(
            self.request(Method::GET, "/user")
                .bearer_auth(access_token),
        )
        .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(Self::parse_user(response).await?.id)
    }

    async fn create_identity(&self, new_identity: &NewIdentity<'_>) -> Result<Uuid, IdentityError> {
        let body = CreateUserRequest {
            email: new_identity.email,
            password: new_identity.password,
            email_confirm: true,
        };

        let response = Self::send(
            self.admin_request(Method::POST, "/admin/users")
                .json(&body),
        )
        .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(Self::parse_user(response).await?.id)
    }

    async fn get_identity(&self, user_id: Uuid) -> Result<IdentityRecord, IdentityError> {
        let response =
            Self::send(self.admin_request(Method::GET, &format!("/admin/users/{user_id}"))).await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(Self::parse_user(response).await?.into())
    }

    async fn delete_identity(&self, user_id: Uuid) -> Result<IdentityDeletion, IdentityError> {
        let response =
            Self::send(self.admin_request(Method::DELETE, &format!("/admin/users/{user_id}")))
                .await?;

        if response.status().is_success() {
            return Ok(IdentityDeletion::Deleted);
        }

        match status_error(response).await {
            IdentityError::NotFound => Ok(IdentityDeletion::AlreadyGone),
            e => Err(e),
        }
    }

    async fn unlink_identity(
        &self,
        user_id: Uuid,
        identity: &LinkedIdentity,
    ) -> Result<(), IdentityError> {
        let path = format!(
            "/admin/users/{}/identities/{}",
            user_id, identity.identity_id
        );
        let response = Self::send(self.admin_request(Method::DELETE, &path)).await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(())
    }
}

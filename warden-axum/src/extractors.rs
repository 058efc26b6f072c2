use std::net::SocketAddr;

use axum::{
    Extension, RequestPartsExt,
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::{TypedHeader, headers::UserAgent};
use warden::Account;
use warden_core::policy::UNKNOWN_SOURCE;

use crate::{error::AuthError, types::ConnectionInfo};

impl<S> FromRequestParts<S> for ConnectionInfo
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .extract::<Option<TypedHeader<UserAgent>>>()
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid user agent header"))?
            .map(|ua| ua.to_string());

        // Peer address comes from the transport. When the listener was not
        // set up with connect info the source stays unattributable.
        let source_addr = parts
            .extract::<ConnectInfo<SocketAddr>>()
            .await
            .ok()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

        Ok(ConnectionInfo {
            source_addr,
            user_agent,
        })
    }
}

pub struct AuthAccount(pub Account);

impl<S> FromRequestParts<S> for AuthAccount
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(account): Extension<Account> =
            parts.extract().await.map_err(|_| AuthError::Unauthorized)?;

        Ok(AuthAccount(account))
    }
}

pub struct OptionalAuthAccount(pub Option<Account>);

impl<S> FromRequestParts<S> for OptionalAuthAccount
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = parts.extensions.get::<Account>().cloned();

        Ok(OptionalAuthAccount(account))
    }
}

pub struct BearerToken(pub Option<String>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(|token| token.to_string());

        Ok(BearerToken(token))
    }
}

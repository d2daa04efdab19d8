use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller, read from the [`USER_ID_HEADER`] header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_header(parts)?
            .map(ActingUser)
            .ok_or_else(|| AppError::Unauthorized(format!("missing `{USER_ID_HEADER}` header")))
    }
}

/// An absent header yields `None`; a malformed one is still rejected.
impl<S: Send + Sync> OptionalFromRequestParts<S> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parse_header(parts)?.map(ActingUser))
    }
}

fn parse_header(parts: &Parts) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized(format!("malformed `{USER_ID_HEADER}` header")))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_header_is_extracted() {
        let user_id = Uuid::new_v4();
        let mut parts = parts(Some(&user_id.to_string()));
        let user = <ActingUser as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user, ActingUser(user_id));
    }

    #[tokio::test]
    async fn missing_header_is_optional_but_required_otherwise() {
        let mut required = parts(None);
        assert!(
            <ActingUser as FromRequestParts<()>>::from_request_parts(&mut required, &())
                .await
                .is_err()
        );

        let mut optional = parts(None);
        let user = <ActingUser as OptionalFromRequestParts<()>>::from_request_parts(
            &mut optional,
            &(),
        )
        .await
        .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn malformed_header_is_rejected_even_when_optional() {
        let mut parts = parts(Some("not-a-uuid"));
        let result =
            <ActingUser as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

/// Set by the upstream gateway once it has authenticated the caller.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// `Json` whose rejections render as `AppError::ValidationError`.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejections render as `AppError::ValidationError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// `Path` whose rejections render as `AppError::ValidationError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

// Middleware resolving the caller's identity into an `Actor` extension
pub async fn identity_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = actor_from_headers(request.headers())?;
    debug!("Request made by {} {}", actor.role, actor.user_id);

    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let user_id = header_str(headers, USER_ID_HEADER)?
        .parse::<Uuid>()
        .map_err(|_| AppError::Auth(format!("{} is not a valid user id", USER_ID_HEADER)))?;

    let role = header_str(headers, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(AppError::Auth)?;

    Ok(Actor::new(user_id, role))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", name)))?
        .to_str()
        .map_err(|_| AppError::Auth(format!("Invalid {} header format", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_actor_from_gateway_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("professional"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor, Actor::professional(id));
    }

    #[test]
    fn missing_or_bad_headers_are_auth_errors() {
        let mut headers = HeaderMap::new();
        assert!(matches!(actor_from_headers(&headers), Err(AppError::Auth(_))));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("client"));
        assert!(matches!(actor_from_headers(&headers), Err(AppError::Auth(_))));
    }
}

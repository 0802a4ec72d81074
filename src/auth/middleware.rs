use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

/// Resolves the caller from the bearer access token, or says why it can't.
fn identify(req: &ServiceRequest, secret: &str) -> Result<AuthUser, String> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")?;

    let claims = verify_token(token, secret)?;
    let role = Role::from_id(claims.role).ok_or("Invalid role")?;

    Ok(AuthUser {
        user_id: claims.user_id,
        role,
        employee_id: claims.employee_id,
    })
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    match identify(&req, &config.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(reason) => {
            debug!(path = req.path(), %reason, "Rejected request");
            let resp = HttpResponse::Unauthorized()
                .json(json!({"message": reason, "error": {"code": "unauthorized"}}));
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}

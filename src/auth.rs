use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lawyers and office staff: request review and responses.
    Staff,
    /// Catalog maintenance on top of staff rights.
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Staff identity recorded on answers and responses.
    pub sub: String,
    pub exp: usize,
    pub roles: Vec<Role>,
}

/// Validate a JWT and return its claims.
fn decode_jwt(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims` of a signed-in staff member.
///
/// Use `Option<Auth>` on pages that only add staff extras.
pub struct Auth(pub Claims);

impl Auth {
    pub fn subject(&self) -> &str {
        &self.0.sub
    }

    pub fn is_staff(&self) -> bool {
        self.0.roles.iter().any(|r| matches!(r, Role::Staff | Role::Admin))
    }

    pub fn is_admin(&self) -> bool {
        self.0.roles.contains(&Role::Admin)
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() { Ok(()) } else { Err(ApiError::Forbidden) }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() { Ok(()) } else { Err(ApiError::Forbidden) }
    }
}

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            log::error!("AppState missing; cannot verify bearer tokens");
            return ready(Err(ApiError::Internal));
        };
        // Delegate to BearerAuth to parse the header.
        let result = match BearerAuth::from_request(req, pl).into_inner() {
            Ok(bearer) => decode_jwt(&state.jwt_secret, bearer.token())
                .map(Auth)
                .map_err(|_| ApiError::Unauthorized),
            Err(_) => Err(ApiError::Unauthorized),
        };
        ready(result)
    }
}

/// Create a 24 hour staff token for `subject`.
pub fn create_jwt(
    secret: &str,
    subject: &str,
    roles: Vec<Role>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: subject.to_string(),
        exp: expiration,
        roles,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-that-is-32-bytes!!";

    #[test]
    fn token_round_trip_keeps_subject_and_roles() {
        let token = create_jwt(SECRET, "lawyer1", vec![Role::Staff]).unwrap();
        let claims = decode_jwt(SECRET, &token).unwrap();
        assert_eq!(claims.sub, "lawyer1");
        assert_eq!(claims.roles, vec![Role::Staff]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_jwt(SECRET, "lawyer1", vec![Role::Admin]).unwrap();
        assert!(decode_jwt("another-secret-another-secret-1234", &token).is_err());
    }

    #[test]
    fn admin_counts_as_staff() {
        let auth = Auth(Claims { sub: "a".into(), exp: 0, roles: vec![Role::Admin] });
        assert!(auth.is_staff() && auth.is_admin());
        let staff = Auth(Claims { sub: "s".into(), exp: 0, roles: vec![Role::Staff] });
        assert!(staff.require_admin().is_err());
        assert!(staff.require_staff().is_ok());
    }
}

use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload,
    error::{ErrorForbidden, ErrorUnauthorized},
};
use futures::future::{Ready, ready};

use crate::model::role::Role;
use crate::models::Claims;

/// Caller identity, put into the request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: Role::from_id(claims.role)?,
            employee_id: claims.employee_id,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn is_hr_or_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.is_hr_or_admin() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    /// The leave user id of the caller: their employee id.
    pub fn leave_user_id(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }

    /// Resolves whose leave data is read: HR/Admin may name anyone, everybody else gets
    /// their own.
    pub fn resolve_user(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        match requested {
            Some(user_id) if self.is_hr_or_admin() => Ok(user_id),
            Some(user_id) if self.employee_id == Some(user_id) => Ok(user_id),
            Some(_) => Err(ErrorForbidden("HR/Admin only")),
            None => self.leave_user_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "jdoe".to_string(),
            role,
            employee_id,
        }
    }

    #[test]
    fn test_resolve_user() {
        let employee = user(Role::Employee, Some(1000));
        assert_eq!(employee.resolve_user(None).unwrap(), 1000);
        assert_eq!(employee.resolve_user(Some(1000)).unwrap(), 1000);
        assert!(employee.resolve_user(Some(1001)).is_err());

        let hr = user(Role::Hr, None);
        assert_eq!(hr.resolve_user(Some(1001)).unwrap(), 1001);
        assert!(hr.resolve_user(None).is_err());
    }

    #[actix_web::test]
    async fn test_extractor_reads_request_extensions() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::UNAUTHORIZED
        );

        req.extensions_mut().insert(user(Role::Employee, Some(1000)));
        let auth = AuthUser::extract(&req).await.unwrap();
        assert_eq!(auth.employee_id, Some(1000));
        assert_eq!(auth.username, "jdoe");
    }

    #[test]
    fn test_roles() {
        assert!(user(Role::Admin, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Employee, Some(5)).require_hr_or_admin().is_err());
    }
}

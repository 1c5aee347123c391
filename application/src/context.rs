//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts};
use service::domain::{tenant, user};

use crate::{define_error, Error, Service};

/// Name of the HTTP header carrying the ID of the current tenant.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Name of the HTTP header carrying the ID of the acting user.
pub const USER_HEADER: &str = "x-user-id";

/// Request context.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// ID of the tenant the request is performed on behalf of.
    tenant_id: tenant::Id,

    /// ID of the acting user, if any.
    user_id: Option<user::Id>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns ID of the tenant of this [`Context`].
    #[must_use]
    pub const fn tenant_id(&self) -> tenant::Id {
        self.tenant_id
    }

    /// Returns ID of the acting user of this [`Context`], if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<user::Id> {
        self.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let header = |name| {
            parts
                .headers
                .get(name)
                .map(|h| h.to_str().ok().map(str::trim))
        };
        let tenant_id = match header(TENANT_HEADER) {
            None => return Err(HeaderError::TenantRequired.into()),
            Some(v) => v
                .and_then(|v| v.parse::<tenant::Id>().ok())
                .ok_or(HeaderError::InvalidTenant)?,
        };
        let user_id = header(USER_HEADER)
            .map(|v| {
                v.and_then(|v| v.parse::<user::Id>().ok())
                    .ok_or(HeaderError::InvalidUser)
            })
            .transpose()?;

        Ok(Self {
            service,
            tenant_id,
            user_id,
        })
    }
}

define_error! {
    enum HeaderError {
        #[code = "TENANT_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "`X-Tenant-Id` header is required"]
        TenantRequired,

        #[code = "INVALID_TENANT"]
        #[status = BAD_REQUEST]
        #[message = "`X-Tenant-Id` header is not a valid ID"]
        InvalidTenant,

        #[code = "INVALID_USER"]
        #[status = BAD_REQUEST]
        #[message = "`X-User-Id` header is not a valid ID"]
        InvalidUser,
    }
}

use crate::error::ErrorStatus;
use crate::handler::AppModule;
use application::service::ResolveTenantService;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use error_stack::Report;
use kernel::prelude::entity::Tenant;
use kernel::KernelError;
use uuid::Uuid;

pub const CALLER_HEADER: &str = "x-user-id";

/// Authenticated caller, resolved from the `x-user-id` header into its library scope.
pub struct Caller(pub Tenant);

fn caller_id(parts: &Parts) -> error_stack::Result<Uuid, KernelError> {
    let raw = parts
        .headers
        .get(CALLER_HEADER)
        .ok_or_else(|| {
            Report::new(KernelError::PermissionDenied)
                .attach_printable(format!("missing {CALLER_HEADER} header"))
        })?
        .to_str()
        .map_err(|_| {
            Report::new(KernelError::PermissionDenied)
                .attach_printable(format!("unreadable {CALLER_HEADER} header"))
        })?;
    Uuid::parse_str(raw.trim()).map_err(|_| {
        Report::new(KernelError::PermissionDenied)
            .attach_printable(format!("{CALLER_HEADER} is not a user id"))
    })
}

#[async_trait]
impl FromRequestParts<AppModule> for Caller {
    type Rejection = ErrorStatus;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppModule,
    ) -> Result<Self, Self::Rejection> {
        let user_id = caller_id(parts)?;
        let tenant = state.resolve_tenant(user_id).await?;
        Ok(Caller(tenant))
    }
}

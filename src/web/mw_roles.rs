// src/web/mw_roles.rs
// Controlo de acesso por perfil. Corre *depois* de `require_auth`.
use crate::{error::AppError, models::user::Perfil, web::mw_auth::CurrentUser};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

async fn exigir_perfil(
    perfil: Perfil,
    current: &CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if current.0.perfil == perfil {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            "Acesso negado a {} para {} (perfil {}, exige {}).",
            request.uri().path(),
            current.0.id,
            current.0.perfil,
            perfil
        );
        Err(AppError::Forbidden)
    }
}

pub async fn require_admin(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    exigir_perfil(Perfil::Admin, &current, request, next).await
}

pub async fn require_professor(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    exigir_perfil(Perfil::Professor, &current, request, next).await
}

pub async fn require_aluno(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    exigir_perfil(Perfil::Aluno, &current, request, next).await
}

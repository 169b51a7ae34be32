// src/web/mw_auth.rs
use crate::{error::AppError, models::user::User, services::user_service, state::AppState};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use tower_sessions::Session;

/// Chave da sessão com o id do utilizador autenticado.
pub const SESSION_USER_KEY: &str = "user_id";

/// Utilizador autenticado, posto nas extensões por `require_auth`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Lê a sessão e carrega o utilizador. Sessões de utilizadores apagados são limpas.
async fn carregar_utilizador(state: &AppState, session: &Session) -> Result<Option<User>, AppError> {
    let user_id = session
        .get::<i64>(SESSION_USER_KEY)
        .await
        .map_err(|e| AppError::SessionError(format!("Erro ao verificar sessão: {}", e)))?;

    let Some(user_id) = user_id else {
        return Ok(None);
    };

    match user_service::find_user_by_id(&state.db_pool, user_id).await? {
        Some(user) => Ok(Some(user)),
        None => {
            tracing::warn!("Autenticação MW: user_id '{}' da sessão já não existe.", user_id);
            session
                .flush()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao limpar sessão: {}", e)))?;
            Ok(None)
        }
    }
}

// Middleware que verifica se o utilizador está logado (páginas HTML)
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match carregar_utilizador(&state, &session).await? {
        Some(user) => {
            tracing::debug!("Autenticação MW: Utilizador '{}' autenticado.", user.id);
            request.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(request).await)
        }
        None => {
            tracing::debug!("Autenticação MW: Não autenticado. Redirecionando para /login");
            Ok(Redirect::to("/login").into_response())
        }
    }
}

/// Igual a `require_auth`, mas responde 401 em JSON (API do chat).
pub async fn require_auth_api(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match carregar_utilizador(&state, &session).await? {
        Some(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(request).await)
        }
        None => Ok((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": "Não autenticado" })),
        )
            .into_response()),
    }
}

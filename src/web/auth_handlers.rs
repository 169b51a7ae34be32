// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{CadastroForm, EsqueciSenhaForm, LoginForm, RedefinirSenhaForm},
    services::{auth_service, user_service},
    state::AppState,
    templates::{
        render, CadastroPage, EsqueciSenhaPage, FeedbackParams, LoginPage, RedefinirSenhaPage,
    },
    web::{
        feedback::{self, mensagem_formulario},
        mw_auth::SESSION_USER_KEY,
        mw_rate_limit::chave_cliente,
    },
};
use axum::{
    extract::{ConnectInfo, Extension, Form, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::net::SocketAddr;
use tower_sessions::Session;

async fn sessao_ativa(session: &Session) -> bool {
    session.get::<i64>(SESSION_USER_KEY).await.ok().flatten().is_some()
}

// GET /login
pub async fn show_login_form(
    session: Session,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<Response> {
    if sessao_ativa(&session).await {
        tracing::debug!("GET /login: Utilizador já logado, redirecionando para /usuario");
        return Ok(Redirect::to("/usuario").into_response());
    }
    Ok(render(&LoginPage { email: String::new(), feedback })?.into_response())
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("Tentativa de login para: {}", form.email);

    let peer = connect_info.map(|Extension(ConnectInfo(addr))| addr);
    let chave = chave_cliente(&headers, peer, state.config.trust_proxy);
    if !state.limitador_login.verificar(&chave).await {
        let page = LoginPage {
            email: form.email,
            feedback: FeedbackParams::erro(AppError::RateLimited.user_message()),
        };
        return Ok((StatusCode::TOO_MANY_REQUESTS, render(&page)?).into_response());
    }

    match auth_service::autenticar(&state.db_pool, &form.email, &form.password).await {
        Ok(user) => {
            // Gera novo ID de sessão (segurança)
            session
                .cycle_id()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
            session
                .insert(SESSION_USER_KEY, user.id)
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;

            tracing::info!("✅ Login bem-sucedido para: {} ({})", user.email, user.perfil);
            Ok(Redirect::to("/usuario").into_response())
        }
        Err(AppError::InvalidCredentials) => {
            let page = LoginPage {
                email: form.email,
                feedback: FeedbackParams::erro(AppError::InvalidCredentials.user_message()),
            };
            Ok(render(&page)?.into_response())
        }
        Err(e) => Err(e),
    }
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let user_id: Option<i64> = session.get(SESSION_USER_KEY).await.ok().flatten();

    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;

    match user_id {
        Some(id) => tracing::info!("🚪 Utilizador '{}' desligado.", id),
        None => tracing::info!("🚪 Sessão anónima desligada."),
    }
    Ok(Redirect::to("/login"))
}

// GET /cadastrar
pub async fn show_cadastro_form() -> AppResult<impl IntoResponse> {
    render(&CadastroPage { form: CadastroForm::default(), error_message: None })
}

// POST /cadastrar
pub async fn handle_cadastro(
    State(state): State<AppState>,
    Form(form): Form<CadastroForm>,
) -> AppResult<Response> {
    match user_service::cadastrar_aluno(&state.db_pool, &form).await {
        Ok(_) => Ok(feedback::sucesso("/login", "Cadastro realizado com sucesso! Faça login para continuar.")
            .into_response()),
        Err(e) => {
            let error_message = Some(mensagem_formulario(e)?);
            let form = CadastroForm { senha: String::new(), confirmar_senha: String::new(), ..form };
            Ok(render(&CadastroPage { form, error_message })?.into_response())
        }
    }
}

// GET /esqueci-senha
pub async fn show_esqueci_senha(Query(feedback): Query<FeedbackParams>) -> AppResult<impl IntoResponse> {
    render(&EsqueciSenhaPage { feedback })
}

// POST /esqueci-senha
pub async fn handle_esqueci_senha(
    State(state): State<AppState>,
    Form(form): Form<EsqueciSenhaForm>,
) -> AppResult<Redirect> {
    let token = user_service::gerar_token_redefinicao(
        &state.db_pool,
        &form.email,
        state.config.reset_token_ttl_minutes,
    )
    .await?;

    // Sem envio de e-mail: o link fica no log
    if let Some(token) = token {
        tracing::info!("📧 Link de redefinição para {}: /redefinir-senha?token={}", form.email, token);
    }
    Ok(feedback::sucesso(
        "/esqueci-senha",
        "Se o e-mail estiver cadastrado, você receberá instruções para redefinir sua senha.",
    ))
}

#[derive(Deserialize, Debug)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

// GET /redefinir-senha?token=...
pub async fn show_redefinir_senha(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Response> {
    if user_service::find_by_reset_token(&state.db_pool, &query.token).await?.is_none() {
        return Ok(feedback::erro("/esqueci-senha", &AppError::InvalidToken.user_message()).into_response());
    }
    Ok(render(&RedefinirSenhaPage { token: query.token, error_message: None })?.into_response())
}

// POST /redefinir-senha
pub async fn handle_redefinir_senha(
    State(state): State<AppState>,
    Form(form): Form<RedefinirSenhaForm>,
) -> AppResult<Response> {
    match user_service::redefinir_senha(&state.db_pool, &form).await {
        Ok(()) => Ok(feedback::sucesso("/login", "Senha redefinida com sucesso! Faça login com a nova senha.")
            .into_response()),
        Err(AppError::InvalidToken) => {
            Ok(feedback::erro("/esqueci-senha", &AppError::InvalidToken.user_message()).into_response())
        }
        Err(e) => {
            let error_message = Some(mensagem_formulario(e)?);
            Ok(render(&RedefinirSenhaPage { token: form.token, error_message })?.into_response())
        }
    }
}

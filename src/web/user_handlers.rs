// src/web/user_handlers.rs
use crate::{
    error::AppResult,
    models::user::{AlterarSenhaForm, DadosUsuario},
    services::{chamado_service, chat_service, user_service},
    state::AppState,
    templates::{render, AlterarSenhaPage, FeedbackParams, PerfilPage, UserHomePage},
    web::{feedback, mw_auth::CurrentUser},
};
use axum::{
    extract::{Extension, Form, Query, State},
    response::{IntoResponse, Redirect},
};

// GET /usuario
pub async fn user_page_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /usuario: Acesso para {}", user.id);
    let chamados_nao_lidos = chamado_service::contar_nao_lidas_do_usuario(&state.db_pool, user.id).await?;
    let chat_nao_lidas = chat_service::contar_nao_lidas(&state.db_pool, user.id).await?;
    render(&UserHomePage { usuario: user, chamados_nao_lidos, chat_nao_lidas })
}

// GET /usuario/perfil
pub async fn show_perfil(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let dados = user.dados();
    render(&PerfilPage { usuario: user, dados, feedback })
}

// POST /usuario/perfil
pub async fn handle_perfil(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(dados): Form<DadosUsuario>,
) -> AppResult<Redirect> {
    let resultado = user_service::update_profile(&state.db_pool, &user, &dados).await;
    feedback::concluir(resultado, "/usuario/perfil", "Perfil atualizado com sucesso!")
}

// GET /usuario/alterar-senha
pub async fn show_alterar_senha(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    render(&AlterarSenhaPage { usuario: user, feedback })
}

// POST /usuario/alterar-senha
pub async fn handle_alterar_senha(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<AlterarSenhaForm>,
) -> AppResult<Redirect> {
    let resultado = user_service::alterar_propria_senha(&state.db_pool, &user, &form).await;
    feedback::concluir(resultado, "/usuario/alterar-senha", "Senha alterada com sucesso!")
}

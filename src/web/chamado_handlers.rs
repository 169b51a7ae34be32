// src/web/chamado_handlers.rs
// Chamados de suporte: lado do utilizador e lado do administrador.
use crate::{
    error::{AppError, AppResult},
    models::chamado::{NovoChamadoForm, PrioridadeChamado, RespostaAdminForm, RespostaChamadoForm, StatusChamado},
    services::chamado_service,
    state::AppState,
    templates::{
        render, AdminChamadoDetalhePage, AdminChamadosPage, ChamadoDetalhePage, ChamadosPage,
        FeedbackParams, NovoChamadoPage,
    },
    web::{
        feedback::{self, mensagem_formulario},
        mw_auth::CurrentUser,
    },
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};

const MEUS_CHAMADOS: &str = "/chamados/listar";
const ADMIN_CHAMADOS: &str = "/admin/chamados/listar";

// GET /chamados/listar
pub async fn listar_meus(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let chamados = chamado_service::listar_do_usuario(&state.db_pool, user.id).await?;
    render(&ChamadosPage { usuario: user, chamados, feedback })
}

// GET /chamados/cadastrar
pub async fn show_novo_chamado(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    render(&NovoChamadoPage {
        usuario: user,
        titulo: String::new(),
        descricao: String::new(),
        prioridades: PrioridadeChamado::TODAS,
        error_message: None,
    })
}

// POST /chamados/cadastrar
pub async fn handle_novo_chamado(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<NovoChamadoForm>,
) -> AppResult<Response> {
    match chamado_service::abrir(&state.db_pool, user.id, &form).await {
        Ok(id) => {
            tracing::info!("Chamado {} aberto por {}.", id, user.id);
            Ok(feedback::sucesso(MEUS_CHAMADOS, "Chamado aberto com sucesso!").into_response())
        }
        Err(e) => {
            let page = NovoChamadoPage {
                usuario: user,
                titulo: form.titulo,
                descricao: form.descricao,
                prioridades: PrioridadeChamado::TODAS,
                error_message: Some(mensagem_formulario(e)?),
            };
            Ok(render(&page)?.into_response())
        }
    }
}

// GET /chamados/{id}
pub async fn detalhe_meu(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<Response> {
    let chamado = match chamado_service::obter_do_usuario(&state.db_pool, id, user.id).await {
        Ok(chamado) => chamado,
        Err(e) => return Ok(feedback::redirecionar_erro(MEUS_CHAMADOS, e)?.into_response()),
    };
    chamado_service::marcar_lidas_pelo_dono(&state.db_pool, &chamado).await?;
    let interacoes = chamado_service::interacoes(&state.db_pool, id).await?;
    Ok(render(&ChamadoDetalhePage { usuario: user, chamado, interacoes, feedback })?.into_response())
}

// POST /chamados/{id}/responder
pub async fn responder_meu(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<RespostaChamadoForm>,
) -> AppResult<Redirect> {
    let destino = format!("/chamados/{}", id);
    match chamado_service::responder_usuario(&state.db_pool, id, user.id, &form).await {
        Ok(()) => Ok(feedback::sucesso(&destino, "Resposta enviada com sucesso!")),
        Err(e @ AppError::NotFound(_)) => feedback::redirecionar_erro(MEUS_CHAMADOS, e),
        Err(e) => feedback::redirecionar_erro(&destino, e),
    }
}

// ---------------- Administração ----------------

// GET /admin/chamados/listar
pub async fn listar_todos(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let chamados = chamado_service::listar_todos(&state.db_pool).await?;
    render(&AdminChamadosPage { usuario: admin, chamados, feedback })
}

// GET /admin/chamados/{id}
pub async fn detalhe_admin(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<Response> {
    let chamado = match chamado_service::obter(&state.db_pool, id).await {
        Ok(chamado) => chamado,
        Err(e) => return Ok(feedback::redirecionar_erro(ADMIN_CHAMADOS, e)?.into_response()),
    };
    chamado_service::marcar_lidas_pelo_admin(&state.db_pool, &chamado).await?;
    let interacoes = chamado_service::interacoes(&state.db_pool, id).await?;
    let page = AdminChamadoDetalhePage {
        usuario: admin,
        chamado,
        interacoes,
        status: StatusChamado::TODOS,
        feedback,
    };
    Ok(render(&page)?.into_response())
}

// POST /admin/chamados/{id}/responder
pub async fn responder_admin(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<RespostaAdminForm>,
) -> AppResult<Redirect> {
    let destino = format!("/admin/chamados/{}", id);
    match chamado_service::responder_admin(&state.db_pool, id, admin.id, &form).await {
        Ok(()) => Ok(feedback::sucesso(&destino, "Resposta registrada com sucesso!")),
        Err(e @ AppError::NotFound(_)) => feedback::redirecionar_erro(ADMIN_CHAMADOS, e),
        Err(e) => feedback::redirecionar_erro(&destino, e),
    }
}

// POST /admin/chamados/{id}/reabrir
pub async fn reabrir(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Redirect> {
    let destino = format!("/admin/chamados/{}", id);
    match chamado_service::reabrir(&state.db_pool, id).await {
        Ok(()) => Ok(feedback::sucesso(&destino, "Chamado reaberto com sucesso!")),
        Err(e @ AppError::NotFound(_)) => feedback::redirecionar_erro(ADMIN_CHAMADOS, e),
        Err(e) => feedback::redirecionar_erro(&destino, e),
    }
}

// POST /admin/chamados/excluir/{id}
pub async fn excluir(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Redirect> {
    let resultado = chamado_service::excluir(&state.db_pool, id).await;
    feedback::concluir(resultado, ADMIN_CHAMADOS, "Chamado excluído com sucesso!")
}

// src/web/catalogo_handlers.rs
// CRUD de categorias, atividades e turmas (área administrativa).
use crate::{
    error::{AppError, AppResult},
    models::{
        catalogo::{AtividadeForm, CategoriaForm},
        turma::TurmaForm,
        user::{Perfil, User},
    },
    services::{atividade_service, categoria_service, turma_service, user_service},
    state::AppState,
    templates::{
        render, AdminAtividadesPage, AdminCategoriasPage, AdminTurmasPage, AtividadeFormPage,
        CategoriaFormPage, FeedbackParams, TurmaFormPage,
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
use sqlx::SqlitePool;

/// Resultado de um POST de formulário: redirect com sucesso, página com o erro,
/// ou redirect para a lista quando o registo não existe.
fn resposta_formulario(
    resultado: AppResult<()>,
    listar: &str,
    mensagem_sucesso: &str,
    pagina: impl FnOnce(String) -> AppResult<Response>,
) -> AppResult<Response> {
    match resultado {
        Ok(()) => Ok(feedback::sucesso(listar, mensagem_sucesso).into_response()),
        Err(AppError::NotFound(msg)) => Ok(feedback::erro(listar, msg).into_response()),
        Err(e) => pagina(mensagem_formulario(e)?),
    }
}

// ---------------- Categorias ----------------

const CATEGORIAS: &str = "/admin/categorias/listar";

pub async fn listar_categorias(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let categorias = categoria_service::listar(&state.db_pool).await?;
    render(&AdminCategoriasPage { usuario: admin, categorias, feedback })
}

fn categoria_page(admin: User, acao: String, form: CategoriaForm, erro: Option<String>) -> AppResult<Response> {
    let titulo = if acao.ends_with("cadastrar") { "Nova categoria" } else { "Editar categoria" };
    let page = CategoriaFormPage { usuario: admin, titulo: titulo.into(), acao, form, error_message: erro };
    Ok(render(&page)?.into_response())
}

pub async fn show_cadastrar_categoria(
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<Response> {
    categoria_page(admin, "/admin/categorias/cadastrar".into(), CategoriaForm::default(), None)
}

pub async fn handle_cadastrar_categoria(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<CategoriaForm>,
) -> AppResult<Response> {
    let resultado = categoria_service::criar(&state.db_pool, &form).await.map(|_| ());
    resposta_formulario(resultado, CATEGORIAS, "Categoria cadastrada com sucesso!", |msg| {
        categoria_page(admin, "/admin/categorias/cadastrar".into(), form, Some(msg))
    })
}

pub async fn show_editar_categoria(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match categoria_service::obter(&state.db_pool, id).await {
        Ok(categoria) => categoria_page(
            admin,
            format!("/admin/categorias/editar/{}", id),
            CategoriaForm::from(&categoria),
            None,
        ),
        Err(e) => Ok(feedback::redirecionar_erro(CATEGORIAS, e)?.into_response()),
    }
}

pub async fn handle_editar_categoria(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<CategoriaForm>,
) -> AppResult<Response> {
    let resultado = categoria_service::atualizar(&state.db_pool, id, &form).await;
    resposta_formulario(resultado, CATEGORIAS, "Categoria alterada com sucesso!", |msg| {
        categoria_page(admin, format!("/admin/categorias/editar/{}", id), form, Some(msg))
    })
}

pub async fn handle_excluir_categoria(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let resultado = categoria_service::excluir(&state.db_pool, id).await;
    feedback::concluir(resultado, CATEGORIAS, "Categoria excluída com sucesso!")
}

// ---------------- Atividades ----------------

const ATIVIDADES: &str = "/admin/atividades/listar";

pub async fn listar_atividades(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let atividades = atividade_service::listar(&state.db_pool).await?;
    render(&AdminAtividadesPage { usuario: admin, atividades, feedback })
}

async fn atividade_page(
    db_pool: &SqlitePool,
    admin: User,
    acao: String,
    form: AtividadeForm,
    erro: Option<String>,
) -> AppResult<Response> {
    let titulo = if acao.ends_with("cadastrar") { "Nova atividade" } else { "Editar atividade" };
    let page = AtividadeFormPage {
        usuario: admin,
        titulo: titulo.into(),
        acao,
        form,
        categorias: categoria_service::listar(db_pool).await?,
        error_message: erro,
    };
    Ok(render(&page)?.into_response())
}

pub async fn show_cadastrar_atividade(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<Response> {
    atividade_page(&state.db_pool, admin, "/admin/atividades/cadastrar".into(), AtividadeForm::default(), None).await
}

pub async fn handle_cadastrar_atividade(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<AtividadeForm>,
) -> AppResult<Response> {
    match atividade_service::criar(&state.db_pool, &form).await {
        Ok(_) => Ok(feedback::sucesso(ATIVIDADES, "Atividade cadastrada com sucesso!").into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            atividade_page(&state.db_pool, admin, "/admin/atividades/cadastrar".into(), form, Some(msg)).await
        }
    }
}

pub async fn show_editar_atividade(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match atividade_service::obter(&state.db_pool, id).await {
        Ok(atividade) => {
            let acao = format!("/admin/atividades/editar/{}", id);
            atividade_page(&state.db_pool, admin, acao, AtividadeForm::from(&atividade), None).await
        }
        Err(e) => Ok(feedback::redirecionar_erro(ATIVIDADES, e)?.into_response()),
    }
}

pub async fn handle_editar_atividade(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<AtividadeForm>,
) -> AppResult<Response> {
    match atividade_service::atualizar(&state.db_pool, id, &form).await {
        Ok(()) => Ok(feedback::sucesso(ATIVIDADES, "Atividade alterada com sucesso!").into_response()),
        Err(AppError::NotFound(msg)) => Ok(feedback::erro(ATIVIDADES, msg).into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            let acao = format!("/admin/atividades/editar/{}", id);
            atividade_page(&state.db_pool, admin, acao, form, Some(msg)).await
        }
    }
}

pub async fn handle_excluir_atividade(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let resultado = atividade_service::excluir(&state.db_pool, id).await;
    feedback::concluir(resultado, ATIVIDADES, "Atividade excluída com sucesso!")
}

// ---------------- Turmas ----------------

const TURMAS: &str = "/admin/turmas/listar";

pub async fn listar_turmas(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let turmas = turma_service::listar(&state.db_pool).await?;
    render(&AdminTurmasPage { usuario: admin, turmas, feedback })
}

async fn turma_page(
    db_pool: &SqlitePool,
    admin: User,
    acao: String,
    form: TurmaForm,
    erro: Option<String>,
) -> AppResult<Response> {
    let titulo = if acao.ends_with("cadastrar") { "Nova turma" } else { "Editar turma" };
    let page = TurmaFormPage {
        usuario: admin,
        titulo: titulo.into(),
        acao,
        form,
        atividades: atividade_service::listar(db_pool).await?,
        professores: user_service::listar_resumo_por_perfil(db_pool, Perfil::Professor).await?,
        error_message: erro,
    };
    Ok(render(&page)?.into_response())
}

pub async fn show_cadastrar_turma(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<Response> {
    let form = TurmaForm { vagas: 20, ..TurmaForm::default() };
    turma_page(&state.db_pool, admin, "/admin/turmas/cadastrar".into(), form, None).await
}

pub async fn handle_cadastrar_turma(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<TurmaForm>,
) -> AppResult<Response> {
    match turma_service::criar(&state.db_pool, &form).await {
        Ok(_) => Ok(feedback::sucesso(TURMAS, "Turma cadastrada com sucesso!").into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            turma_page(&state.db_pool, admin, "/admin/turmas/cadastrar".into(), form, Some(msg)).await
        }
    }
}

pub async fn show_editar_turma(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match turma_service::obter(&state.db_pool, id).await {
        Ok(turma) => {
            let acao = format!("/admin/turmas/editar/{}", id);
            turma_page(&state.db_pool, admin, acao, TurmaForm::from(&turma), None).await
        }
        Err(e) => Ok(feedback::redirecionar_erro(TURMAS, e)?.into_response()),
    }
}

pub async fn handle_editar_turma(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<TurmaForm>,
) -> AppResult<Response> {
    match turma_service::atualizar(&state.db_pool, id, &form).await {
        Ok(()) => Ok(feedback::sucesso(TURMAS, "Turma alterada com sucesso!").into_response()),
        Err(AppError::NotFound(msg)) => Ok(feedback::erro(TURMAS, msg).into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            let acao = format!("/admin/turmas/editar/{}", id);
            turma_page(&state.db_pool, admin, acao, form, Some(msg)).await
        }
    }
}

pub async fn handle_excluir_turma(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let resultado = turma_service::excluir(&state.db_pool, id).await;
    feedback::concluir(resultado, TURMAS, "Turma excluída com sucesso!")
}

// src/web/admin_handlers.rs
// Gestão de utilizadores e painel de estatísticas.
use crate::{
    error::{AppError, AppResult},
    models::user::{DadosUsuario, DefinirSenhaForm, NovoUsuarioForm, Perfil, User},
    services::{estatisticas_service, user_service},
    state::AppState,
    templates::{render, AdminUsuarioFormPage, AdminUsuariosPage, DashboardPage, FeedbackParams},
    web::{
        feedback::{self, mensagem_formulario},
        mw_auth::CurrentUser,
    },
};
use axum::{
    extract::{Extension, Form, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use validator::Validate;

const LISTAR: &str = "/admin/usuarios/listar";

#[derive(Deserialize, Debug)]
pub struct ListarUsuariosQuery {
    #[serde(default)]
    perfil: String,
    success: Option<String>,
    error: Option<String>,
}

// GET /admin/usuarios/listar
pub async fn show_admin_users_page(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(params): Query<ListarUsuariosQuery>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET {}: filtro '{}'", LISTAR, params.perfil);
    let perfil = Perfil::from_valor(&params.perfil);
    let usuarios = user_service::find_all_users(&state.db_pool, perfil).await?;

    render(&AdminUsuariosPage {
        usuario: admin,
        usuarios,
        filtro: perfil.map(|p| p.as_str().to_string()).unwrap_or_default(),
        perfis: Perfil::TODOS,
        feedback: FeedbackParams { success: params.success, error: params.error },
    })
}

fn form_page(
    admin: User,
    titulo: &str,
    acao: String,
    pede_senha: bool,
    dados: DadosUsuario,
    error_message: Option<String>,
) -> AppResult<Response> {
    let page = AdminUsuarioFormPage {
        usuario: admin,
        titulo: titulo.to_string(),
        acao,
        pede_senha,
        dados,
        perfis: Perfil::TODOS,
        error_message,
    };
    Ok(render(&page)?.into_response())
}

// GET /admin/usuarios/cadastrar
pub async fn show_create_user_form(
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<Response> {
    form_page(admin, "Novo usuário", "/admin/usuarios/cadastrar".into(), true, DadosUsuario::default(), None)
}

// POST /admin/usuarios/cadastrar
pub async fn handle_create_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<NovoUsuarioForm>,
) -> AppResult<Response> {
    tracing::info!("POST /admin/usuarios/cadastrar: {} ({})", form.dados.email, form.dados.perfil);
    match user_service::create_user(&state.db_pool, &form).await {
        Ok(_) => {
            let msg = format!("Usuário '{}' cadastrado com sucesso.", form.dados.nome.trim());
            Ok(feedback::sucesso(LISTAR, &msg).into_response())
        }
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            form_page(admin, "Novo usuário", "/admin/usuarios/cadastrar".into(), true, form.dados, Some(msg))
        }
    }
}

// GET /admin/usuarios/editar/{id}
pub async fn show_edit_user_form(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let Some(user) = user_service::find_user_by_id(&state.db_pool, id).await? else {
        return Ok(feedback::erro(LISTAR, "Usuário não encontrado.").into_response());
    };
    form_page(admin, "Editar usuário", format!("/admin/usuarios/editar/{}", id), false, user.dados(), None)
}

// POST /admin/usuarios/editar/{id}
pub async fn handle_edit_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(dados): Form<DadosUsuario>,
) -> AppResult<Response> {
    let resultado = if id == admin.id && dados.perfil != Perfil::Admin {
        Err(AppError::BadRequest("Não é possível remover o seu próprio perfil de administrador.".into()))
    } else {
        user_service::update_user(&state.db_pool, id, &dados).await
    };

    match resultado {
        Ok(()) => Ok(feedback::sucesso(LISTAR, "Usuário atualizado com sucesso.").into_response()),
        Err(AppError::NotFound(msg)) => Ok(feedback::erro(LISTAR, msg).into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            form_page(admin, "Editar usuário", format!("/admin/usuarios/editar/{}", id), false, dados, Some(msg))
        }
    }
}

// POST /admin/usuarios/senha/{id}
pub async fn handle_change_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<DefinirSenhaForm>,
) -> AppResult<Redirect> {
    tracing::info!("POST /admin/usuarios/senha/{}", id);
    let resultado = match form.validate() {
        Ok(()) => user_service::update_user_password(&state.db_pool, id, &form.nova_senha).await,
        Err(e) => Err(e.into()),
    };
    feedback::concluir(resultado, LISTAR, "Senha alterada com sucesso.")
}

// POST /admin/usuarios/excluir/{id}
pub async fn handle_delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let resultado = user_service::delete_user(&state.db_pool, id, admin.id).await;
    feedback::concluir(resultado, LISTAR, "Usuário excluído com sucesso.")
}

// GET /admin/estatisticas/dashboard
pub async fn show_dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let dashboard = estatisticas_service::dashboard(&state.db_pool).await?;
    render(&DashboardPage { usuario: admin, dashboard })
}

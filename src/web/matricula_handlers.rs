// src/web/matricula_handlers.rs
// Matrículas e pagamentos (admin), área do aluno e área do professor.
use crate::{
    error::{AppError, AppResult},
    models::{
        matricula::{AutoMatriculaForm, MatriculaForm},
        pagamento::{AlterarPagamentoForm, PagamentoForm},
        user::{Perfil, User},
    },
    services::{matricula_service, pagamento_service, turma_service, user_service},
    state::AppState,
    templates::{
        render, AdminMatriculasPage, AdminPagamentosPage, AlunoMatriculasPage, AlunoPagamentosPage,
        AlunoTurmasPage, FeedbackParams, MatriculaFormPage, PagamentoEditarPage, PagamentoFormPage,
        ProfessorTurmasPage, TurmaComAlunos, TurmaDisponivel,
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

const MATRICULAS: &str = "/admin/matriculas/listar";
const PAGAMENTOS: &str = "/admin/pagamentos/listar";

// ---------------- Matrículas (admin) ----------------

pub async fn listar_matriculas(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let matriculas = matricula_service::listar_todas(&state.db_pool).await?;
    render(&AdminMatriculasPage { usuario: admin, matriculas, feedback })
}

/// Formulário de matrícula com os selects de alunos e turmas.
async fn matricula_page(
    db_pool: &SqlitePool,
    admin: User,
    acao: String,
    form: MatriculaForm,
    erro: Option<String>,
) -> AppResult<Response> {
    let titulo = if acao.ends_with("cadastrar") { "Nova matrícula" } else { "Editar matrícula" };
    let page = MatriculaFormPage {
        usuario: admin,
        titulo: titulo.into(),
        acao,
        form,
        alunos: user_service::listar_resumo_por_perfil(db_pool, Perfil::Aluno).await?,
        turmas: turma_service::listar(db_pool).await?,
        error_message: erro,
    };
    Ok(render(&page)?.into_response())
}

pub async fn show_cadastrar_matricula(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<Response> {
    let form = MatriculaForm { dia_vencimento: 10, ..MatriculaForm::default() };
    matricula_page(&state.db_pool, admin, "/admin/matriculas/cadastrar".into(), form, None).await
}

/// Em caso de recusa o formulário volta com os valores submetidos.
pub async fn handle_cadastrar_matricula(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<MatriculaForm>,
) -> AppResult<Response> {
    tracing::info!("POST /admin/matriculas/cadastrar: aluno {} turma {}", form.id_aluno, form.id_turma);
    match matricula_service::matricular(&state.db_pool, &form).await {
        Ok(_) => Ok(feedback::sucesso(MATRICULAS, "Matrícula realizada com sucesso!").into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            matricula_page(&state.db_pool, admin, "/admin/matriculas/cadastrar".into(), form, Some(msg)).await
        }
    }
}

pub async fn show_editar_matricula(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match matricula_service::obter_por_id(&state.db_pool, id).await {
        Ok(matricula) => {
            let acao = format!("/admin/matriculas/editar/{}", id);
            matricula_page(&state.db_pool, admin, acao, MatriculaForm::from(&matricula), None).await
        }
        Err(e) => Ok(feedback::redirecionar_erro(MATRICULAS, e)?.into_response()),
    }
}

pub async fn handle_editar_matricula(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<MatriculaForm>,
) -> AppResult<Response> {
    match matricula_service::alterar(&state.db_pool, id, &form).await {
        Ok(()) => Ok(feedback::sucesso(MATRICULAS, "Matrícula alterada com sucesso!").into_response()),
        Err(AppError::NotFound(msg)) => Ok(feedback::erro(MATRICULAS, msg).into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            let acao = format!("/admin/matriculas/editar/{}", id);
            matricula_page(&state.db_pool, admin, acao, form, Some(msg)).await
        }
    }
}

pub async fn handle_excluir_matricula(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let resultado = matricula_service::excluir(&state.db_pool, id).await;
    feedback::concluir(resultado, MATRICULAS, "Matrícula excluída com sucesso!")
}

// ---------------- Pagamentos (admin) ----------------

pub async fn listar_pagamentos(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let pagamentos = pagamento_service::listar_todos(&state.db_pool).await?;
    render(&AdminPagamentosPage { usuario: admin, pagamentos, feedback })
}

async fn pagamento_page(
    db_pool: &SqlitePool,
    admin: User,
    form: PagamentoForm,
    erro: Option<String>,
) -> AppResult<Response> {
    let page = PagamentoFormPage {
        usuario: admin,
        form,
        matriculas: matricula_service::listar_todas(db_pool).await?,
        error_message: erro,
    };
    Ok(render(&page)?.into_response())
}

pub async fn show_cadastrar_pagamento(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> AppResult<Response> {
    pagamento_page(&state.db_pool, admin, PagamentoForm::default(), None).await
}

pub async fn handle_cadastrar_pagamento(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Form(form): Form<PagamentoForm>,
) -> AppResult<Response> {
    match pagamento_service::registar(&state.db_pool, &form).await {
        Ok(_) => Ok(feedback::sucesso(PAGAMENTOS, "Pagamento registrado com sucesso!").into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            pagamento_page(&state.db_pool, admin, form, Some(msg)).await
        }
    }
}

pub async fn show_editar_pagamento(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match pagamento_service::obter(&state.db_pool, id).await {
        Ok(pagamento) => {
            let page = PagamentoEditarPage { usuario: admin, pagamento, error_message: None };
            Ok(render(&page)?.into_response())
        }
        Err(e) => Ok(feedback::redirecionar_erro(PAGAMENTOS, e)?.into_response()),
    }
}

pub async fn handle_editar_pagamento(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Form(form): Form<AlterarPagamentoForm>,
) -> AppResult<Response> {
    match pagamento_service::alterar_valor(&state.db_pool, id, &form).await {
        Ok(()) => Ok(feedback::sucesso(PAGAMENTOS, "Pagamento alterado com sucesso!").into_response()),
        Err(AppError::NotFound(msg)) => Ok(feedback::erro(PAGAMENTOS, msg).into_response()),
        Err(e) => {
            let msg = mensagem_formulario(e)?;
            let pagamento = pagamento_service::obter(&state.db_pool, id).await?;
            let page = PagamentoEditarPage { usuario: admin, pagamento, error_message: Some(msg) };
            Ok(render(&page)?.into_response())
        }
    }
}

pub async fn handle_excluir_pagamento(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let resultado = pagamento_service::excluir(&state.db_pool, id).await;
    feedback::concluir(resultado, PAGAMENTOS, "Pagamento excluído com sucesso!")
}

// ---------------- Área do aluno ----------------

const ALUNO_TURMAS: &str = "/aluno/turmas";

pub async fn aluno_turmas(
    State(state): State<AppState>,
    Extension(CurrentUser(aluno)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let minhas: Vec<i64> = matricula_service::listar_por_aluno(&state.db_pool, aluno.id)
        .await?
        .into_iter()
        .map(|m| m.id_turma)
        .collect();
    let turmas = turma_service::listar(&state.db_pool)
        .await?
        .into_iter()
        .map(|turma| TurmaDisponivel { matriculado: minhas.contains(&turma.id), turma })
        .collect();
    render(&AlunoTurmasPage { usuario: aluno, turmas, feedback })
}

/// Auto-matrícula: mesma admissão do administrador com o aluno da sessão.
pub async fn aluno_matricular(
    State(state): State<AppState>,
    Extension(CurrentUser(aluno)): Extension<CurrentUser>,
    Form(form): Form<AutoMatriculaForm>,
) -> AppResult<Redirect> {
    let form = MatriculaForm {
        id_aluno: aluno.id,
        id_turma: form.id_turma,
        valor_mensalidade: form.valor_mensalidade,
        dia_vencimento: form.dia_vencimento,
    };
    match matricula_service::matricular(&state.db_pool, &form).await {
        Ok(_) => Ok(feedback::sucesso("/aluno/matriculas", "Matrícula realizada com sucesso!")),
        Err(e) => feedback::redirecionar_erro(ALUNO_TURMAS, e),
    }
}

pub async fn aluno_matriculas(
    State(state): State<AppState>,
    Extension(CurrentUser(aluno)): Extension<CurrentUser>,
    Query(feedback): Query<FeedbackParams>,
) -> AppResult<impl IntoResponse> {
    let matriculas = matricula_service::listar_por_aluno(&state.db_pool, aluno.id).await?;
    render(&AlunoMatriculasPage { usuario: aluno, matriculas, feedback })
}

pub async fn aluno_pagamentos(
    State(state): State<AppState>,
    Extension(CurrentUser(aluno)): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let pagamentos = pagamento_service::listar_por_aluno(&state.db_pool, aluno.id).await?;
    render(&AlunoPagamentosPage { usuario: aluno, pagamentos })
}

// ---------------- Área do professor ----------------

pub async fn professor_turmas(
    State(state): State<AppState>,
    Extension(CurrentUser(professor)): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let mut turmas = Vec::new();
    for turma in turma_service::listar_por_professor(&state.db_pool, professor.id).await? {
        let alunos = matricula_service::listar_por_turma(&state.db_pool, turma.id).await?;
        turmas.push(TurmaComAlunos { turma, alunos });
    }
    render(&ProfessorTurmasPage { usuario: professor, turmas })
}

// src/templates.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        catalogo::{Atividade, AtividadeForm, Categoria, CategoriaForm},
        chamado::{Chamado, ChamadoInteracao, PrioridadeChamado, StatusChamado},
        estatisticas::Dashboard,
        matricula::{Matricula, MatriculaForm},
        pagamento::{Pagamento, PagamentoForm},
        turma::{Turma, TurmaForm},
        user::{CadastroForm, DadosUsuario, Perfil, User, UsuarioResumo},
    },
};
use askama::Template;
use axum::response::Html;
use serde::Deserialize;

/// Mensagens de feedback vindas da query string (?success=... / ?error=...).
#[derive(Deserialize, Debug, Default, Clone)]
pub struct FeedbackParams {
    pub success: Option<String>,
    pub error: Option<String>,
}

impl FeedbackParams {
    pub fn erro(mensagem: impl Into<String>) -> Self {
        FeedbackParams { success: None, error: Some(mensagem.into()) }
    }
}

/// Renderiza qualquer página; falhas do Askama viram erro interno.
pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Falha ao renderizar template: {}", e);
        AppError::InternalServerError
    })
}

// --- Páginas públicas ---

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub email: String,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "cadastro.html")]
pub struct CadastroPage {
    pub form: CadastroForm,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "esqueci_senha.html")]
pub struct EsqueciSenhaPage {
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "redefinir_senha.html")]
pub struct RedefinirSenhaPage {
    pub token: String,
    pub error_message: Option<String>,
}

// --- Área do utilizador ---

#[derive(Template)]
#[template(path = "usuario_home.html")]
pub struct UserHomePage {
    pub usuario: User,
    pub chamados_nao_lidos: i64,
    pub chat_nao_lidas: i64,
}

#[derive(Template)]
#[template(path = "perfil.html")]
pub struct PerfilPage {
    pub usuario: User,
    pub dados: DadosUsuario,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "alterar_senha.html")]
pub struct AlterarSenhaPage {
    pub usuario: User,
    pub feedback: FeedbackParams,
}

// --- Administração: utilizadores ---

#[derive(Template)]
#[template(path = "admin/usuarios/listar.html")]
pub struct AdminUsuariosPage {
    pub usuario: User,
    pub usuarios: Vec<User>,
    pub filtro: String,
    pub perfis: [Perfil; 3],
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/usuarios/form.html")]
pub struct AdminUsuarioFormPage {
    pub usuario: User,
    pub titulo: String,
    pub acao: String,
    /// Só o cadastro pede senha inicial.
    pub pede_senha: bool,
    pub dados: DadosUsuario,
    pub perfis: [Perfil; 3],
    pub error_message: Option<String>,
}

// --- Administração: catálogo ---

#[derive(Template)]
#[template(path = "admin/categorias/listar.html")]
pub struct AdminCategoriasPage {
    pub usuario: User,
    pub categorias: Vec<Categoria>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/categorias/form.html")]
pub struct CategoriaFormPage {
    pub usuario: User,
    pub titulo: String,
    pub acao: String,
    pub form: CategoriaForm,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/atividades/listar.html")]
pub struct AdminAtividadesPage {
    pub usuario: User,
    pub atividades: Vec<Atividade>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/atividades/form.html")]
pub struct AtividadeFormPage {
    pub usuario: User,
    pub titulo: String,
    pub acao: String,
    pub form: AtividadeForm,
    pub categorias: Vec<Categoria>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/turmas/listar.html")]
pub struct AdminTurmasPage {
    pub usuario: User,
    pub turmas: Vec<Turma>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/turmas/form.html")]
pub struct TurmaFormPage {
    pub usuario: User,
    pub titulo: String,
    pub acao: String,
    pub form: TurmaForm,
    pub atividades: Vec<Atividade>,
    pub professores: Vec<UsuarioResumo>,
    pub error_message: Option<String>,
}

// --- Administração: matrículas e pagamentos ---

#[derive(Template)]
#[template(path = "admin/matriculas/listar.html")]
pub struct AdminMatriculasPage {
    pub usuario: User,
    pub matriculas: Vec<Matricula>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/matriculas/form.html")]
pub struct MatriculaFormPage {
    pub usuario: User,
    pub titulo: String,
    pub acao: String,
    pub form: MatriculaForm,
    pub alunos: Vec<UsuarioResumo>,
    pub turmas: Vec<Turma>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/pagamentos/listar.html")]
pub struct AdminPagamentosPage {
    pub usuario: User,
    pub pagamentos: Vec<Pagamento>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/pagamentos/form.html")]
pub struct PagamentoFormPage {
    pub usuario: User,
    pub form: PagamentoForm,
    pub matriculas: Vec<Matricula>,
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/pagamentos/editar.html")]
pub struct PagamentoEditarPage {
    pub usuario: User,
    pub pagamento: Pagamento,
    pub error_message: Option<String>,
}

// --- Administração: chamados e estatísticas ---

#[derive(Template)]
#[template(path = "admin/chamados/listar.html")]
pub struct AdminChamadosPage {
    pub usuario: User,
    pub chamados: Vec<Chamado>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/chamados/detalhe.html")]
pub struct AdminChamadoDetalhePage {
    pub usuario: User,
    pub chamado: Chamado,
    pub interacoes: Vec<ChamadoInteracao>,
    pub status: [StatusChamado; 4],
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "admin/estatisticas/dashboard.html")]
pub struct DashboardPage {
    pub usuario: User,
    pub dashboard: Dashboard,
}

// --- Aluno e professor ---

/// Turma vista pelo aluno: se já está matriculado.
pub struct TurmaDisponivel {
    pub turma: Turma,
    pub matriculado: bool,
}

#[derive(Template)]
#[template(path = "aluno/turmas.html")]
pub struct AlunoTurmasPage {
    pub usuario: User,
    pub turmas: Vec<TurmaDisponivel>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "aluno/matriculas.html")]
pub struct AlunoMatriculasPage {
    pub usuario: User,
    pub matriculas: Vec<Matricula>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "aluno/pagamentos.html")]
pub struct AlunoPagamentosPage {
    pub usuario: User,
    pub pagamentos: Vec<Pagamento>,
}

pub struct TurmaComAlunos {
    pub turma: Turma,
    pub alunos: Vec<Matricula>,
}

#[derive(Template)]
#[template(path = "professor/turmas.html")]
pub struct ProfessorTurmasPage {
    pub usuario: User,
    pub turmas: Vec<TurmaComAlunos>,
}

// --- Chamados do utilizador ---

#[derive(Template)]
#[template(path = "chamados/listar.html")]
pub struct ChamadosPage {
    pub usuario: User,
    pub chamados: Vec<Chamado>,
    pub feedback: FeedbackParams,
}

#[derive(Template)]
#[template(path = "chamados/form.html")]
pub struct NovoChamadoPage {
    pub usuario: User,
    pub titulo: String,
    pub descricao: String,
    pub prioridades: [PrioridadeChamado; 4],
    pub error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "chamados/detalhe.html")]
pub struct ChamadoDetalhePage {
    pub usuario: User,
    pub chamado: Chamado,
    pub interacoes: Vec<ChamadoInteracao>,
    pub feedback: FeedbackParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::create_test_pool,
        models::chamado::{NovoChamadoForm, RespostaAdminForm},
        services::{chamado_service, user_service, user_service::tests::criar_usuario},
    };

    #[tokio::test]
    async fn chamado_respondido_destaca_a_resposta_do_admin() {
        let pool = create_test_pool().await;
        let aluno_id = criar_usuario(&pool, "aluno@agendafit.test", Perfil::Aluno).await;
        let admin_id = criar_usuario(&pool, "admin@agendafit.test", Perfil::Admin).await;
        let form = NovoChamadoForm {
            titulo: "Catraca travada".into(),
            descricao: "A catraca não libera o meu acesso.".into(),
            prioridade: PrioridadeChamado::Media,
        };
        let id = chamado_service::abrir(&pool, aluno_id, &form).await.unwrap();
        let aluno = user_service::find_user_by_id(&pool, aluno_id).await.unwrap().unwrap();

        let lista = ChamadosPage {
            usuario: aluno.clone(),
            chamados: chamado_service::listar_do_usuario(&pool, aluno_id).await.unwrap(),
            feedback: FeedbackParams::default(),
        };
        let html = lista.render().unwrap();
        assert!(!html.contains("respondido"));
        assert!(html.contains("/aluno/matriculas"));
        assert!(!html.contains("/admin/usuarios/listar"));

        let resposta = RespostaAdminForm { mensagem: "Já foi liberada.".into(), status: StatusChamado::Resolvido };
        chamado_service::responder_admin(&pool, id, admin_id, &resposta).await.unwrap();

        let lista = ChamadosPage {
            usuario: aluno.clone(),
            chamados: chamado_service::listar_do_usuario(&pool, aluno_id).await.unwrap(),
            feedback: FeedbackParams::default(),
        };
        assert!(lista.render().unwrap().contains("respondido"));

        let detalhe = ChamadoDetalhePage {
            usuario: aluno,
            chamado: chamado_service::obter_do_usuario(&pool, id, aluno_id).await.unwrap(),
            interacoes: chamado_service::interacoes(&pool, id).await.unwrap(),
            feedback: FeedbackParams::default(),
        };
        let html = detalhe.render().unwrap();
        assert_eq!(html.matches("cartao resposta-admin").count(), 1);
    }
}

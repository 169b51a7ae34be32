// src/error.rs
use crate::models::validacao::validation_messages;
use axum::{http::StatusCode, response::Html, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro de variável de ambiente: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("Erro ao processar senha")]
    PasswordHashingError,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    #[error("Erro interno inesperado")]
    InternalServerError,

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Dados inválidos: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("E-mail já cadastrado")]
    EmailAlreadyExists,

    #[error("Nome já cadastrado")]
    NameAlreadyExists,

    #[error("Aluno não encontrado")]
    StudentNotFound,

    #[error("Turma não encontrada")]
    ClassNotFound,

    #[error("Matrícula duplicada")]
    DuplicateEnrollment,

    #[error("Turma sem vagas")]
    ClassFull,

    #[error("Exclusão bloqueada: {0}")]
    DeleteBlocked(String),

    #[error("Limite de requisições excedido")]
    RateLimited,

    #[error("Token de redefinição inválido")]
    InvalidToken,

    #[error("Pedido inválido: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Erros de regra de negócio ou de formulário: o handler mostra a mensagem
    /// e redireciona em vez de devolver uma página de erro.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::EmailAlreadyExists
                | AppError::NameAlreadyExists
                | AppError::StudentNotFound
                | AppError::ClassNotFound
                | AppError::DuplicateEnrollment
                | AppError::ClassFull
                | AppError::DeleteBlocked(_)
                | AppError::InvalidCredentials
                | AppError::InvalidToken
                | AppError::RateLimited
                | AppError::BadRequest(_)
        )
    }

    /// Texto apresentado ao utilizador (flash messages e página de erro).
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(errors) => validation_messages(errors).join(" "),
            AppError::NotFound(msg) => msg.to_string(),
            AppError::EmailAlreadyExists => "Este e-mail já está cadastrado.".to_string(),
            AppError::NameAlreadyExists => "Já existe um registro com este nome.".to_string(),
            AppError::StudentNotFound => "Aluno selecionado não existe.".to_string(),
            AppError::ClassNotFound => "Turma selecionada não existe.".to_string(),
            AppError::DuplicateEnrollment => "Este aluno já está matriculado nesta turma.".to_string(),
            AppError::ClassFull => "Esta turma não possui vagas disponíveis.".to_string(),
            AppError::DeleteBlocked(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::InvalidCredentials => "E-mail ou senha inválidos.".to_string(),
            AppError::InvalidToken => "Link de redefinição inválido ou expirado.".to_string(),
            AppError::RateLimited => {
                "Muitas operações. Aguarde um momento e tente novamente.".to_string()
            }
            AppError::Unauthorized => "É necessário iniciar sessão.".to_string(),
            AppError::Forbidden => "Não tem permissão para aceder a esta página.".to_string(),
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => {
                "Erro ao aceder aos dados.".to_string()
            }
            AppError::EnvVarError(_) | AppError::Config(_) => "Erro de configuração.".to_string(),
            AppError::PasswordHashingError => "Erro ao processar credenciais.".to_string(),
            AppError::SessionError(_) => "Erro na gestão da sua sessão.".to_string(),
            AppError::InternalServerError => "Ocorreu um erro inesperado.".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::InvalidToken => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) | AppError::StudentNotFound | AppError::ClassNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::EmailAlreadyExists
            | AppError::NameAlreadyExists
            | AppError::DuplicateEnrollment
            | AppError::ClassFull
            | AppError::DeleteBlocked(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Mapeia violações de UNIQUE para um erro de domínio; o resto segue como SqlxError.
pub fn map_unique_violation(err: sqlx::Error, domain: AppError) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => domain,
        _ => AppError::SqlxError(err),
    }
}

fn escape_html(texto: &str) -> String {
    texto
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Erro processado: {:?}", self);
        } else {
            tracing::debug!("Erro de pedido: {:?}", self);
        }

        let message = escape_html(&self.user_message());
        (status, Html(format!(r#"
            <!DOCTYPE html><html><head><title>Erro</title><style>body{{font-family:sans-serif;}}</style></head>
            <body><h1>Erro {status_code}</h1><p>{message}</p><a href="javascript:history.back()">Voltar</a></body></html>
         "#, status_code = status.as_u16(), message = message))).into_response()
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;

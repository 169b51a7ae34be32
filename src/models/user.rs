// src/models/user.rs
use crate::models::validacao::{validar_data_nascimento, validar_senha_forte, validar_telefone};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// Perfis de acesso. O valor guardado na DB é o nome por extenso.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Perfil {
    #[serde(rename = "Administrador")]
    #[sqlx(rename = "Administrador")]
    Admin,
    Professor,
    /// Perfil do auto-registo.
    #[default]
    Aluno,
}

impl Perfil {
    pub const TODOS: [Perfil; 3] = [Perfil::Admin, Perfil::Professor, Perfil::Aluno];

    pub fn as_str(&self) -> &'static str {
        match self {
            Perfil::Admin => "Administrador",
            Perfil::Professor => "Professor",
            Perfil::Aluno => "Aluno",
        }
    }

    pub fn from_valor(valor: &str) -> Option<Perfil> {
        Perfil::TODOS.into_iter().find(|p| p.as_str().eq_ignore_ascii_case(valor.trim()))
    }
}

impl fmt::Display for Perfil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Representa um utilizador lido da tabela 'users'
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub password_hash: String,
    pub perfil: Perfil,
    pub data_nascimento: Option<NaiveDate>,
    pub numero_documento: Option<String>,
    pub telefone: Option<String>,
    pub token_redefinicao: Option<String>,
    pub data_token: Option<NaiveDateTime>,
    pub data_cadastro: NaiveDateTime,
    pub data_atualizacao: NaiveDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.perfil == Perfil::Admin
    }

    pub fn is_professor(&self) -> bool {
        self.perfil == Perfil::Professor
    }

    pub fn is_aluno(&self) -> bool {
        self.perfil == Perfil::Aluno
    }

    /// Dados editáveis do utilizador, no formato dos formulários.
    pub fn dados(&self) -> DadosUsuario {
        DadosUsuario {
            nome: self.nome.clone(),
            email: self.email.clone(),
            perfil: self.perfil,
            data_nascimento: self
                .data_nascimento
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            numero_documento: self.numero_documento.clone().unwrap_or_default(),
            telefone: self.telefone.clone().unwrap_or_default(),
        }
    }
}

/// Resumo público usado em listas, pesquisas e JSON do chat (sem hash nem token).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsuarioResumo {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub perfil: Perfil,
}

// Struct para dados do formulário de login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Auto-registo público: cria sempre um Aluno.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validar_confirmacao_senha", skip_on_field_errors = false))]
pub struct CadastroForm {
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub nome: String,
    #[validate(email(message = "E-mail inválido."))]
    pub email: String,
    #[validate(custom(function = "validar_senha_forte"))]
    pub senha: String,
    pub confirmar_senha: String,
}

fn validar_confirmacao_senha(form: &CadastroForm) -> Result<(), validator::ValidationError> {
    if form.senha != form.confirmar_senha {
        return Err(validator::ValidationError::new("senhas_diferentes")
            .with_message("As senhas não coincidem.".into()));
    }
    Ok(())
}

/// Campos comuns de cadastro/edição de utilizador.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DadosUsuario {
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub nome: String,
    #[validate(email(message = "E-mail inválido."))]
    pub email: String,
    #[serde(default)]
    pub perfil: Perfil,
    #[serde(default)]
    #[validate(custom(function = "validar_data_nascimento"))]
    pub data_nascimento: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "O documento deve ter no máximo 20 caracteres."))]
    pub numero_documento: String,
    #[serde(default)]
    #[validate(custom(function = "validar_telefone"))]
    pub telefone: String,
}

impl DadosUsuario {
    /// Converte os campos opcionais do formulário ("" = ausente).
    pub fn data_nascimento(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.data_nascimento.trim(), "%Y-%m-%d").ok()
    }

    pub fn numero_documento(&self) -> Option<&str> {
        Some(self.numero_documento.trim()).filter(|s| !s.is_empty())
    }

    pub fn telefone(&self) -> Option<&str> {
        Some(self.telefone.trim()).filter(|s| !s.is_empty())
    }

    pub fn has_perfil(&self, valor: &str) -> bool {
        self.perfil.as_str() == valor
    }
}

/// Cadastro feito pelo administrador: dados + senha inicial.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NovoUsuarioForm {
    #[validate(nested)]
    #[serde(flatten)]
    pub dados: DadosUsuario,
    #[validate(custom(function = "validar_senha_forte"))]
    pub senha: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AlterarSenhaForm {
    pub senha_atual: String,
    #[validate(custom(function = "validar_senha_forte"))]
    pub nova_senha: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DefinirSenhaForm {
    #[validate(custom(function = "validar_senha_forte"))]
    pub nova_senha: String,
}

#[derive(Debug, Deserialize)]
pub struct EsqueciSenhaForm {
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RedefinirSenhaForm {
    pub token: String,
    #[validate(custom(function = "validar_senha_forte"))]
    pub nova_senha: String,
}

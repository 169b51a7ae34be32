// src/models/chamado.rs
// Chamados de suporte. As interações são filhas: só INSERT/SELECT, apagadas em cascata.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum StatusChamado {
    Aberto,
    #[serde(rename = "Em Análise")]
    #[sqlx(rename = "Em Análise")]
    EmAnalise,
    Resolvido,
    Fechado,
}

impl StatusChamado {
    pub const TODOS: [StatusChamado; 4] = [
        StatusChamado::Aberto,
        StatusChamado::EmAnalise,
        StatusChamado::Resolvido,
        StatusChamado::Fechado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusChamado::Aberto => "Aberto",
            StatusChamado::EmAnalise => "Em Análise",
            StatusChamado::Resolvido => "Resolvido",
            StatusChamado::Fechado => "Fechado",
        }
    }

    /// Resolvido e Fechado registam `data_fechamento`.
    pub fn encerrado(&self) -> bool {
        matches!(self, StatusChamado::Resolvido | StatusChamado::Fechado)
    }
}

impl fmt::Display for StatusChamado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum PrioridadeChamado {
    Baixa,
    #[serde(rename = "Média")]
    #[sqlx(rename = "Média")]
    Media,
    Alta,
    Urgente,
}

impl PrioridadeChamado {
    pub const TODAS: [PrioridadeChamado; 4] = [
        PrioridadeChamado::Baixa,
        PrioridadeChamado::Media,
        PrioridadeChamado::Alta,
        PrioridadeChamado::Urgente,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrioridadeChamado::Baixa => "Baixa",
            PrioridadeChamado::Media => "Média",
            PrioridadeChamado::Alta => "Alta",
            PrioridadeChamado::Urgente => "Urgente",
        }
    }
}

impl fmt::Display for PrioridadeChamado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TipoInteracao {
    Abertura,
    #[sqlx(rename = "Resposta do Usuário")]
    RespostaUsuario,
    #[sqlx(rename = "Resposta do Administrador")]
    RespostaAdmin,
}

impl TipoInteracao {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoInteracao::Abertura => "Abertura",
            TipoInteracao::RespostaUsuario => "Resposta do Usuário",
            TipoInteracao::RespostaAdmin => "Resposta do Administrador",
        }
    }
}

impl fmt::Display for TipoInteracao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chamado com dados do autor e contagem de mensagens não lidas pelo leitor.
#[derive(Debug, Clone, FromRow)]
pub struct Chamado {
    pub id: i64,
    pub titulo: String,
    pub status: StatusChamado,
    pub prioridade: PrioridadeChamado,
    pub usuario_id: i64,
    pub data_cadastro: NaiveDateTime,
    pub data_atualizacao: NaiveDateTime,
    pub data_fechamento: Option<NaiveDateTime>,
    pub usuario_nome: String,
    pub usuario_email: String,
    pub mensagens_nao_lidas: i64,
    pub tem_resposta_admin: bool,
}

impl Chamado {
    pub fn data_formatada(&self) -> String {
        self.data_cadastro.format("%d/%m/%Y %H:%M").to_string()
    }

    pub fn fechado(&self) -> bool {
        self.status == StatusChamado::Fechado
    }

    pub fn encerrado(&self) -> bool {
        self.status.encerrado()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChamadoInteracao {
    pub id: i64,
    pub chamado_id: i64,
    pub usuario_id: i64,
    pub mensagem: String,
    pub tipo: TipoInteracao,
    pub data_interacao: NaiveDateTime,
    pub status_resultante: Option<StatusChamado>,
    pub data_leitura: Option<NaiveDateTime>,
    pub usuario_nome: String,
}

impl ChamadoInteracao {
    pub fn data_formatada(&self) -> String {
        self.data_interacao.format("%d/%m/%Y %H:%M").to_string()
    }

    pub fn do_admin(&self) -> bool {
        self.tipo == TipoInteracao::RespostaAdmin
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NovoChamadoForm {
    #[validate(length(min = 5, max = 200, message = "O título deve ter entre 5 e 200 caracteres."))]
    pub titulo: String,
    #[validate(length(min = 10, max = 2000, message = "A descrição deve ter entre 10 e 2000 caracteres."))]
    pub descricao: String,
    pub prioridade: PrioridadeChamado,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RespostaChamadoForm {
    #[validate(length(min = 1, max = 2000, message = "A mensagem deve ter entre 1 e 2000 caracteres."))]
    pub mensagem: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RespostaAdminForm {
    #[validate(length(min = 1, max = 2000, message = "A mensagem deve ter entre 1 e 2000 caracteres."))]
    pub mensagem: String,
    pub status: StatusChamado,
}

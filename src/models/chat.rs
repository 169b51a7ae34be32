// src/models/chat.rs
// Subsistema de chat: salas 1-para-1, participantes e mensagens.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMensagem {
    pub id: i64,
    pub sala_id: String,
    pub usuario_id: i64,
    pub mensagem: String,
    pub data_envio: NaiveDateTime,
    pub lida_em: Option<NaiveDateTime>,
}

/// Linha "achatada" da query de conversas; convertida em `ConversaResumo`.
#[derive(Debug, FromRow)]
pub struct ConversaRow {
    pub sala_id: String,
    pub ultima_atividade: NaiveDateTime,
    pub outro_id: i64,
    pub outro_nome: String,
    pub outro_email: String,
    pub ultima_mensagem: Option<String>,
    pub ultima_data: Option<NaiveDateTime>,
    pub ultima_autor: Option<i64>,
    pub nao_lidas: i64,
}

#[derive(Debug, Serialize)]
pub struct OutroUsuario {
    pub id: i64,
    pub nome: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UltimaMensagem {
    pub mensagem: String,
    pub data_envio: NaiveDateTime,
    pub usuario_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ConversaResumo {
    pub sala_id: String,
    pub outro_usuario: OutroUsuario,
    pub ultima_mensagem: Option<UltimaMensagem>,
    pub nao_lidas: i64,
    pub ultima_atividade: NaiveDateTime,
}

impl From<ConversaRow> for ConversaResumo {
    fn from(row: ConversaRow) -> Self {
        let ultima_mensagem = match (row.ultima_mensagem, row.ultima_data, row.ultima_autor) {
            (Some(mensagem), Some(data_envio), Some(usuario_id)) => {
                Some(UltimaMensagem { mensagem, data_envio, usuario_id })
            }
            _ => None,
        };
        ConversaResumo {
            sala_id: row.sala_id,
            outro_usuario: OutroUsuario {
                id: row.outro_id,
                nome: row.outro_nome,
                email: row.outro_email,
            },
            ultima_mensagem,
            nao_lidas: row.nao_lidas,
            ultima_atividade: row.ultima_atividade,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CriarSalaPayload {
    #[validate(range(min = 1, message = "ID do usuário deve ser um número positivo."))]
    pub outro_usuario_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EnviarMensagemPayload {
    #[validate(length(min = 1, message = "Sala inválida."))]
    pub sala_id: String,
    #[validate(length(min = 1, max = 5000, message = "A mensagem deve ter entre 1 e 5000 caracteres."))]
    pub mensagem: String,
}

#[derive(Debug, Deserialize)]
pub struct PaginacaoQuery {
    pub limite: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BuscaQuery {
    #[serde(default)]
    pub q: String,
}

/// Evento enviado pelo WebSocket aos participantes.
#[derive(Debug, Serialize)]
pub struct ChatEvento<'a> {
    pub tipo: &'static str,
    pub mensagem: &'a ChatMensagem,
}

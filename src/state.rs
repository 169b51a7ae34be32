// src/state.rs
use crate::{config::Config, rate_limit::RateLimiter};
use axum::extract::ws::Message;
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

// Tipo para o 'sender' de uma conexão WebSocket individual
type WsTx = mpsc::Sender<Message>;

/// Conexões WebSocket do chat: id da conexão -> (utilizador, canal de envio).
/// Um utilizador pode ter várias abas abertas.
#[derive(Debug, Clone, Default)]
pub struct ChatWsState {
    pub connections: Arc<Mutex<HashMap<Uuid, (i64, WsTx)>>>,
}

impl ChatWsState {
    pub async fn registar(&self, usuario_id: i64, tx: WsTx) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.connections.lock().await.insert(conn_id, (usuario_id, tx));
        conn_id
    }

    pub async fn remover(&self, conn_id: &Uuid) {
        self.connections.lock().await.remove(conn_id);
    }

    /// Envia o texto para todas as conexões dos utilizadores indicados.
    /// Devolve quantas conexões aceitaram a mensagem.
    pub async fn enviar_para(&self, usuarios: &[i64], texto: String) -> usize {
        let connections = self.connections.lock().await;
        let message = Message::Text(texto.into());
        let mut entregues = 0;
        for (usuario_id, tx) in connections.values() {
            if usuarios.contains(usuario_id) && tx.try_send(message.clone()).is_ok() {
                entregues += 1;
            }
        }
        entregues
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub chat_state: ChatWsState,
    /// Operações de escrita na área administrativa.
    pub limitador_admin: RateLimiter,
    pub limitador_login: RateLimiter,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        AppState {
            db_pool,
            limitador_admin: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            limitador_login: RateLimiter::new(
                config.login_rate_limit_max,
                config.login_rate_limit_window,
            ),
            config: Arc::new(config),
            chat_state: ChatWsState::default(),
        }
    }
}

// Permite extrair o pool da DB diretamente
impl axum::extract::FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> SqlitePool {
        state.db_pool.clone()
    }
}

impl axum::extract::FromRef<AppState> for ChatWsState {
    fn from_ref(state: &AppState) -> ChatWsState {
        state.chat_state.clone()
    }
}

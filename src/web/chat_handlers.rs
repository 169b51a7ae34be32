// src/web/chat_handlers.rs
// API JSON do chat e WebSocket de notificações.
use crate::{
    error::AppError,
    models::chat::{BuscaQuery, ChatEvento, CriarSalaPayload, EnviarMensagemPayload, PaginacaoQuery},
    services::{chat_service, user_service},
    state::AppState,
    web::mw_auth::CurrentUser,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, Query, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use validator::Validate;

/// Erro da API: mesmo código HTTP do `AppError`, corpo `{"detail": ...}`.
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!("Erro na API do chat: {:?}", self.0);
        } else {
            tracing::debug!("Pedido recusado na API do chat: {:?}", self.0);
        }
        (status, Json(json!({ "detail": self.0.user_message() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// GET /chat/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

// POST /chat/salas
pub async fn criar_sala(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CriarSalaPayload>,
) -> ApiResult<Value> {
    payload.validate().map_err(AppError::from)?;
    let sala_id = chat_service::obter_ou_criar_sala(&state.db_pool, user.id, payload.outro_usuario_id).await?;
    Ok(Json(json!({ "sala_id": sala_id })))
}

// GET /chat/conversas
pub async fn listar_conversas(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Value> {
    let conversas = chat_service::listar_conversas(&state.db_pool, user.id).await?;
    Ok(Json(json!({ "conversas": conversas })))
}

// GET /chat/mensagens/{sala_id}
pub async fn listar_mensagens(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(sala_id): Path<String>,
    Query(paginacao): Query<PaginacaoQuery>,
) -> ApiResult<Value> {
    let mensagens =
        chat_service::listar_mensagens(&state.db_pool, &sala_id, user.id, paginacao.limite, paginacao.offset)
            .await?;
    Ok(Json(json!({ "mensagens": mensagens })))
}

// POST /chat/mensagens
pub async fn enviar_mensagem(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<EnviarMensagemPayload>,
) -> ApiResult<Value> {
    let (mensagem, destinatarios) = chat_service::enviar_mensagem(&state.db_pool, user.id, &payload).await?;

    let evento = ChatEvento { tipo: "nova_mensagem", mensagem: &mensagem };
    match serde_json::to_string(&evento) {
        Ok(texto) => {
            let entregues = state.chat_state.enviar_para(&destinatarios, texto).await;
            tracing::debug!("Mensagem {} entregue a {} conexão(ões).", mensagem.id, entregues);
        }
        Err(e) => tracing::error!("Erro ao serializar evento do chat: {:?}", e),
    }
    Ok(Json(json!({ "mensagem": mensagem })))
}

// POST /chat/mensagens/lidas/{sala_id}
pub async fn marcar_como_lidas(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(sala_id): Path<String>,
) -> ApiResult<Value> {
    let marcadas = chat_service::marcar_como_lidas(&state.db_pool, &sala_id, user.id).await?;
    Ok(Json(json!({ "marcadas": marcadas })))
}

// GET /chat/mensagens/nao-lidas/total
pub async fn total_nao_lidas(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Value> {
    let total = chat_service::contar_nao_lidas(&state.db_pool, user.id).await?;
    Ok(Json(json!({ "total": total })))
}

// GET /chat/usuarios/buscar?q=
pub async fn buscar_usuarios(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(busca): Query<BuscaQuery>,
) -> ApiResult<Value> {
    let usuarios = user_service::buscar_para_chat(&state.db_pool, &busca.q, user.id).await?;
    Ok(Json(json!({ "usuarios": usuarios })))
}

// --- WebSocket (GET /chat/ws) ---

pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    tracing::info!("Upgrade WebSocket do chat para {}", user.id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user.id))
}

async fn handle_socket(socket: WebSocket, state: AppState, usuario_id: i64) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // As mensagens chegam pelo canal e só esta task escreve no socket
    let (tx, mut rx) = mpsc::channel::<Message>(32);
    let conn_id = state.chat_state.registar(usuario_id, tx).await;
    tracing::info!("🔌 Nova conexão WS do chat: {} (utilizador {})", conn_id, usuario_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!("Falha ao enviar msg WS para {}, terminando send_task.", conn_id);
                break;
            }
        }
    });

    // O cliente não envia comandos; só interessa saber quando fecha
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Close(_) => {
                    tracing::debug!("Cliente {} enviou Close frame.", conn_id);
                    break;
                }
                other => tracing::trace!("Ignorando msg WS de {}: {:?}", conn_id, other),
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.chat_state.remover(&conn_id).await;
    tracing::info!("🔌 Conexão WS do chat {} fechada.", conn_id);
}

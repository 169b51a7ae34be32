// src/services/chat_service.rs
use crate::{
    error::{AppError, AppResult},
    models::chat::{ChatMensagem, ConversaResumo, ConversaRow, EnviarMensagemPayload},
    services::user_service,
};
use sqlx::SqlitePool;
use validator::Validate;

pub const LIMITE_PADRAO: i64 = 50;
const LIMITE_MAXIMO: i64 = 100;

/// Id da sala entre dois utilizadores: `"{menor}_{maior}"`.
pub fn sala_id(a: i64, b: i64) -> String {
    format!("{}_{}", a.min(b), a.max(b))
}

/// Cria (ou devolve) a sala entre os dois utilizadores.
pub async fn obter_ou_criar_sala(db_pool: &SqlitePool, usuario_id: i64, outro_id: i64) -> AppResult<String> {
    if usuario_id == outro_id {
        return Err(AppError::BadRequest("Não é possível conversar consigo mesmo.".into()));
    }
    if user_service::find_user_by_id(db_pool, outro_id).await?.is_none() {
        return Err(AppError::NotFound("Usuário não encontrado."));
    }

    let sala = sala_id(usuario_id, outro_id);
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT OR IGNORE INTO chat_salas (id) VALUES (?1)")
        .bind(&sala)
        .execute(&mut *tx)
        .await?;
    for participante in [usuario_id, outro_id] {
        sqlx::query("INSERT OR IGNORE INTO chat_participantes (sala_id, usuario_id) VALUES (?1, ?2)")
            .bind(&sala)
            .bind(participante)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::debug!("Sala de chat {} pronta.", sala);
    Ok(sala)
}

pub async fn participantes(db_pool: &SqlitePool, sala_id: &str) -> AppResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT usuario_id FROM chat_participantes WHERE sala_id = ?1")
        .bind(sala_id)
        .fetch_all(db_pool)
        .await?;
    Ok(ids)
}

async fn exigir_participante(db_pool: &SqlitePool, sala_id: &str, usuario_id: i64) -> AppResult<Vec<i64>> {
    let ids = participantes(db_pool, sala_id).await?;
    if !ids.contains(&usuario_id) {
        tracing::warn!("Utilizador {} não participa na sala {}.", usuario_id, sala_id);
        return Err(AppError::Forbidden);
    }
    Ok(ids)
}

/// Conversas do utilizador, da atividade mais recente para a mais antiga.
pub async fn listar_conversas(db_pool: &SqlitePool, usuario_id: i64) -> AppResult<Vec<ConversaResumo>> {
    let rows = sqlx::query_as::<_, ConversaRow>(
        r#"
        SELECT s.id AS sala_id, s.ultima_atividade,
               u.id AS outro_id, u.nome AS outro_nome, u.email AS outro_email,
               ult.mensagem AS ultima_mensagem, ult.data_envio AS ultima_data, ult.usuario_id AS ultima_autor,
               (SELECT COUNT(*) FROM chat_mensagens m
                 WHERE m.sala_id = s.id AND m.usuario_id != ?1 AND m.lida_em IS NULL) AS nao_lidas
        FROM chat_participantes eu
        JOIN chat_salas s ON s.id = eu.sala_id
        JOIN chat_participantes outro ON outro.sala_id = s.id AND outro.usuario_id != ?1
        JOIN users u ON u.id = outro.usuario_id
        LEFT JOIN chat_mensagens ult ON ult.id = (
            SELECT m2.id FROM chat_mensagens m2 WHERE m2.sala_id = s.id
            ORDER BY m2.data_envio DESC, m2.id DESC LIMIT 1
        )
        WHERE eu.usuario_id = ?1
        ORDER BY s.ultima_atividade DESC, s.id ASC
        "#,
    )
    .bind(usuario_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows.into_iter().map(ConversaResumo::from).collect())
}

/// Mensagens da sala em ordem cronológica; `offset` conta a partir das mais recentes.
pub async fn listar_mensagens(
    db_pool: &SqlitePool,
    sala_id: &str,
    usuario_id: i64,
    limite: Option<i64>,
    offset: Option<i64>,
) -> AppResult<Vec<ChatMensagem>> {
    exigir_participante(db_pool, sala_id, usuario_id).await?;
    let limite = limite.unwrap_or(LIMITE_PADRAO).clamp(1, LIMITE_MAXIMO);
    let offset = offset.unwrap_or(0).max(0);

    let mut mensagens = sqlx::query_as::<_, ChatMensagem>(
        r#"
        SELECT id, sala_id, usuario_id, mensagem, data_envio, lida_em
        FROM chat_mensagens
        WHERE sala_id = ?1
        ORDER BY data_envio DESC, id DESC
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(sala_id)
    .bind(limite)
    .bind(offset)
    .fetch_all(db_pool)
    .await?;
    mensagens.reverse();
    Ok(mensagens)
}

/// Grava a mensagem e devolve-a com os participantes a notificar (exceto o autor).
pub async fn enviar_mensagem(
    db_pool: &SqlitePool,
    usuario_id: i64,
    payload: &EnviarMensagemPayload,
) -> AppResult<(ChatMensagem, Vec<i64>)> {
    payload.validate()?;
    let mensagem_texto = payload.mensagem.trim();
    if mensagem_texto.is_empty() {
        return Err(AppError::BadRequest("A mensagem não pode estar vazia.".into()));
    }
    let ids = exigir_participante(db_pool, &payload.sala_id, usuario_id).await?;

    let mut tx = db_pool.begin().await?;
    let id = sqlx::query("INSERT INTO chat_mensagens (sala_id, usuario_id, mensagem) VALUES (?1, ?2, ?3)")
        .bind(&payload.sala_id)
        .bind(usuario_id)
        .bind(mensagem_texto)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
    sqlx::query("UPDATE chat_salas SET ultima_atividade = CURRENT_TIMESTAMP WHERE id = ?1")
        .bind(&payload.sala_id)
        .execute(&mut *tx)
        .await?;
    let mensagem = sqlx::query_as::<_, ChatMensagem>(
        "SELECT id, sala_id, usuario_id, mensagem, data_envio, lida_em FROM chat_mensagens WHERE id = ?1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    let destinatarios = ids.into_iter().filter(|&id| id != usuario_id).collect();
    Ok((mensagem, destinatarios))
}

/// Marca como lidas as mensagens dos outros participantes.
pub async fn marcar_como_lidas(db_pool: &SqlitePool, sala_id: &str, usuario_id: i64) -> AppResult<u64> {
    exigir_participante(db_pool, sala_id, usuario_id).await?;
    let mut tx = db_pool.begin().await?;
    let marcadas = sqlx::query(
        "UPDATE chat_mensagens SET lida_em = CURRENT_TIMESTAMP \
         WHERE sala_id = ?1 AND usuario_id != ?2 AND lida_em IS NULL",
    )
    .bind(sala_id)
    .bind(usuario_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    sqlx::query("UPDATE chat_participantes SET ultima_leitura = CURRENT_TIMESTAMP WHERE sala_id = ?1 AND usuario_id = ?2")
        .bind(sala_id)
        .bind(usuario_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(marcadas)
}

pub async fn contar_nao_lidas(db_pool: &SqlitePool, usuario_id: i64) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM chat_mensagens m
        JOIN chat_participantes p ON p.sala_id = m.sala_id AND p.usuario_id = ?1
        WHERE m.usuario_id != ?1 AND m.lida_em IS NULL
        "#,
    )
    .bind(usuario_id)
    .fetch_one(db_pool)
    .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::create_test_pool, models::user::Perfil, services::user_service::tests::criar_usuario};

    fn payload(sala: &str, texto: &str) -> EnviarMensagemPayload {
        EnviarMensagemPayload { sala_id: sala.into(), mensagem: texto.into() }
    }

    #[test]
    fn id_da_sala_nao_depende_da_ordem() {
        assert_eq!(sala_id(7, 3), "3_7");
        assert_eq!(sala_id(3, 7), "3_7");
    }

    #[tokio::test]
    async fn criar_sala_duas_vezes_devolve_a_mesma() {
        let pool = create_test_pool().await;
        let a = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let b = criar_usuario(&pool, "b@agendafit.test", Perfil::Professor).await;

        let s1 = obter_ou_criar_sala(&pool, a, b).await.unwrap();
        let s2 = obter_ou_criar_sala(&pool, b, a).await.unwrap();
        assert_eq!(s1, s2);
        assert_eq!(participantes(&pool, &s1).await.unwrap().len(), 2);

        assert!(matches!(obter_ou_criar_sala(&pool, a, a).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn mensagens_e_contagem_de_nao_lidas() {
        let pool = create_test_pool().await;
        let a = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let b = criar_usuario(&pool, "b@agendafit.test", Perfil::Professor).await;
        let sala = obter_ou_criar_sala(&pool, a, b).await.unwrap();

        let (msg, destinatarios) = enviar_mensagem(&pool, a, &payload(&sala, "Olá!")).await.unwrap();
        assert_eq!(msg.mensagem, "Olá!");
        assert_eq!(destinatarios, vec![b]);
        enviar_mensagem(&pool, a, &payload(&sala, "Tudo bem?")).await.unwrap();

        assert_eq!(contar_nao_lidas(&pool, b).await.unwrap(), 2);
        assert_eq!(contar_nao_lidas(&pool, a).await.unwrap(), 0);

        let conversas = listar_conversas(&pool, b).await.unwrap();
        assert_eq!(conversas.len(), 1);
        assert_eq!(conversas[0].outro_usuario.id, a);
        assert_eq!(conversas[0].nao_lidas, 2);
        assert_eq!(conversas[0].ultima_mensagem.as_ref().map(|m| m.mensagem.as_str()), Some("Tudo bem?"));

        let mensagens = listar_mensagens(&pool, &sala, b, None, None).await.unwrap();
        assert_eq!(mensagens.iter().map(|m| m.mensagem.as_str()).collect::<Vec<_>>(), ["Olá!", "Tudo bem?"]);

        assert_eq!(marcar_como_lidas(&pool, &sala, b).await.unwrap(), 2);
        assert_eq!(contar_nao_lidas(&pool, b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn quem_nao_participa_nao_le_nem_escreve() {
        let pool = create_test_pool().await;
        let a = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let b = criar_usuario(&pool, "b@agendafit.test", Perfil::Aluno).await;
        let intruso = criar_usuario(&pool, "c@agendafit.test", Perfil::Aluno).await;
        let sala = obter_ou_criar_sala(&pool, a, b).await.unwrap();

        assert!(matches!(
            listar_mensagens(&pool, &sala, intruso, None, None).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            enviar_mensagem(&pool, intruso, &payload(&sala, "oi")).await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn mensagem_vazia_e_recusada() {
        let pool = create_test_pool().await;
        let a = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let b = criar_usuario(&pool, "b@agendafit.test", Perfil::Aluno).await;
        let sala = obter_ou_criar_sala(&pool, a, b).await.unwrap();
        assert!(enviar_mensagem(&pool, a, &payload(&sala, "")).await.is_err());
        assert!(enviar_mensagem(&pool, a, &payload(&sala, "   ")).await.is_err());
    }
}

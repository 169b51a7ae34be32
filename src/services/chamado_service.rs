// src/services/chamado_service.rs
use crate::{
    error::{AppError, AppResult},
    models::chamado::{
        Chamado, ChamadoInteracao, NovoChamadoForm, RespostaAdminForm, RespostaChamadoForm,
        StatusChamado, TipoInteracao,
    },
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use validator::Validate;

const NAO_ENCONTRADO: &str = "Chamado não encontrado.";

/// `{nao_lidas}` é substituído pela condição de "mensagem da outra parte".
const SELECT_CHAMADO: &str = r#"
    SELECT c.id, c.titulo, c.status, c.prioridade, c.usuario_id, c.data_cadastro,
           c.data_atualizacao, c.data_fechamento,
           u.nome AS usuario_nome,
           u.email AS usuario_email,
           (SELECT COUNT(*) FROM chamado_interacoes ci
             WHERE ci.chamado_id = c.id AND ci.data_leitura IS NULL AND {nao_lidas}) AS mensagens_nao_lidas,
           EXISTS (SELECT 1 FROM chamado_interacoes ci
             WHERE ci.chamado_id = c.id AND ci.tipo = 'Resposta do Administrador') AS tem_resposta_admin
    FROM chamados c
    JOIN users u ON u.id = c.usuario_id
"#;

// Para o dono são novas as respostas dos outros; para o admin, as do dono.
const NAO_LIDAS_DONO: &str = "ci.usuario_id != c.usuario_id";
const NAO_LIDAS_ADMIN: &str = "ci.usuario_id = c.usuario_id";

fn select_chamado(nao_lidas: &str) -> String {
    SELECT_CHAMADO.replace("{nao_lidas}", nao_lidas)
}

pub async fn abrir(db_pool: &SqlitePool, usuario_id: i64, form: &NovoChamadoForm) -> AppResult<i64> {
    form.validate()?;
    let mut tx = db_pool.begin().await?;

    let id = sqlx::query("INSERT INTO chamados (titulo, status, prioridade, usuario_id) VALUES (?1, ?2, ?3, ?4)")
        .bind(form.titulo.trim())
        .bind(StatusChamado::Aberto)
        .bind(form.prioridade)
        .bind(usuario_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    inserir_interacao(&mut tx, id, usuario_id, form.descricao.trim(), TipoInteracao::Abertura, None).await?;
    tx.commit().await?;

    tracing::info!("🎫 Chamado {} aberto pelo utilizador {} ({}).", id, usuario_id, form.prioridade);
    Ok(id)
}

async fn inserir_interacao(
    tx: &mut Transaction<'_, Sqlite>,
    chamado_id: i64,
    usuario_id: i64,
    mensagem: &str,
    tipo: TipoInteracao,
    status_resultante: Option<StatusChamado>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO chamado_interacoes (chamado_id, usuario_id, mensagem, tipo, status_resultante)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(chamado_id)
    .bind(usuario_id)
    .bind(mensagem)
    .bind(tipo)
    .bind(status_resultante)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn atualizar_status(
    tx: &mut Transaction<'_, Sqlite>,
    chamado_id: i64,
    status: StatusChamado,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE chamados
        SET status = ?1,
            data_fechamento = CASE WHEN ?2 THEN COALESCE(data_fechamento, CURRENT_TIMESTAMP) ELSE NULL END,
            data_atualizacao = CURRENT_TIMESTAMP
        WHERE id = ?3
        "#,
    )
    .bind(status)
    .bind(status.encerrado())
    .bind(chamado_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn listar_do_usuario(db_pool: &SqlitePool, usuario_id: i64) -> AppResult<Vec<Chamado>> {
    let chamados = sqlx::query_as::<_, Chamado>(&format!(
        "{} WHERE c.usuario_id = ?1 ORDER BY c.data_atualizacao DESC, c.id DESC",
        select_chamado(NAO_LIDAS_DONO)
    ))
    .bind(usuario_id)
    .fetch_all(db_pool)
    .await?;
    Ok(chamados)
}

pub async fn listar_todos(db_pool: &SqlitePool) -> AppResult<Vec<Chamado>> {
    let chamados = sqlx::query_as::<_, Chamado>(&format!(
        "{} ORDER BY c.data_atualizacao DESC, c.id DESC",
        select_chamado(NAO_LIDAS_ADMIN)
    ))
    .fetch_all(db_pool)
    .await?;
    Ok(chamados)
}

async fn obter_com(db_pool: &SqlitePool, id: i64, nao_lidas: &str) -> AppResult<Chamado> {
    sqlx::query_as::<_, Chamado>(&format!("{} WHERE c.id = ?1", select_chamado(nao_lidas)))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound(NAO_ENCONTRADO))
}

pub async fn obter(db_pool: &SqlitePool, id: i64) -> AppResult<Chamado> {
    obter_com(db_pool, id, NAO_LIDAS_ADMIN).await
}

/// Chamado visto pelo dono; de outro utilizador responde como inexistente.
pub async fn obter_do_usuario(db_pool: &SqlitePool, id: i64, usuario_id: i64) -> AppResult<Chamado> {
    let chamado = obter_com(db_pool, id, NAO_LIDAS_DONO).await?;
    if chamado.usuario_id != usuario_id {
        tracing::warn!("Utilizador {} tentou aceder ao chamado {} de outro.", usuario_id, id);
        return Err(AppError::NotFound(NAO_ENCONTRADO));
    }
    Ok(chamado)
}

pub async fn interacoes(db_pool: &SqlitePool, chamado_id: i64) -> AppResult<Vec<ChamadoInteracao>> {
    let interacoes = sqlx::query_as::<_, ChamadoInteracao>(
        r#"
        SELECT ci.id, ci.chamado_id, ci.usuario_id, ci.mensagem, ci.tipo, ci.data_interacao,
               ci.status_resultante, ci.data_leitura, u.nome AS usuario_nome
        FROM chamado_interacoes ci
        JOIN users u ON u.id = ci.usuario_id
        WHERE ci.chamado_id = ?1
        ORDER BY ci.data_interacao ASC, ci.id ASC
        "#,
    )
    .bind(chamado_id)
    .fetch_all(db_pool)
    .await?;
    Ok(interacoes)
}

/// O dono leu as respostas dos outros.
pub async fn marcar_lidas_pelo_dono(db_pool: &SqlitePool, chamado: &Chamado) -> AppResult<u64> {
    marcar_lidas(db_pool, chamado, "usuario_id != ?2").await
}

/// O administrador leu as mensagens do dono.
pub async fn marcar_lidas_pelo_admin(db_pool: &SqlitePool, chamado: &Chamado) -> AppResult<u64> {
    marcar_lidas(db_pool, chamado, "usuario_id = ?2").await
}

async fn marcar_lidas(db_pool: &SqlitePool, chamado: &Chamado, autor: &str) -> AppResult<u64> {
    let rows = sqlx::query(&format!(
        "UPDATE chamado_interacoes SET data_leitura = CURRENT_TIMESTAMP \
         WHERE chamado_id = ?1 AND data_leitura IS NULL AND {autor}"
    ))
    .bind(chamado.id)
    .bind(chamado.usuario_id)
    .execute(db_pool)
    .await?
    .rows_affected();
    Ok(rows)
}

/// Resposta do dono. Fechado não aceita respostas; Resolvido volta a Aberto.
pub async fn responder_usuario(
    db_pool: &SqlitePool,
    chamado_id: i64,
    usuario_id: i64,
    form: &RespostaChamadoForm,
) -> AppResult<()> {
    form.validate()?;
    let chamado = obter_do_usuario(db_pool, chamado_id, usuario_id).await?;
    if chamado.fechado() {
        return Err(AppError::BadRequest(
            "Este chamado está fechado e não aceita novas respostas.".into(),
        ));
    }

    let reaberto = chamado.status == StatusChamado::Resolvido;
    let mut tx = db_pool.begin().await?;
    inserir_interacao(
        &mut tx,
        chamado_id,
        usuario_id,
        form.mensagem.trim(),
        TipoInteracao::RespostaUsuario,
        reaberto.then_some(StatusChamado::Aberto),
    )
    .await?;
    let status = if reaberto { StatusChamado::Aberto } else { chamado.status };
    atualizar_status(&mut tx, chamado_id, status).await?;
    tx.commit().await?;

    tracing::info!("Chamado {}: resposta do utilizador {}.", chamado_id, usuario_id);
    Ok(())
}

/// Resposta do administrador com o novo status.
pub async fn responder_admin(
    db_pool: &SqlitePool,
    chamado_id: i64,
    admin_id: i64,
    form: &RespostaAdminForm,
) -> AppResult<()> {
    form.validate()?;
    obter(db_pool, chamado_id).await?;

    let mut tx = db_pool.begin().await?;
    inserir_interacao(
        &mut tx,
        chamado_id,
        admin_id,
        form.mensagem.trim(),
        TipoInteracao::RespostaAdmin,
        Some(form.status),
    )
    .await?;
    atualizar_status(&mut tx, chamado_id, form.status).await?;
    tx.commit().await?;

    tracing::info!("Chamado {}: resposta do admin {} ({}).", chamado_id, admin_id, form.status);
    Ok(())
}

/// Reabre um chamado resolvido ou fechado.
pub async fn reabrir(db_pool: &SqlitePool, chamado_id: i64) -> AppResult<()> {
    let chamado = obter(db_pool, chamado_id).await?;
    if !chamado.encerrado() {
        return Err(AppError::BadRequest("Apenas chamados resolvidos ou fechados podem ser reabertos.".into()));
    }
    let mut tx = db_pool.begin().await?;
    atualizar_status(&mut tx, chamado_id, StatusChamado::Aberto).await?;
    tx.commit().await?;
    tracing::info!("Chamado {} reaberto.", chamado_id);
    Ok(())
}

/// Apaga o chamado; as interações vão em cascata.
pub async fn excluir(db_pool: &SqlitePool, chamado_id: i64) -> AppResult<()> {
    let rows = sqlx::query("DELETE FROM chamados WHERE id = ?1")
        .bind(chamado_id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(AppError::NotFound(NAO_ENCONTRADO));
    }
    tracing::info!("Chamado {} excluído.", chamado_id);
    Ok(())
}

/// Total de respostas por ler nos chamados do utilizador.
pub async fn contar_nao_lidas_do_usuario(db_pool: &SqlitePool, usuario_id: i64) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM chamado_interacoes ci
        JOIN chamados c ON c.id = ci.chamado_id
        WHERE c.usuario_id = ?1 AND ci.usuario_id != ?1 AND ci.data_leitura IS NULL
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
    use crate::{
        db::create_test_pool, models::chamado::PrioridadeChamado, models::user::Perfil,
        services::user_service::tests::criar_usuario,
    };

    fn novo() -> NovoChamadoForm {
        NovoChamadoForm {
            titulo: "Erro no pagamento".into(),
            descricao: "O pagamento de março não aparece.".into(),
            prioridade: PrioridadeChamado::Alta,
        }
    }

    fn resposta_admin(status: StatusChamado) -> RespostaAdminForm {
        RespostaAdminForm { mensagem: "Já corrigimos.".into(), status }
    }

    #[tokio::test]
    async fn abrir_cria_interacao_de_abertura() {
        let pool = create_test_pool().await;
        let aluno = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let id = abrir(&pool, aluno, &novo()).await.unwrap();

        let chamado = obter_do_usuario(&pool, id, aluno).await.unwrap();
        assert_eq!(chamado.status, StatusChamado::Aberto);
        assert!(!chamado.tem_resposta_admin);
        let historico = interacoes(&pool, id).await.unwrap();
        assert_eq!(historico.len(), 1);
        assert_eq!(historico[0].tipo, TipoInteracao::Abertura);
    }

    #[tokio::test]
    async fn outro_utilizador_nao_ve_o_chamado() {
        let pool = create_test_pool().await;
        let dono = criar_usuario(&pool, "dono@agendafit.test", Perfil::Aluno).await;
        let outro = criar_usuario(&pool, "outro@agendafit.test", Perfil::Aluno).await;
        let id = abrir(&pool, dono, &novo()).await.unwrap();
        assert!(matches!(obter_do_usuario(&pool, id, outro).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn resposta_do_admin_fecha_e_conta_como_nao_lida() {
        let pool = create_test_pool().await;
        let dono = criar_usuario(&pool, "dono@agendafit.test", Perfil::Aluno).await;
        let admin = criar_usuario(&pool, "admin@agendafit.test", Perfil::Admin).await;
        let id = abrir(&pool, dono, &novo()).await.unwrap();

        responder_admin(&pool, id, admin, &resposta_admin(StatusChamado::Resolvido)).await.unwrap();

        let chamado = obter_do_usuario(&pool, id, dono).await.unwrap();
        assert_eq!(chamado.status, StatusChamado::Resolvido);
        assert!(chamado.data_fechamento.is_some());
        assert!(chamado.tem_resposta_admin);
        assert_eq!(chamado.mensagens_nao_lidas, 1);
        assert_eq!(contar_nao_lidas_do_usuario(&pool, dono).await.unwrap(), 1);

        assert_eq!(marcar_lidas_pelo_dono(&pool, &chamado).await.unwrap(), 1);
        assert_eq!(obter_do_usuario(&pool, id, dono).await.unwrap().mensagens_nao_lidas, 0);
    }

    #[tokio::test]
    async fn resposta_do_dono_reabre_resolvido_mas_nao_fechado() {
        let pool = create_test_pool().await;
        let dono = criar_usuario(&pool, "dono@agendafit.test", Perfil::Aluno).await;
        let admin = criar_usuario(&pool, "admin@agendafit.test", Perfil::Admin).await;
        let id = abrir(&pool, dono, &novo()).await.unwrap();
        let resposta = RespostaChamadoForm { mensagem: "Continua a falhar.".into() };

        responder_admin(&pool, id, admin, &resposta_admin(StatusChamado::Resolvido)).await.unwrap();
        responder_usuario(&pool, id, dono, &resposta).await.unwrap();
        let chamado = obter(&pool, id).await.unwrap();
        assert_eq!(chamado.status, StatusChamado::Aberto);
        assert!(chamado.data_fechamento.is_none());

        responder_admin(&pool, id, admin, &resposta_admin(StatusChamado::Fechado)).await.unwrap();
        let erro = responder_usuario(&pool, id, dono, &resposta).await.unwrap_err();
        assert!(matches!(erro, AppError::BadRequest(_)));

        reabrir(&pool, id).await.unwrap();
        assert_eq!(obter(&pool, id).await.unwrap().status, StatusChamado::Aberto);
        assert!(matches!(reabrir(&pool, id).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn excluir_apaga_as_interacoes() {
        let pool = create_test_pool().await;
        let dono = criar_usuario(&pool, "dono@agendafit.test", Perfil::Aluno).await;
        let id = abrir(&pool, dono, &novo()).await.unwrap();
        excluir(&pool, id).await.unwrap();

        let restantes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chamado_interacoes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(restantes, 0);
    }
}

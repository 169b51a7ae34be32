// src/services/atividade_service.rs
use crate::{
    error::{AppError, AppResult},
    models::catalogo::{Atividade, AtividadeForm},
    services::categoria_service,
};
use sqlx::SqlitePool;
use validator::Validate;

const NAO_ENCONTRADA: &str = "Atividade não encontrada.";

const SELECT_ATIVIDADE: &str = r#"
    SELECT a.id, a.id_categoria, a.nome, a.descricao, a.data_cadastro, a.data_atualizacao,
           c.nome AS categoria_nome
    FROM atividades a
    JOIN categorias c ON c.id = a.id_categoria
"#;

pub async fn listar(db_pool: &SqlitePool) -> AppResult<Vec<Atividade>> {
    let atividades = sqlx::query_as::<_, Atividade>(&format!("{SELECT_ATIVIDADE} ORDER BY a.nome ASC"))
        .fetch_all(db_pool)
        .await?;
    Ok(atividades)
}

pub async fn obter(db_pool: &SqlitePool, id: i64) -> AppResult<Atividade> {
    sqlx::query_as::<_, Atividade>(&format!("{SELECT_ATIVIDADE} WHERE a.id = ?1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound(NAO_ENCONTRADA))
}

async fn validar(db_pool: &SqlitePool, form: &AtividadeForm) -> AppResult<()> {
    form.validate()?;
    if categoria_service::obter(db_pool, form.id_categoria).await.is_err() {
        return Err(AppError::BadRequest("Categoria selecionada não existe.".into()));
    }
    Ok(())
}

pub async fn criar(db_pool: &SqlitePool, form: &AtividadeForm) -> AppResult<i64> {
    validar(db_pool, form).await?;
    let id = sqlx::query("INSERT INTO atividades (id_categoria, nome, descricao) VALUES (?1, ?2, ?3)")
        .bind(form.id_categoria)
        .bind(form.nome.trim())
        .bind(form.descricao.trim())
        .execute(db_pool)
        .await?
        .last_insert_rowid();
    tracing::info!("Atividade '{}' criada (id {}).", form.nome, id);
    Ok(id)
}

pub async fn atualizar(db_pool: &SqlitePool, id: i64, form: &AtividadeForm) -> AppResult<()> {
    obter(db_pool, id).await?;
    validar(db_pool, form).await?;
    sqlx::query(
        r#"
        UPDATE atividades
        SET id_categoria = ?1, nome = ?2, descricao = ?3, data_atualizacao = CURRENT_TIMESTAMP
        WHERE id = ?4
        "#,
    )
    .bind(form.id_categoria)
    .bind(form.nome.trim())
    .bind(form.descricao.trim())
    .bind(id)
    .execute(db_pool)
    .await?;
    Ok(())
}

/// Recusa enquanto houver turmas da atividade.
pub async fn excluir(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    obter(db_pool, id).await?;
    let turmas = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM turmas WHERE id_atividade = ?1")
        .bind(id)
        .fetch_one(db_pool)
        .await?;
    if turmas > 0 {
        return Err(AppError::DeleteBlocked(format!(
            "Não é possível excluir esta atividade pois há {} turma(s) associada(s).",
            turmas
        )));
    }

    sqlx::query("DELETE FROM atividades WHERE id = ?1").bind(id).execute(db_pool).await?;
    tracing::info!("Atividade {} excluída.", id);
    Ok(())
}

pub async fn contar(db_pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM atividades").fetch_one(db_pool).await?)
}

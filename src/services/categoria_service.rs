// src/services/categoria_service.rs
use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::catalogo::{Categoria, CategoriaForm},
};
use sqlx::SqlitePool;
use validator::Validate;

const NAO_ENCONTRADA: &str = "Categoria não encontrada.";

pub async fn listar(db_pool: &SqlitePool) -> AppResult<Vec<Categoria>> {
    let categorias = sqlx::query_as::<_, Categoria>(
        "SELECT id, nome, descricao, data_cadastro, data_atualizacao FROM categorias ORDER BY nome ASC",
    )
    .fetch_all(db_pool)
    .await?;
    Ok(categorias)
}

pub async fn obter(db_pool: &SqlitePool, id: i64) -> AppResult<Categoria> {
    sqlx::query_as::<_, Categoria>(
        "SELECT id, nome, descricao, data_cadastro, data_atualizacao FROM categorias WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or(AppError::NotFound(NAO_ENCONTRADA))
}

pub async fn criar(db_pool: &SqlitePool, form: &CategoriaForm) -> AppResult<i64> {
    form.validate()?;
    let id = sqlx::query("INSERT INTO categorias (nome, descricao) VALUES (?1, ?2)")
        .bind(form.nome.trim())
        .bind(form.descricao.trim())
        .execute(db_pool)
        .await
        .map_err(|e| map_unique_violation(e, AppError::NameAlreadyExists))?
        .last_insert_rowid();
    tracing::info!("Categoria '{}' criada (id {}).", form.nome, id);
    Ok(id)
}

pub async fn atualizar(db_pool: &SqlitePool, id: i64, form: &CategoriaForm) -> AppResult<()> {
    form.validate()?;
    let rows = sqlx::query(
        "UPDATE categorias SET nome = ?1, descricao = ?2, data_atualizacao = CURRENT_TIMESTAMP WHERE id = ?3",
    )
    .bind(form.nome.trim())
    .bind(form.descricao.trim())
    .bind(id)
    .execute(db_pool)
    .await
    .map_err(|e| map_unique_violation(e, AppError::NameAlreadyExists))?
    .rows_affected();

    if rows == 0 {
        return Err(AppError::NotFound(NAO_ENCONTRADA));
    }
    Ok(())
}

/// Recusa enquanto houver atividades da categoria.
pub async fn excluir(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    obter(db_pool, id).await?;
    let atividades = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM atividades WHERE id_categoria = ?1")
        .bind(id)
        .fetch_one(db_pool)
        .await?;
    if atividades > 0 {
        return Err(AppError::DeleteBlocked(format!(
            "Não é possível excluir esta categoria pois há {} atividade(s) associada(s).",
            atividades
        )));
    }

    sqlx::query("DELETE FROM categorias WHERE id = ?1").bind(id).execute(db_pool).await?;
    tracing::info!("Categoria {} excluída.", id);
    Ok(())
}

pub async fn contar(db_pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categorias").fetch_one(db_pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn form(nome: &str) -> CategoriaForm {
        CategoriaForm { nome: nome.into(), descricao: "Aulas em grupo".into() }
    }

    #[tokio::test]
    async fn nome_deve_ser_unico() {
        let pool = create_test_pool().await;
        criar(&pool, &form("Dança")).await.unwrap();
        let erro = criar(&pool, &form("dança")).await;
        assert!(matches!(erro, Err(AppError::NameAlreadyExists)));
    }

    #[tokio::test]
    async fn nome_curto_e_recusado() {
        let pool = create_test_pool().await;
        assert!(matches!(criar(&pool, &form("ab")).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn categoria_com_atividade_nao_e_excluida() {
        let pool = create_test_pool().await;
        let id = criar(&pool, &form("Lutas")).await.unwrap();
        sqlx::query("INSERT INTO atividades (id_categoria, nome) VALUES (?1, 'Karate')")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let erro = excluir(&pool, id).await.unwrap_err();
        assert_eq!(
            erro.user_message(),
            "Não é possível excluir esta categoria pois há 1 atividade(s) associada(s)."
        );
        assert!(obter(&pool, id).await.is_ok());
        let atividades: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM atividades")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(atividades, 1);
    }

    #[tokio::test]
    async fn categoria_vazia_e_excluida() {
        let pool = create_test_pool().await;
        let id = criar(&pool, &form("Aquáticas")).await.unwrap();
        excluir(&pool, id).await.unwrap();
        assert!(matches!(obter(&pool, id).await, Err(AppError::NotFound(_))));
    }
}

// src/services/pagamento_service.rs
use crate::{
    error::{AppError, AppResult},
    models::pagamento::{AlterarPagamentoForm, Pagamento, PagamentoForm},
    services::matricula_service,
};
use sqlx::SqlitePool;
use validator::Validate;

const SELECT_PAGAMENTO: &str = r#"
    SELECT p.id, p.id_matricula, p.id_aluno, p.data_pagamento, p.valor_pago,
           m.valor_mensalidade,
           t.nome AS turma_nome,
           u.nome AS aluno_nome,
           u.email AS aluno_email
    FROM pagamentos p
    JOIN matriculas m ON m.id = p.id_matricula
    JOIN turmas t ON t.id = m.id_turma
    JOIN users u ON u.id = p.id_aluno
"#;

pub async fn listar_todos(db_pool: &SqlitePool) -> AppResult<Vec<Pagamento>> {
    let pagamentos = sqlx::query_as::<_, Pagamento>(&format!(
        "{SELECT_PAGAMENTO} ORDER BY p.data_pagamento DESC, p.id DESC"
    ))
    .fetch_all(db_pool)
    .await?;
    Ok(pagamentos)
}

pub async fn listar_por_aluno(db_pool: &SqlitePool, aluno_id: i64) -> AppResult<Vec<Pagamento>> {
    let pagamentos = sqlx::query_as::<_, Pagamento>(&format!(
        "{SELECT_PAGAMENTO} WHERE p.id_aluno = ?1 ORDER BY p.data_pagamento DESC, p.id DESC"
    ))
    .bind(aluno_id)
    .fetch_all(db_pool)
    .await?;
    Ok(pagamentos)
}

pub async fn obter(db_pool: &SqlitePool, id: i64) -> AppResult<Pagamento> {
    sqlx::query_as::<_, Pagamento>(&format!("{SELECT_PAGAMENTO} WHERE p.id = ?1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound("Pagamento não encontrado."))
}

/// Regista um pagamento; o aluno é o da matrícula.
pub async fn registar(db_pool: &SqlitePool, form: &PagamentoForm) -> AppResult<i64> {
    form.validate()?;
    let matricula = match matricula_service::obter_por_id(db_pool, form.id_matricula).await {
        Ok(matricula) => matricula,
        Err(AppError::NotFound(_)) => {
            return Err(AppError::BadRequest("Matrícula selecionada não existe.".into()))
        }
        Err(e) => return Err(e),
    };

    let id = sqlx::query("INSERT INTO pagamentos (id_matricula, id_aluno, valor_pago) VALUES (?1, ?2, ?3)")
        .bind(matricula.id)
        .bind(matricula.id_aluno)
        .bind(form.valor_pago)
        .execute(db_pool)
        .await?
        .last_insert_rowid();
    tracing::info!(
        "💰 Pagamento {} de {:.2} registado para a matrícula {}.",
        id,
        form.valor_pago,
        matricula.id
    );
    Ok(id)
}

/// Correção do valor pelo administrador.
pub async fn alterar_valor(db_pool: &SqlitePool, id: i64, form: &AlterarPagamentoForm) -> AppResult<()> {
    form.validate()?;
    let rows = sqlx::query("UPDATE pagamentos SET valor_pago = ?1 WHERE id = ?2")
        .bind(form.valor_pago)
        .bind(id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(AppError::NotFound("Pagamento não encontrado."));
    }
    tracing::info!("Pagamento {} corrigido para {:.2}.", id, form.valor_pago);
    Ok(())
}

pub async fn excluir(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let rows = sqlx::query("DELETE FROM pagamentos WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(AppError::NotFound("Pagamento não encontrado."));
    }
    tracing::info!("Pagamento {} excluído.", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::create_test_pool,
        models::user::Perfil,
        services::{
            matricula_service::tests::form, turma_service::tests::criar_turma,
            user_service::tests::criar_usuario,
        },
    };

    #[tokio::test]
    async fn pagamento_copia_o_aluno_da_matricula() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 5).await;
        let aluno = criar_usuario(&pool, "p@agendafit.test", Perfil::Aluno).await;
        let matricula = matricula_service::matricular(&pool, &form(aluno, turma)).await.unwrap();

        let id = registar(&pool, &PagamentoForm { id_matricula: matricula, valor_pago: 120.0 })
            .await
            .unwrap();
        let pagamento = obter(&pool, id).await.unwrap();
        assert_eq!(pagamento.id_aluno, aluno);
        assert_eq!(listar_por_aluno(&pool, aluno).await.unwrap().len(), 1);

        alterar_valor(&pool, id, &AlterarPagamentoForm { valor_pago: 60.0 }).await.unwrap();
        assert_eq!(obter(&pool, id).await.unwrap().valor_pago, 60.0);
    }

    #[tokio::test]
    async fn valor_tem_de_ser_positivo() {
        let pool = create_test_pool().await;
        let erro = registar(&pool, &PagamentoForm { id_matricula: 1, valor_pago: 0.0 }).await;
        assert!(matches!(erro, Err(AppError::Validation(_))));
        let erro = registar(&pool, &PagamentoForm { id_matricula: 42, valor_pago: 10.0 }).await;
        assert!(matches!(erro, Err(AppError::BadRequest(_))));
        let erro = registar(&pool, &PagamentoForm { id_matricula: 1, valor_pago: f64::INFINITY }).await;
        assert!(matches!(erro, Err(AppError::Validation(_))));
        let erro = alterar_valor(&pool, 1, &AlterarPagamentoForm { valor_pago: f64::INFINITY }).await;
        assert!(matches!(erro, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn falha_da_base_nao_vira_matricula_inexistente() {
        let pool = create_test_pool().await;
        pool.close().await;
        let erro = registar(&pool, &PagamentoForm { id_matricula: 1, valor_pago: 10.0 }).await;
        assert!(matches!(erro, Err(AppError::SqlxError(_))));
    }
}

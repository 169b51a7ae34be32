// src/services/matricula_service.rs
// Admissão de matrículas: existência do aluno e da turma, duplicado, vagas.
use crate::{
    error::{AppError, AppResult},
    models::{
        matricula::{Matricula, MatriculaForm},
        user::Perfil,
    },
    services::{turma_service, user_service},
};
use chrono::{Datelike, Local, NaiveDate};
use sqlx::SqlitePool;
use validator::Validate;

const SELECT_MATRICULA: &str = r#"
    SELECT m.id, m.id_turma, m.id_aluno, m.data_matricula, m.valor_mensalidade, m.data_vencimento,
           t.nome AS turma_nome,
           a.nome AS atividade_nome,
           u.nome AS aluno_nome,
           u.email AS aluno_email
    FROM matriculas m
    JOIN turmas t ON t.id = m.id_turma
    JOIN atividades a ON a.id = t.id_atividade
    JOIN users u ON u.id = m.id_aluno
"#;

fn ultimo_dia_do_mes(ano: i32, mes: u32) -> u32 {
    let (ano_seg, mes_seg) = if mes == 12 { (ano + 1, 1) } else { (ano, mes + 1) };
    NaiveDate::from_ymd_opt(ano_seg, mes_seg, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Vencimento no mês de `hoje` com o dia pedido; dias além do fim do mês
/// ficam no último dia (31 em fevereiro -> 28/29).
pub fn calcular_vencimento(hoje: NaiveDate, dia: u32) -> NaiveDate {
    let dia = dia.clamp(1, ultimo_dia_do_mes(hoje.year(), hoje.month()));
    hoje.with_day(dia).unwrap_or(hoje)
}

pub async fn listar_todas(db_pool: &SqlitePool) -> AppResult<Vec<Matricula>> {
    let matriculas = sqlx::query_as::<_, Matricula>(&format!(
        "{SELECT_MATRICULA} ORDER BY m.data_matricula DESC, m.id DESC"
    ))
    .fetch_all(db_pool)
    .await?;
    Ok(matriculas)
}

pub async fn obter_por_id(db_pool: &SqlitePool, id: i64) -> AppResult<Matricula> {
    sqlx::query_as::<_, Matricula>(&format!("{SELECT_MATRICULA} WHERE m.id = ?1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::NotFound("Matrícula não encontrada."))
}

pub async fn listar_por_aluno(db_pool: &SqlitePool, aluno_id: i64) -> AppResult<Vec<Matricula>> {
    let matriculas = sqlx::query_as::<_, Matricula>(&format!(
        "{SELECT_MATRICULA} WHERE m.id_aluno = ?1 ORDER BY t.nome ASC"
    ))
    .bind(aluno_id)
    .fetch_all(db_pool)
    .await?;
    Ok(matriculas)
}

pub async fn listar_por_turma(db_pool: &SqlitePool, turma_id: i64) -> AppResult<Vec<Matricula>> {
    let matriculas = sqlx::query_as::<_, Matricula>(&format!(
        "{SELECT_MATRICULA} WHERE m.id_turma = ?1 ORDER BY u.nome ASC"
    ))
    .bind(turma_id)
    .fetch_all(db_pool)
    .await?;
    Ok(matriculas)
}

pub async fn contar_por_turma(db_pool: &SqlitePool, turma_id: i64) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matriculas WHERE id_turma = ?1")
        .bind(turma_id)
        .fetch_one(db_pool)
        .await?;
    Ok(total)
}

pub async fn contar(db_pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matriculas").fetch_one(db_pool).await?)
}

/// Passos comuns a criar e alterar: forma dos dados, aluno com perfil Aluno e turma.
async fn validar(db_pool: &SqlitePool, form: &MatriculaForm) -> AppResult<()> {
    form.validate()?;

    match user_service::find_user_by_id(db_pool, form.id_aluno).await? {
        Some(user) if user.perfil == Perfil::Aluno => {}
        _ => {
            tracing::warn!("Matrícula recusada: aluno {} não existe.", form.id_aluno);
            return Err(AppError::StudentNotFound);
        }
    }
    if turma_service::buscar(db_pool, form.id_turma).await?.is_none() {
        tracing::warn!("Matrícula recusada: turma {} não existe.", form.id_turma);
        return Err(AppError::ClassNotFound);
    }
    Ok(())
}

async fn existe_matricula(
    db_pool: &SqlitePool,
    id_turma: i64,
    id_aluno: i64,
    ignorar_id: i64,
) -> AppResult<bool> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM matriculas WHERE id_turma = ?1 AND id_aluno = ?2 AND id != ?3",
    )
    .bind(id_turma)
    .bind(id_aluno)
    .bind(ignorar_id)
    .fetch_one(db_pool)
    .await?;
    Ok(total > 0)
}

fn mapear_duplicado(err: sqlx::Error) -> AppError {
    crate::error::map_unique_violation(err, AppError::DuplicateEnrollment)
}

/// Matricula o aluno na turma e devolve o id da nova matrícula.
pub async fn matricular(db_pool: &SqlitePool, form: &MatriculaForm) -> AppResult<i64> {
    validar(db_pool, form).await?;

    if existe_matricula(db_pool, form.id_turma, form.id_aluno, 0).await? {
        tracing::warn!("Matrícula duplicada: aluno {} na turma {}.", form.id_aluno, form.id_turma);
        return Err(AppError::DuplicateEnrollment);
    }

    let vencimento = calcular_vencimento(Local::now().date_naive(), form.dia_vencimento as u32);

    // Contagem e INSERT na mesma instrução: dois pedidos não ocupam a última vaga.
    let mut tx = db_pool.begin().await?;
    let resultado = sqlx::query(
        r#"
        INSERT INTO matriculas (id_turma, id_aluno, valor_mensalidade, data_vencimento)
        SELECT ?1, ?2, ?3, ?4
        WHERE (SELECT COUNT(*) FROM matriculas WHERE id_turma = ?1)
            < (SELECT vagas FROM turmas WHERE id = ?1)
        "#,
    )
    .bind(form.id_turma)
    .bind(form.id_aluno)
    .bind(form.valor_mensalidade)
    .bind(vencimento)
    .execute(&mut *tx)
    .await
    .map_err(mapear_duplicado)?;

    if resultado.rows_affected() == 0 {
        tracing::warn!("Matrícula recusada: turma {} sem vagas.", form.id_turma);
        return Err(AppError::ClassFull);
    }
    tx.commit().await?;

    let id = resultado.last_insert_rowid();
    tracing::info!(
        "✅ Aluno {} matriculado na turma {} (matrícula {}, vencimento {}).",
        form.id_aluno,
        form.id_turma,
        id,
        vencimento
    );
    Ok(id)
}

/// Altera uma matrícula. Mudar de turma repete as verificações de duplicado e vagas.
pub async fn alterar(db_pool: &SqlitePool, id: i64, form: &MatriculaForm) -> AppResult<()> {
    let atual = obter_por_id(db_pool, id).await?;
    validar(db_pool, form).await?;

    if existe_matricula(db_pool, form.id_turma, form.id_aluno, id).await? {
        return Err(AppError::DuplicateEnrollment);
    }

    let vencimento = calcular_vencimento(Local::now().date_naive(), form.dia_vencimento as u32);

    let mut tx = db_pool.begin().await?;
    let resultado = sqlx::query(
        r#"
        UPDATE matriculas
        SET id_turma = ?1, id_aluno = ?2, valor_mensalidade = ?3, data_vencimento = ?4
        WHERE id = ?5
          AND (?1 = ?6
               OR (SELECT COUNT(*) FROM matriculas WHERE id_turma = ?1)
                  < (SELECT vagas FROM turmas WHERE id = ?1))
        "#,
    )
    .bind(form.id_turma)
    .bind(form.id_aluno)
    .bind(form.valor_mensalidade)
    .bind(vencimento)
    .bind(id)
    .bind(atual.id_turma)
    .execute(&mut *tx)
    .await
    .map_err(mapear_duplicado)?;

    if resultado.rows_affected() == 0 {
        return Err(AppError::ClassFull);
    }
    tx.commit().await?;
    tracing::info!("Matrícula {} alterada.", id);
    Ok(())
}

/// Recusa enquanto houver pagamentos da matrícula.
pub async fn excluir(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    obter_por_id(db_pool, id).await?;
    let pagamentos = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pagamentos WHERE id_matricula = ?1")
        .bind(id)
        .fetch_one(db_pool)
        .await?;
    if pagamentos > 0 {
        return Err(AppError::DeleteBlocked(format!(
            "Não é possível excluir esta matrícula pois há {} pagamento(s) associado(s).",
            pagamentos
        )));
    }

    sqlx::query("DELETE FROM matriculas WHERE id = ?1").bind(id).execute(db_pool).await?;
    tracing::info!("Matrícula {} excluída.", id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        db::{create_db_pool, create_test_pool},
        services::{turma_service::tests::criar_turma, user_service::tests::criar_usuario},
    };
    use uuid::Uuid;

    pub(crate) fn form(id_aluno: i64, id_turma: i64) -> MatriculaForm {
        MatriculaForm { id_aluno, id_turma, valor_mensalidade: 120.0, dia_vencimento: 10 }
    }

    async fn contar_linhas(pool: &SqlitePool) -> i64 {
        contar(pool).await.unwrap()
    }

    #[test]
    fn vencimento_fica_no_ultimo_dia_do_mes() {
        let fev = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        assert_eq!(calcular_vencimento(fev, 31), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        let fev_bissexto = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(calcular_vencimento(fev_bissexto, 30), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let dez = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();
        assert_eq!(calcular_vencimento(dez, 31), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(calcular_vencimento(dez, 5), NaiveDate::from_ymd_opt(2025, 12, 5).unwrap());
    }

    #[tokio::test]
    async fn duas_vagas_tres_alunos() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 2).await;
        let a = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let b = criar_usuario(&pool, "b@agendafit.test", Perfil::Aluno).await;
        let c = criar_usuario(&pool, "c@agendafit.test", Perfil::Aluno).await;

        matricular(&pool, &form(a, turma)).await.unwrap();
        matricular(&pool, &form(b, turma)).await.unwrap();

        let erro = matricular(&pool, &form(c, turma)).await.unwrap_err();
        assert!(matches!(erro, AppError::ClassFull));
        assert_eq!(erro.user_message(), "Esta turma não possui vagas disponíveis.");

        // duplicado é verificado antes das vagas
        let erro = matricular(&pool, &form(a, turma)).await.unwrap_err();
        assert!(matches!(erro, AppError::DuplicateEnrollment));
        assert_eq!(erro.user_message(), "Este aluno já está matriculado nesta turma.");

        assert_eq!(contar_por_turma(&pool, turma).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn segunda_matricula_igual_falha() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 10).await;
        let aluno = criar_usuario(&pool, "dup@agendafit.test", Perfil::Aluno).await;

        matricular(&pool, &form(aluno, turma)).await.unwrap();
        assert!(matches!(
            matricular(&pool, &form(aluno, turma)).await,
            Err(AppError::DuplicateEnrollment)
        ));
        assert_eq!(contar_linhas(&pool).await, 1);
    }

    #[tokio::test]
    async fn mensalidade_e_dia_invalidos() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 10).await;
        let aluno = criar_usuario(&pool, "v@agendafit.test", Perfil::Aluno).await;

        for valor in [0.0, -5.0, f64::INFINITY, f64::NAN] {
            let f = MatriculaForm { valor_mensalidade: valor, ..form(aluno, turma) };
            assert!(matches!(matricular(&pool, &f).await, Err(AppError::Validation(_))));
        }
        for dia in [0, 32] {
            let f = MatriculaForm { dia_vencimento: dia, ..form(aluno, turma) };
            assert!(matches!(matricular(&pool, &f).await, Err(AppError::Validation(_))));
        }
        assert_eq!(contar_linhas(&pool).await, 0);
    }

    #[tokio::test]
    async fn aluno_e_turma_tem_de_existir() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 10).await;
        let aluno = criar_usuario(&pool, "x@agendafit.test", Perfil::Aluno).await;
        let professor = criar_usuario(&pool, "p@agendafit.test", Perfil::Professor).await;

        let erro = matricular(&pool, &form(9999, turma)).await.unwrap_err();
        assert_eq!(erro.user_message(), "Aluno selecionado não existe.");
        // professor não conta como aluno
        assert!(matches!(matricular(&pool, &form(professor, turma)).await, Err(AppError::StudentNotFound)));

        let erro = matricular(&pool, &form(aluno, 9999)).await.unwrap_err();
        assert_eq!(erro.user_message(), "Turma selecionada não existe.");
    }

    #[tokio::test]
    async fn vencimento_usa_o_mes_corrente() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 10).await;
        let aluno = criar_usuario(&pool, "venc@agendafit.test", Perfil::Aluno).await;

        let id = matricular(&pool, &MatriculaForm { dia_vencimento: 31, ..form(aluno, turma) })
            .await
            .unwrap();
        let m = obter_por_id(&pool, id).await.unwrap();
        let hoje = Local::now().date_naive();
        assert_eq!(m.data_vencimento, calcular_vencimento(hoje, 31));
        assert_eq!(m.data_vencimento.month(), hoje.month());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pedidos_simultaneos_nao_passam_das_vagas() {
        let caminho = std::env::temp_dir().join(format!("agendafit-vagas-{}.db", Uuid::new_v4()));
        let pool = create_db_pool(&format!("sqlite://{}", caminho.display())).await.unwrap();
        let turma = criar_turma(&pool, 3).await;
        let mut alunos = Vec::new();
        for i in 0..20 {
            alunos.push(criar_usuario(&pool, &format!("corrida{}@agendafit.test", i), Perfil::Aluno).await);
        }

        let tarefas: Vec<_> = alunos
            .into_iter()
            .map(|aluno| {
                let pool = pool.clone();
                tokio::spawn(async move { matricular(&pool, &form(aluno, turma)).await })
            })
            .collect();

        let (mut aceites, mut cheias, mut outros) = (0, 0, Vec::new());
        for tarefa in tarefas {
            match tarefa.await.unwrap() {
                Ok(_) => aceites += 1,
                Err(AppError::ClassFull) => cheias += 1,
                Err(e) => outros.push(e.to_string()),
            }
        }

        let linhas = contar_por_turma(&pool, turma).await.unwrap();
        pool.close().await;
        for sufixo in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", caminho.display(), sufixo));
        }

        assert!(outros.is_empty(), "erros inesperados: {:?}", outros);
        assert_eq!((aceites, cheias), (3, 17));
        assert_eq!(linhas, 3);
    }

    #[tokio::test]
    async fn alterar_recalcula_vencimento_no_mes_corrente() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 10).await;
        let aluno = criar_usuario(&pool, "alt@agendafit.test", Perfil::Aluno).await;
        let id = matricular(&pool, &form(aluno, turma)).await.unwrap();
        sqlx::query("UPDATE matriculas SET data_vencimento = '2020-01-10' WHERE id = ?1")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        alterar(&pool, id, &MatriculaForm { dia_vencimento: 31, ..form(aluno, turma) }).await.unwrap();
        let m = obter_por_id(&pool, id).await.unwrap();
        assert_eq!(m.data_vencimento, calcular_vencimento(Local::now().date_naive(), 31));
    }

    #[tokio::test]
    async fn mudar_para_turma_cheia_e_recusado() {
        let pool = create_test_pool().await;
        let cheia = criar_turma(&pool, 1).await;
        let livre = criar_turma(&pool, 5).await;
        let a = criar_usuario(&pool, "a@agendafit.test", Perfil::Aluno).await;
        let b = criar_usuario(&pool, "b@agendafit.test", Perfil::Aluno).await;

        matricular(&pool, &form(a, cheia)).await.unwrap();
        let id_b = matricular(&pool, &form(b, livre)).await.unwrap();

        let erro = alterar(&pool, id_b, &form(b, cheia)).await.unwrap_err();
        assert!(matches!(erro, AppError::ClassFull));

        // manter a turma e mudar só o valor não conta vagas
        let f = MatriculaForm { valor_mensalidade: 99.5, ..form(b, livre) };
        alterar(&pool, id_b, &f).await.unwrap();
        assert_eq!(obter_por_id(&pool, id_b).await.unwrap().valor_mensalidade, 99.5);
    }

    #[tokio::test]
    async fn matricula_com_pagamento_nao_e_excluida() {
        let pool = create_test_pool().await;
        let turma = criar_turma(&pool, 10).await;
        let aluno = criar_usuario(&pool, "pag@agendafit.test", Perfil::Aluno).await;
        let id = matricular(&pool, &form(aluno, turma)).await.unwrap();
        sqlx::query("INSERT INTO pagamentos (id_matricula, id_aluno, valor_pago) VALUES (?1, ?2, 120.0)")
            .bind(id)
            .bind(aluno)
            .execute(&pool)
            .await
            .unwrap();

        let erro = excluir(&pool, id).await.unwrap_err();
        assert_eq!(
            erro.user_message(),
            "Não é possível excluir esta matrícula pois há 1 pagamento(s) associado(s)."
        );
        assert_eq!(contar_linhas(&pool).await, 1);
    }
}

// src/services/turma_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        turma::{Turma, TurmaForm},
        user::Perfil,
    },
    services::{atividade_service, user_service},
};
use sqlx::SqlitePool;
use validator::Validate;

const SELECT_TURMA: &str = r#"
    SELECT t.id, t.nome, t.id_atividade, t.id_professor, t.horario_inicio, t.horario_fim,
           t.dias_semana, t.vagas, t.data_cadastro, t.data_atualizacao,
           a.nome AS atividade_nome,
           u.nome AS professor_nome,
           (SELECT COUNT(*) FROM matriculas m WHERE m.id_turma = t.id) AS matriculados
    FROM turmas t
    JOIN atividades a ON a.id = t.id_atividade
    JOIN users u ON u.id = t.id_professor
"#;

pub async fn listar(db_pool: &SqlitePool) -> AppResult<Vec<Turma>> {
    let turmas = sqlx::query_as::<_, Turma>(&format!("{SELECT_TURMA} ORDER BY t.nome ASC"))
        .fetch_all(db_pool)
        .await?;
    Ok(turmas)
}

pub async fn listar_por_professor(db_pool: &SqlitePool, professor_id: i64) -> AppResult<Vec<Turma>> {
    let turmas = sqlx::query_as::<_, Turma>(&format!(
        "{SELECT_TURMA} WHERE t.id_professor = ?1 ORDER BY t.horario_inicio ASC"
    ))
    .bind(professor_id)
    .fetch_all(db_pool)
    .await?;
    Ok(turmas)
}

pub async fn buscar(db_pool: &SqlitePool, id: i64) -> AppResult<Option<Turma>> {
    let turma = sqlx::query_as::<_, Turma>(&format!("{SELECT_TURMA} WHERE t.id = ?1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(turma)
}

pub async fn obter(db_pool: &SqlitePool, id: i64) -> AppResult<Turma> {
    buscar(db_pool, id).await?.ok_or(AppError::NotFound("Turma não encontrada."))
}

async fn validar(db_pool: &SqlitePool, form: &TurmaForm) -> AppResult<(chrono::NaiveTime, chrono::NaiveTime)> {
    form.validate()?;
    if atividade_service::obter(db_pool, form.id_atividade).await.is_err() {
        return Err(AppError::BadRequest("Atividade selecionada não existe.".into()));
    }
    match user_service::find_user_by_id(db_pool, form.id_professor).await? {
        Some(user) if user.perfil == Perfil::Professor => {}
        _ => return Err(AppError::BadRequest("Professor selecionado não existe.".into())),
    }
    form.horarios().ok_or(AppError::BadRequest("Horário deve estar no formato HH:MM.".into()))
}

pub async fn criar(db_pool: &SqlitePool, form: &TurmaForm) -> AppResult<i64> {
    let (inicio, fim) = validar(db_pool, form).await?;
    let id = sqlx::query(
        r#"
        INSERT INTO turmas (nome, id_atividade, id_professor, horario_inicio, horario_fim, dias_semana, vagas)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(form.nome.trim())
    .bind(form.id_atividade)
    .bind(form.id_professor)
    .bind(inicio)
    .bind(fim)
    .bind(form.dias_semana.trim())
    .bind(form.vagas)
    .execute(db_pool)
    .await?
    .last_insert_rowid();
    tracing::info!("Turma '{}' criada (id {}, {} vagas).", form.nome, id, form.vagas);
    Ok(id)
}

/// As vagas não podem ficar abaixo do número de matriculados.
pub async fn atualizar(db_pool: &SqlitePool, id: i64, form: &TurmaForm) -> AppResult<()> {
    let atual = obter(db_pool, id).await?;
    let (inicio, fim) = validar(db_pool, form).await?;
    if form.vagas < atual.matriculados {
        return Err(AppError::BadRequest(format!(
            "A turma já possui {} aluno(s) matriculado(s); as vagas não podem ser menores.",
            atual.matriculados
        )));
    }

    sqlx::query(
        r#"
        UPDATE turmas
        SET nome = ?1, id_atividade = ?2, id_professor = ?3, horario_inicio = ?4, horario_fim = ?5,
            dias_semana = ?6, vagas = ?7, data_atualizacao = CURRENT_TIMESTAMP
        WHERE id = ?8
        "#,
    )
    .bind(form.nome.trim())
    .bind(form.id_atividade)
    .bind(form.id_professor)
    .bind(inicio)
    .bind(fim)
    .bind(form.dias_semana.trim())
    .bind(form.vagas)
    .bind(id)
    .execute(db_pool)
    .await?;
    Ok(())
}

/// Recusa enquanto houver matrículas na turma.
pub async fn excluir(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let turma = obter(db_pool, id).await?;
    if turma.matriculados > 0 {
        return Err(AppError::DeleteBlocked(format!(
            "Não é possível excluir esta turma pois há {} matrícula(s) associada(s).",
            turma.matriculados
        )));
    }
    sqlx::query("DELETE FROM turmas WHERE id = ?1").bind(id).execute(db_pool).await?;
    tracing::info!("Turma {} excluída.", id);
    Ok(())
}

pub async fn contar(db_pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM turmas").fetch_one(db_pool).await?)
}

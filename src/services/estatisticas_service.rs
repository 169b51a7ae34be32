// src/services/estatisticas_service.rs
use crate::{
    error::AppResult,
    models::{
        estatisticas::{CargaProfessor, Dashboard, OcupacaoTurma, PopularidadeAtividade, Totais},
        user::Perfil,
    },
    services::{atividade_service, categoria_service, matricula_service, turma_service, user_service},
};
use sqlx::SqlitePool;

const TOP: i64 = 5;

pub async fn totais(db_pool: &SqlitePool) -> AppResult<Totais> {
    Ok(Totais {
        alunos: user_service::contar_por_perfil(db_pool, Perfil::Aluno).await?,
        professores: user_service::contar_por_perfil(db_pool, Perfil::Professor).await?,
        categorias: categoria_service::contar(db_pool).await?,
        atividades: atividade_service::contar(db_pool).await?,
        turmas: turma_service::contar(db_pool).await?,
        matriculas: matricula_service::contar(db_pool).await?,
    })
}

pub async fn turmas_mais_ocupadas(db_pool: &SqlitePool) -> AppResult<Vec<OcupacaoTurma>> {
    let turmas = sqlx::query_as::<_, OcupacaoTurma>(
        r#"
        SELECT t.id, t.nome, a.nome AS atividade_nome, t.vagas,
               COUNT(m.id) AS matriculados
        FROM turmas t
        JOIN atividades a ON a.id = t.id_atividade
        LEFT JOIN matriculas m ON m.id_turma = t.id
        GROUP BY t.id
        ORDER BY matriculados DESC, t.nome ASC
        LIMIT ?1
        "#,
    )
    .bind(TOP)
    .fetch_all(db_pool)
    .await?;
    Ok(turmas)
}

pub async fn atividades_populares(db_pool: &SqlitePool) -> AppResult<Vec<PopularidadeAtividade>> {
    let atividades = sqlx::query_as::<_, PopularidadeAtividade>(
        r#"
        SELECT a.id, a.nome,
               COUNT(DISTINCT t.id) AS num_turmas,
               COUNT(DISTINCT m.id_aluno) AS num_alunos
        FROM atividades a
        LEFT JOIN turmas t ON t.id_atividade = a.id
        LEFT JOIN matriculas m ON m.id_turma = t.id
        GROUP BY a.id
        ORDER BY num_alunos DESC, a.nome ASC
        LIMIT ?1
        "#,
    )
    .bind(TOP)
    .fetch_all(db_pool)
    .await?;
    Ok(atividades)
}

pub async fn carga_professores(db_pool: &SqlitePool) -> AppResult<Vec<CargaProfessor>> {
    let professores = sqlx::query_as::<_, CargaProfessor>(
        r#"
        SELECT u.id, u.nome,
               COUNT(DISTINCT t.id) AS num_turmas,
               COUNT(DISTINCT m.id_aluno) AS num_alunos
        FROM users u
        LEFT JOIN turmas t ON t.id_professor = u.id
        LEFT JOIN matriculas m ON m.id_turma = t.id
        WHERE u.perfil = ?1
        GROUP BY u.id
        ORDER BY num_turmas DESC, u.nome ASC
        "#,
    )
    .bind(Perfil::Professor)
    .fetch_all(db_pool)
    .await?;
    Ok(professores)
}

pub async fn dashboard(db_pool: &SqlitePool) -> AppResult<Dashboard> {
    Ok(Dashboard {
        totais: totais(db_pool).await?,
        top_turmas: turmas_mais_ocupadas(db_pool).await?,
        top_atividades: atividades_populares(db_pool).await?,
        professores: carga_professores(db_pool).await?,
    })
}

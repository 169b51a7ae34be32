// src/models/estatisticas.rs
use sqlx::FromRow;

#[derive(Debug, Clone, Default)]
pub struct Totais {
    pub alunos: i64,
    pub professores: i64,
    pub categorias: i64,
    pub atividades: i64,
    pub turmas: i64,
    pub matriculas: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct OcupacaoTurma {
    pub id: i64,
    pub nome: String,
    pub atividade_nome: String,
    pub vagas: i64,
    pub matriculados: i64,
}

impl OcupacaoTurma {
    /// Percentagem de ocupação com uma casa decimal.
    pub fn percentual(&self) -> f64 {
        if self.vagas <= 0 {
            return 0.0;
        }
        (self.matriculados as f64 / self.vagas as f64 * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PopularidadeAtividade {
    pub id: i64,
    pub nome: String,
    pub num_turmas: i64,
    pub num_alunos: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CargaProfessor {
    pub id: i64,
    pub nome: String,
    pub num_turmas: i64,
    pub num_alunos: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub totais: Totais,
    pub top_turmas: Vec<OcupacaoTurma>,
    pub top_atividades: Vec<PopularidadeAtividade>,
    pub professores: Vec<CargaProfessor>,
}

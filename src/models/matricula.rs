// src/models/matricula.rs
use crate::models::validacao::validar_mensalidade;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

/// Matrícula com dados da turma e do aluno (JOIN).
#[derive(Debug, Clone, FromRow)]
pub struct Matricula {
    pub id: i64,
    pub id_turma: i64,
    pub id_aluno: i64,
    pub data_matricula: NaiveDateTime,
    pub valor_mensalidade: f64,
    pub data_vencimento: NaiveDate,
    pub turma_nome: String,
    pub atividade_nome: String,
    pub aluno_nome: String,
    pub aluno_email: String,
}

impl Matricula {
    pub fn vencimento_formatado(&self) -> String {
        self.data_vencimento.format("%d/%m/%Y").to_string()
    }

    pub fn data_formatada(&self) -> String {
        self.data_matricula.format("%d/%m/%Y").to_string()
    }
}

/// Pedido de matrícula (admin ou o próprio aluno).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MatriculaForm {
    #[validate(range(min = 1, message = "Selecione um aluno."))]
    pub id_aluno: i64,
    #[validate(range(min = 1, message = "Selecione uma turma."))]
    pub id_turma: i64,
    #[validate(custom(function = "validar_mensalidade"))]
    pub valor_mensalidade: f64,
    #[validate(range(min = 1, max = 31, message = "O dia de vencimento deve estar entre 1 e 31."))]
    pub dia_vencimento: i64,
}

impl From<&Matricula> for MatriculaForm {
    fn from(m: &Matricula) -> Self {
        use chrono::Datelike;
        MatriculaForm {
            id_aluno: m.id_aluno,
            id_turma: m.id_turma,
            valor_mensalidade: m.valor_mensalidade,
            dia_vencimento: i64::from(m.data_vencimento.day()),
        }
    }
}

/// Auto-matrícula: o id do aluno vem da sessão.
#[derive(Debug, Deserialize)]
pub struct AutoMatriculaForm {
    pub id_turma: i64,
    pub valor_mensalidade: f64,
    pub dia_vencimento: i64,
}

// src/models/turma.rs
use crate::models::validacao::{parse_horario, validar_horario};
use chrono::{NaiveDateTime, NaiveTime};
use serde::Deserialize;
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Turma com os nomes da atividade e do professor e a ocupação atual.
#[derive(Debug, Clone, FromRow)]
pub struct Turma {
    pub id: i64,
    pub nome: String,
    pub id_atividade: i64,
    pub id_professor: i64,
    pub horario_inicio: NaiveTime,
    pub horario_fim: NaiveTime,
    pub dias_semana: String,
    pub vagas: i64,
    pub data_cadastro: NaiveDateTime,
    pub data_atualizacao: NaiveDateTime,
    pub atividade_nome: String,
    pub professor_nome: String,
    pub matriculados: i64,
}

impl Turma {
    pub fn vagas_livres(&self) -> i64 {
        (self.vagas - self.matriculados).max(0)
    }

    pub fn lotada(&self) -> bool {
        self.matriculados >= self.vagas
    }

    pub fn horario(&self) -> String {
        format!("{} - {}", self.horario_inicio.format("%H:%M"), self.horario_fim.format("%H:%M"))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validar_intervalo", skip_on_field_errors = true))]
pub struct TurmaForm {
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub nome: String,
    #[validate(range(min = 1, message = "Selecione uma atividade."))]
    pub id_atividade: i64,
    #[validate(range(min = 1, message = "Selecione um professor."))]
    pub id_professor: i64,
    #[validate(custom(function = "validar_horario"))]
    pub horario_inicio: String,
    #[validate(custom(function = "validar_horario"))]
    pub horario_fim: String,
    #[validate(length(min = 1, max = 50, message = "Informe os dias da semana (até 50 caracteres)."))]
    pub dias_semana: String,
    #[validate(range(min = 1, max = 100, message = "O número de vagas deve estar entre 1 e 100."))]
    pub vagas: i64,
}

fn validar_intervalo(form: &TurmaForm) -> Result<(), ValidationError> {
    match (parse_horario(&form.horario_inicio), parse_horario(&form.horario_fim)) {
        (Some(inicio), Some(fim)) if fim <= inicio => Err(ValidationError::new("horario_fim")
            .with_message("Horário de fim deve ser posterior ao horário de início.".into())),
        _ => Ok(()),
    }
}

impl TurmaForm {
    /// Horários já validados; `None` só se `validate()` não foi chamado.
    pub fn horarios(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_horario(&self.horario_inicio)?, parse_horario(&self.horario_fim)?))
    }
}

impl From<&Turma> for TurmaForm {
    fn from(t: &Turma) -> Self {
        TurmaForm {
            nome: t.nome.clone(),
            id_atividade: t.id_atividade,
            id_professor: t.id_professor,
            horario_inicio: t.horario_inicio.format("%H:%M").to_string(),
            horario_fim: t.horario_fim.format("%H:%M").to_string(),
            dias_semana: t.dias_semana.clone(),
            vagas: t.vagas,
        }
    }
}

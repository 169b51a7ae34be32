// src/models/pagamento.rs
use crate::models::validacao::validar_valor_pago;
use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Pagamento {
    pub id: i64,
    pub id_matricula: i64,
    pub id_aluno: i64,
    pub data_pagamento: NaiveDateTime,
    pub valor_pago: f64,
    pub valor_mensalidade: f64,
    pub turma_nome: String,
    pub aluno_nome: String,
    pub aluno_email: String,
}

impl Pagamento {
    pub fn data_formatada(&self) -> String {
        self.data_pagamento.format("%d/%m/%Y %H:%M").to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PagamentoForm {
    #[validate(range(min = 1, message = "Selecione uma matrícula."))]
    pub id_matricula: i64,
    #[validate(custom(function = "validar_valor_pago"))]
    pub valor_pago: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AlterarPagamentoForm {
    #[validate(custom(function = "validar_valor_pago"))]
    pub valor_pago: f64,
}

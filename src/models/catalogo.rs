// src/models/catalogo.rs
// Categorias e atividades: o catálogo do que o ginásio oferece.
use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Categoria {
    pub id: i64,
    pub nome: String,
    pub descricao: String,
    pub data_cadastro: NaiveDateTime,
    pub data_atualizacao: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CategoriaForm {
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub nome: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "A descrição deve ter no máximo 500 caracteres."))]
    pub descricao: String,
}

impl From<&Categoria> for CategoriaForm {
    fn from(c: &Categoria) -> Self {
        CategoriaForm { nome: c.nome.clone(), descricao: c.descricao.clone() }
    }
}

/// Atividade com o nome da categoria (JOIN).
#[derive(Debug, Clone, FromRow)]
pub struct Atividade {
    pub id: i64,
    pub id_categoria: i64,
    pub nome: String,
    pub descricao: String,
    pub data_cadastro: NaiveDateTime,
    pub data_atualizacao: NaiveDateTime,
    pub categoria_nome: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AtividadeForm {
    #[validate(range(min = 1, message = "Selecione uma categoria."))]
    pub id_categoria: i64,
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub nome: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "A descrição deve ter no máximo 1000 caracteres."))]
    pub descricao: String,
}

impl From<&Atividade> for AtividadeForm {
    fn from(a: &Atividade) -> Self {
        AtividadeForm {
            id_categoria: a.id_categoria,
            nome: a.nome.clone(),
            descricao: a.descricao.clone(),
        }
    }
}

// src/models/mod.rs
pub mod catalogo;
pub mod chamado;
pub mod chat;
pub mod estatisticas;
pub mod matricula;
pub mod pagamento;
pub mod turma;
pub mod user;
pub mod validacao;

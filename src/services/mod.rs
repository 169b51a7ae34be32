// src/services/mod.rs
pub mod atividade_service;
pub mod auth_service;
pub mod categoria_service;
pub mod chamado_service;
pub mod chat_service;
pub mod estatisticas_service;
pub mod matricula_service;
pub mod pagamento_service;
pub mod turma_service;
pub mod user_service;

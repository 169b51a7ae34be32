// src/web/mod.rs
pub mod admin_handlers;
pub mod auth_handlers;
pub mod catalogo_handlers;
pub mod chamado_handlers;
pub mod chat_handlers;
pub mod feedback;
pub mod matricula_handlers;
pub mod mw_auth;
pub mod mw_rate_limit;
pub mod mw_roles;
pub mod routes;
pub mod user_handlers;

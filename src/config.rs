// src/config.rs
use crate::error::{AppError, AppResult};
use std::{env, net::SocketAddr, str::FromStr, time::Duration};

/// Configuração lida das variáveis de ambiente (e do `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,
    pub login_rate_limit_max: usize,
    pub login_rate_limit_window: Duration,
    pub reset_token_ttl_minutes: i64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Só com proxy reverso à frente: usa X-Forwarded-For como chave do limitador.
    pub trust_proxy: bool,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|nome| env::var(nome).ok())
    }

    /// Constrói a configuração a partir de uma função de consulta (testável sem env).
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL não definida".into()))?;

        Ok(Config {
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            rate_limit_max: parse_or(&lookup, "RATE_LIMIT_MAX", 10)?,
            rate_limit_window: Duration::from_secs(parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 60)?),
            login_rate_limit_max: parse_or(&lookup, "LOGIN_RATE_LIMIT_MAX", 5)?,
            login_rate_limit_window: Duration::from_secs(parse_or(
                &lookup,
                "LOGIN_RATE_LIMIT_WINDOW_SECS",
                300,
            )?),
            reset_token_ttl_minutes: parse_or(&lookup, "RESET_TOKEN_TTL_MINUTES", 60)?,
            admin_email: lookup("ADMIN_EMAIL").filter(|v| !v.trim().is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
            trust_proxy: parse_or(&lookup, "TRUST_PROXY", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, nome: &str, padrao: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(nome) {
        Some(valor) if !valor.trim().is_empty() => valor
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} inválida: '{}'", nome, valor))),
        _ => Ok(padrao),
    }
}

// src/main.rs

// --- Declaração dos Módulos ---
mod config;
mod db;
mod error;
mod models;
mod rate_limit;
mod services;
mod state;
mod templates;
mod web;

// --- Imports ---
use crate::{config::Config, services::user_service, state::AppState};
use axum::serve;
use std::net::SocketAddr;
use time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Configuração: {}", e))?;

    // --- Configuração do Logging (Tracing) ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "agendafit=debug,tower_http=info,sqlx=warn,tower_sessions=info".into()
        }))
        .with(fmt::layer())
        .init();

    tracing::info!("🚀 Iniciando servidor AgendaFit...");

    // --- Configuração da Base de Dados ---
    let db_pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Falha crítica ao inicializar a base de dados: {}", e);
            return Err(anyhow::anyhow!("Falha ao conectar/migrar DB: {}", e));
        }
    };

    if let (Some(email), Some(senha)) = (&config.admin_email, &config.admin_password) {
        user_service::seed_admin(&db_pool, email, senha)
            .await
            .map_err(|e| anyhow::anyhow!("Falha ao criar administrador inicial: {}", e))?;
    }

    // --- Configuração das Sessões ---
    let session_store = SqliteStore::new(db_pool.clone())
        .with_table_name("sessions")
        .map_err(|e| anyhow::anyhow!("Falha ao criar session store: {}", e))?;
    session_store.migrate().await?;

    let session_store_clone = session_store.clone();
    tokio::spawn(async move {
        if let Err(e) = session_store_clone
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 60))
            .await
        {
            tracing::error!("Erro na task de limpeza de sessões: {:?}", e);
        }
    });
    tracing::info!("🧹 Tarefa de limpeza de sessões iniciada.");

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)));

    // --- Criação do Estado da Aplicação ---
    let addr = config.bind_addr;
    let app_state = AppState::new(db_pool, config);

    let limitadores = [app_state.limitador_admin.clone(), app_state.limitador_login.clone()];
    tokio::spawn(async move {
        let mut intervalo = tokio::time::interval(tokio::time::Duration::from_secs(10 * 60));
        loop {
            intervalo.tick().await;
            for limitador in &limitadores {
                let removidas = limitador.limpar().await;
                if removidas > 0 {
                    tracing::debug!("Limitador: {} chave(s) expirada(s) removida(s).", removidas);
                }
            }
        }
    });
    tracing::info!("🧹 Tarefa de limpeza dos limitadores iniciada.");

    // --- Configuração do Endereço e Listener ---
    tracing::info!("📡 Servidor escutando em http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Falha ao iniciar listener em {}: {}", addr, e);
            return Err(e.into());
        }
    };

    // --- Router e camadas ---
    let app = web::routes::create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CookieManagerLayer::new())
            .layer(session_layer),
    );

    // ConnectInfo alimenta a chave do limitador de pedidos
    if let Err(e) = serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await {
        tracing::error!("❌ Erro fatal no servidor: {}", e);
        return Err(e.into());
    }

    Ok(())
}

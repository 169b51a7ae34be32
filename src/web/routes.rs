// src/web/routes.rs
use crate::{
    state::AppState,
    web::{
        admin_handlers, auth_handlers, catalogo_handlers, chamado_handlers, chat_handlers,
        matricula_handlers, mw_auth, mw_rate_limit, mw_roles, user_handlers,
    },
};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/", get(|| async { Redirect::permanent("/login") }))
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/cadastrar", get(auth_handlers::show_cadastro_form).post(auth_handlers::handle_cadastro))
        .route(
            "/esqueci-senha",
            get(auth_handlers::show_esqueci_senha).post(auth_handlers::handle_esqueci_senha),
        )
        .route(
            "/redefinir-senha",
            get(auth_handlers::show_redefinir_senha).post(auth_handlers::handle_redefinir_senha),
        )
        .route("/chat/health", get(chat_handlers::health));

    // --- Rotas de Admin ---
    // O último route_layer corre primeiro: perfil, depois limite de escritas
    let admin_routes = Router::new()
        .route("/usuarios/listar", get(admin_handlers::show_admin_users_page))
        .route(
            "/usuarios/cadastrar",
            get(admin_handlers::show_create_user_form).post(admin_handlers::handle_create_user),
        )
        .route(
            "/usuarios/editar/{id}",
            get(admin_handlers::show_edit_user_form).post(admin_handlers::handle_edit_user),
        )
        .route("/usuarios/senha/{id}", post(admin_handlers::handle_change_password))
        .route("/usuarios/excluir/{id}", post(admin_handlers::handle_delete_user))
        .route("/categorias/listar", get(catalogo_handlers::listar_categorias))
        .route(
            "/categorias/cadastrar",
            get(catalogo_handlers::show_cadastrar_categoria).post(catalogo_handlers::handle_cadastrar_categoria),
        )
        .route(
            "/categorias/editar/{id}",
            get(catalogo_handlers::show_editar_categoria).post(catalogo_handlers::handle_editar_categoria),
        )
        .route("/categorias/excluir/{id}", post(catalogo_handlers::handle_excluir_categoria))
        .route("/atividades/listar", get(catalogo_handlers::listar_atividades))
        .route(
            "/atividades/cadastrar",
            get(catalogo_handlers::show_cadastrar_atividade).post(catalogo_handlers::handle_cadastrar_atividade),
        )
        .route(
            "/atividades/editar/{id}",
            get(catalogo_handlers::show_editar_atividade).post(catalogo_handlers::handle_editar_atividade),
        )
        .route("/atividades/excluir/{id}", post(catalogo_handlers::handle_excluir_atividade))
        .route("/turmas/listar", get(catalogo_handlers::listar_turmas))
        .route(
            "/turmas/cadastrar",
            get(catalogo_handlers::show_cadastrar_turma).post(catalogo_handlers::handle_cadastrar_turma),
        )
        .route(
            "/turmas/editar/{id}",
            get(catalogo_handlers::show_editar_turma).post(catalogo_handlers::handle_editar_turma),
        )
        .route("/turmas/excluir/{id}", post(catalogo_handlers::handle_excluir_turma))
        .route("/matriculas/listar", get(matricula_handlers::listar_matriculas))
        .route(
            "/matriculas/cadastrar",
            get(matricula_handlers::show_cadastrar_matricula).post(matricula_handlers::handle_cadastrar_matricula),
        )
        .route(
            "/matriculas/editar/{id}",
            get(matricula_handlers::show_editar_matricula).post(matricula_handlers::handle_editar_matricula),
        )
        .route("/matriculas/excluir/{id}", post(matricula_handlers::handle_excluir_matricula))
        .route("/pagamentos/listar", get(matricula_handlers::listar_pagamentos))
        .route(
            "/pagamentos/cadastrar",
            get(matricula_handlers::show_cadastrar_pagamento).post(matricula_handlers::handle_cadastrar_pagamento),
        )
        .route(
            "/pagamentos/editar/{id}",
            get(matricula_handlers::show_editar_pagamento).post(matricula_handlers::handle_editar_pagamento),
        )
        .route("/pagamentos/excluir/{id}", post(matricula_handlers::handle_excluir_pagamento))
        .route("/chamados/listar", get(chamado_handlers::listar_todos))
        .route("/chamados/{id}", get(chamado_handlers::detalhe_admin))
        .route("/chamados/{id}/responder", post(chamado_handlers::responder_admin))
        .route("/chamados/{id}/reabrir", post(chamado_handlers::reabrir))
        .route("/chamados/excluir/{id}", post(chamado_handlers::excluir))
        .route("/estatisticas/dashboard", get(admin_handlers::show_dashboard))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_rate_limit::limitar_escritas_admin,
        ))
        .route_layer(middleware::from_fn(mw_roles::require_admin));

    let aluno_routes = Router::new()
        .route("/turmas", get(matricula_handlers::aluno_turmas))
        .route("/matriculas", get(matricula_handlers::aluno_matriculas))
        .route("/matriculas/nova", post(matricula_handlers::aluno_matricular))
        .route("/pagamentos", get(matricula_handlers::aluno_pagamentos))
        .route_layer(middleware::from_fn(mw_roles::require_aluno));

    let professor_routes = Router::new()
        .route("/turmas", get(matricula_handlers::professor_turmas))
        .route_layer(middleware::from_fn(mw_roles::require_professor));

    // --- Rotas Autenticadas (páginas HTML) ---
    let authenticated_routes = Router::new()
        .route("/usuario", get(user_handlers::user_page_handler))
        .route("/usuario/perfil", get(user_handlers::show_perfil).post(user_handlers::handle_perfil))
        .route(
            "/usuario/alterar-senha",
            get(user_handlers::show_alterar_senha).post(user_handlers::handle_alterar_senha),
        )
        .route("/chamados/listar", get(chamado_handlers::listar_meus))
        .route(
            "/chamados/cadastrar",
            get(chamado_handlers::show_novo_chamado).post(chamado_handlers::handle_novo_chamado),
        )
        .route("/chamados/{id}", get(chamado_handlers::detalhe_meu))
        .route("/chamados/{id}/responder", post(chamado_handlers::responder_meu))
        .nest("/admin", admin_routes)
        .nest("/aluno", aluno_routes)
        .nest("/professor", professor_routes)
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth,
        ));

    // --- API do chat (JSON, 401 sem sessão) ---
    let chat_routes = Router::new()
        .route("/chat/salas", post(chat_handlers::criar_sala))
        .route("/chat/conversas", get(chat_handlers::listar_conversas))
        .route("/chat/mensagens", post(chat_handlers::enviar_mensagem))
        .route("/chat/mensagens/{sala_id}", get(chat_handlers::listar_mensagens))
        .route("/chat/mensagens/lidas/{sala_id}", post(chat_handlers::marcar_como_lidas))
        .route("/chat/mensagens/nao-lidas/total", get(chat_handlers::total_nao_lidas))
        .route("/chat/usuarios/buscar", get(chat_handlers::buscar_usuarios))
        .route("/chat/ws", get(chat_handlers::chat_websocket_handler))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_auth::require_auth_api,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(chat_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        db::create_test_pool,
        models::user::Perfil,
        services::{categoria_service, user_service::tests::criar_usuario},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    async fn app_com(pares: &[(&str, &str)]) -> (Router, sqlx::SqlitePool) {
        let pool = create_test_pool().await;
        let mut valores: Vec<(String, String)> = vec![("DATABASE_URL".into(), "sqlite::memory:".into())];
        valores.extend(pares.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        let config = Config::from_lookup(|nome| {
            valores.iter().find(|(k, _)| k == nome).map(|(_, v)| v.clone())
        })
        .unwrap();
        let app = create_router(AppState::new(pool.clone(), config))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));
        (app, pool)
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, corpo: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(corpo.to_string())).unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or("")
    }

    /// Faz login e devolve o cookie de sessão ("id=...").
    async fn login(app: &Router, email: &str) -> String {
        let corpo = format!("email={}&password=senha1234", urlencoding::encode(email));
        let resp = app.clone().oneshot(post_form("/login", &corpo, None)).await.unwrap();
        assert_eq!(location(&resp), "/usuario");
        let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn raiz_e_paginas_protegidas_levam_ao_login() {
        let (app, _pool) = app_com(&[]).await;

        let resp = app.clone().oneshot(get("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(location(&resp), "/login");

        let resp = app.clone().oneshot(get("/admin/turmas/listar", None)).await.unwrap();
        assert!(resp.status().is_redirection());
        assert_eq!(location(&resp), "/login");
    }

    #[tokio::test]
    async fn api_do_chat_responde_401_sem_sessao() {
        let (app, _pool) = app_com(&[]).await;

        let resp = app.clone().oneshot(get("/chat/conversas", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app.oneshot(get("/chat/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn perfis_so_acedem_a_sua_area() {
        let (app, pool) = app_com(&[]).await;
        criar_usuario(&pool, "aluno@agendafit.test", Perfil::Aluno).await;
        let cookie = login(&app, "aluno@agendafit.test").await;

        let resp = app.clone().oneshot(get("/aluno/turmas", Some(&cookie))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.clone().oneshot(get("/admin/usuarios/listar", Some(&cookie))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app.oneshot(get("/professor/turmas", Some(&cookie))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_com_senha_errada_mostra_o_formulario() {
        let (app, pool) = app_com(&[]).await;
        criar_usuario(&pool, "prof@agendafit.test", Perfil::Professor).await;

        let resp = app
            .oneshot(post_form("/login", "email=prof%40agendafit.test&password=errada", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn tentativas_de_login_sao_limitadas() {
        let (app, _pool) = app_com(&[("LOGIN_RATE_LIMIT_MAX", "2")]).await;
        let corpo = "email=ninguem%40agendafit.test&password=x";

        for _ in 0..2 {
            let resp = app.clone().oneshot(post_form("/login", corpo, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = app.oneshot(post_form("/login", corpo, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    fn login_via_proxy(xff: &str) -> Request<Body> {
        let mut req = post_form("/login", "email=ninguem%40agendafit.test&password=x", None);
        req.headers_mut().insert("x-forwarded-for", xff.parse().unwrap());
        req
    }

    #[tokio::test]
    async fn trocar_x_forwarded_for_nao_contorna_o_limite() {
        let (app, _pool) = app_com(&[("LOGIN_RATE_LIMIT_MAX", "1")]).await;

        let resp = app.clone().oneshot(login_via_proxy("10.0.0.0")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        for i in 1..50 {
            let resp = app.clone().oneshot(login_via_proxy(&format!("10.0.0.{}", i))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }

    #[tokio::test]
    async fn com_trust_proxy_cada_ip_encaminhado_tem_o_seu_limite() {
        let (app, _pool) = app_com(&[("LOGIN_RATE_LIMIT_MAX", "1"), ("TRUST_PROXY", "true")]).await;

        for xff in ["10.0.0.1", "10.0.0.2, 172.16.0.1"] {
            let resp = app.clone().oneshot(login_via_proxy(xff)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = app.clone().oneshot(login_via_proxy("10.0.0.1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        // cabeçalho inválido não abre uma chave nova: cai em "local", ainda livre
        let resp = app.clone().oneshot(login_via_proxy("x/y")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = app.oneshot(login_via_proxy("z/w")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn escritas_do_admin_sao_limitadas() {
        let (app, pool) = app_com(&[("RATE_LIMIT_MAX", "2")]).await;
        criar_usuario(&pool, "admin@agendafit.test", Perfil::Admin).await;
        let cookie = login(&app, "admin@agendafit.test").await;

        for nome in ["Dança", "Lutas"] {
            let corpo = format!("nome={}&descricao=", urlencoding::encode(nome));
            let resp = app
                .clone()
                .oneshot(post_form("/admin/categorias/cadastrar", &corpo, Some(&cookie)))
                .await
                .unwrap();
            assert!(location(&resp).starts_with("/admin/categorias/listar?success="));
        }
        let resp = app
            .clone()
            .oneshot(post_form("/admin/categorias/cadastrar", "nome=Yoga&descricao=", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(categoria_service::contar(&pool).await.unwrap(), 2);

        // Leituras não contam para o limite
        let resp = app.oneshot(get("/admin/categorias/listar", Some(&cookie))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn exclusao_bloqueada_volta_a_lista_com_erro() {
        let (app, pool) = app_com(&[]).await;
        criar_usuario(&pool, "admin@agendafit.test", Perfil::Admin).await;
        let cookie = login(&app, "admin@agendafit.test").await;
        let turma = crate::services::turma_service::tests::criar_turma(&pool, 5).await;
        let categoria: i64 = sqlx::query_scalar(
            "SELECT a.id_categoria FROM turmas t JOIN atividades a ON a.id = t.id_atividade WHERE t.id = ?1",
        )
        .bind(turma)
        .fetch_one(&pool)
        .await
        .unwrap();

        let uri = format!("/admin/categorias/excluir/{}", categoria);
        let resp = app.oneshot(post_form(&uri, "", Some(&cookie))).await.unwrap();
        assert!(location(&resp).starts_with("/admin/categorias/listar?error="));
        assert_eq!(categoria_service::contar(&pool).await.unwrap(), 1);
    }
}

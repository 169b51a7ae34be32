// src/services/user_service.rs
use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::user::{
        AlterarSenhaForm, CadastroForm, DadosUsuario, NovoUsuarioForm, Perfil, RedefinirSenhaForm,
        User, UsuarioResumo,
    },
    services::auth_service,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use validator::Validate;

const USER_COLUMNS: &str = "id, nome, email, password_hash, perfil, data_nascimento, \
    numero_documento, telefone, token_redefinicao, data_token, data_cadastro, data_atualizacao";

/// Busca um utilizador na base de dados pelo seu ID.
pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por ID: {}", user_id);
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
    ))
    .bind(email.trim())
    .fetch_optional(db_pool)
    .await?;
    Ok(user)
}

/// Lista utilizadores, opcionalmente filtrados por perfil.
pub async fn find_all_users(db_pool: &SqlitePool, perfil: Option<Perfil>) -> AppResult<Vec<User>> {
    tracing::debug!("Buscando utilizadores (perfil: {:?})...", perfil);
    let users = match perfil {
        Some(perfil) => {
            sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE perfil = ?1 ORDER BY nome ASC"
            ))
            .bind(perfil)
            .fetch_all(db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY nome ASC"))
                .fetch_all(db_pool)
                .await?
        }
    };
    tracing::debug!("Encontrados {} utilizadores.", users.len());
    Ok(users)
}

/// Resumo dos utilizadores de um perfil (para selects de formulário).
pub async fn listar_resumo_por_perfil(
    db_pool: &SqlitePool,
    perfil: Perfil,
) -> AppResult<Vec<UsuarioResumo>> {
    let users = sqlx::query_as::<_, UsuarioResumo>(
        "SELECT id, nome, email, perfil FROM users WHERE perfil = ?1 ORDER BY nome ASC",
    )
    .bind(perfil)
    .fetch_all(db_pool)
    .await?;
    Ok(users)
}

pub async fn contar_por_perfil(db_pool: &SqlitePool, perfil: Perfil) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE perfil = ?1")
        .bind(perfil)
        .fetch_one(db_pool)
        .await?;
    Ok(total)
}

async fn email_em_uso(db_pool: &SqlitePool, email: &str, ignorar_id: Option<i64>) -> AppResult<bool> {
    let existe = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2",
    )
    .bind(email.trim())
    .bind(ignorar_id.unwrap_or(0))
    .fetch_one(db_pool)
    .await?;
    Ok(existe > 0)
}

async fn inserir_usuario(
    db_pool: &SqlitePool,
    dados: &DadosUsuario,
    senha: &str,
) -> AppResult<i64> {
    if email_em_uso(db_pool, &dados.email, None).await? {
        tracing::warn!("Cadastro recusado: e-mail '{}' já existe.", dados.email);
        return Err(AppError::EmailAlreadyExists);
    }

    let password_hash = auth_service::hash_password(senha).await?;
    let id = sqlx::query(
        r#"
        INSERT INTO users (nome, email, password_hash, perfil, data_nascimento, numero_documento, telefone)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(dados.nome.trim())
    .bind(dados.email.trim())
    .bind(&password_hash)
    .bind(dados.perfil)
    .bind(dados.data_nascimento())
    .bind(dados.numero_documento())
    .bind(dados.telefone())
    .execute(db_pool)
    .await
    .map_err(|e| map_unique_violation(e, AppError::EmailAlreadyExists))?
    .last_insert_rowid();

    tracing::info!("✅ Utilizador '{}' ({}) criado com id {}.", dados.email, dados.perfil, id);
    Ok(id)
}

/// Auto-registo público: o perfil é sempre Aluno.
pub async fn cadastrar_aluno(db_pool: &SqlitePool, form: &CadastroForm) -> AppResult<i64> {
    form.validate()?;
    let dados = DadosUsuario {
        nome: form.nome.clone(),
        email: form.email.clone(),
        perfil: Perfil::Aluno,
        ..DadosUsuario::default()
    };
    inserir_usuario(db_pool, &dados, &form.senha).await
}

/// Cadastro pelo administrador, com qualquer perfil.
pub async fn create_user(db_pool: &SqlitePool, form: &NovoUsuarioForm) -> AppResult<i64> {
    form.validate()?;
    inserir_usuario(db_pool, &form.dados, &form.senha).await
}

pub async fn update_user(db_pool: &SqlitePool, user_id: i64, dados: &DadosUsuario) -> AppResult<()> {
    dados.validate()?;
    if email_em_uso(db_pool, &dados.email, Some(user_id)).await? {
        return Err(AppError::EmailAlreadyExists);
    }

    let rows_affected = sqlx::query(
        r#"
        UPDATE users
        SET nome = ?1, email = ?2, perfil = ?3, data_nascimento = ?4,
            numero_documento = ?5, telefone = ?6, data_atualizacao = CURRENT_TIMESTAMP
        WHERE id = ?7
        "#,
    )
    .bind(dados.nome.trim())
    .bind(dados.email.trim())
    .bind(dados.perfil)
    .bind(dados.data_nascimento())
    .bind(dados.numero_documento())
    .bind(dados.telefone())
    .bind(user_id)
    .execute(db_pool)
    .await
    .map_err(|e| map_unique_violation(e, AppError::EmailAlreadyExists))?
    .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao atualizar dados: Utilizador '{}' não encontrado.", user_id);
        return Err(AppError::NotFound("Usuário não encontrado."));
    }
    tracing::info!("✅ Dados atualizados com sucesso para user: {}", user_id);
    Ok(())
}

/// Edição do próprio perfil: o perfil de acesso não muda.
pub async fn update_profile(db_pool: &SqlitePool, user: &User, dados: &DadosUsuario) -> AppResult<()> {
    let dados = DadosUsuario { perfil: user.perfil, ..dados.clone() };
    update_user(db_pool, user.id, &dados).await
}

pub async fn update_user_password(
    db_pool: &SqlitePool,
    user_id: i64,
    new_raw_password: &str,
) -> AppResult<()> {
    tracing::info!("Tentando alterar senha para user: {}", user_id);
    let new_password_hash = auth_service::hash_password(new_raw_password).await?;

    let rows_affected = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?1, token_redefinicao = NULL, data_token = NULL,
            data_atualizacao = CURRENT_TIMESTAMP
        WHERE id = ?2
        "#,
    )
    .bind(&new_password_hash)
    .bind(user_id)
    .execute(db_pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao alterar senha: Utilizador '{}' não encontrado.", user_id);
        Err(AppError::NotFound("Usuário não encontrado."))
    } else {
        tracing::info!("✅ Senha alterada com sucesso para user: {}", user_id);
        Ok(())
    }
}

/// Troca de senha pelo próprio utilizador: exige a senha atual.
pub async fn alterar_propria_senha(
    db_pool: &SqlitePool,
    user: &User,
    form: &AlterarSenhaForm,
) -> AppResult<()> {
    form.validate()?;
    if !auth_service::verify_password(&form.senha_atual, &user.password_hash).await? {
        return Err(AppError::BadRequest("A senha atual está incorreta.".into()));
    }
    update_user_password(db_pool, user.id, &form.nova_senha).await
}

/// Remove um utilizador sem turmas nem matrículas. Os chamados e o chat vão em cascata.
pub async fn delete_user(db_pool: &SqlitePool, user_id: i64, solicitante_id: i64) -> AppResult<()> {
    if user_id == solicitante_id {
        return Err(AppError::BadRequest("Não é possível excluir o próprio usuário.".into()));
    }
    if find_user_by_id(db_pool, user_id).await?.is_none() {
        return Err(AppError::NotFound("Usuário não encontrado."));
    }

    let turmas = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM turmas WHERE id_professor = ?1")
        .bind(user_id)
        .fetch_one(db_pool)
        .await?;
    if turmas > 0 {
        return Err(AppError::DeleteBlocked(format!(
            "Não é possível excluir este usuário pois ele é professor de {} turma(s).",
            turmas
        )));
    }

    let matriculas = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matriculas WHERE id_aluno = ?1")
        .bind(user_id)
        .fetch_one(db_pool)
        .await?;
    if matriculas > 0 {
        return Err(AppError::DeleteBlocked(format!(
            "Não é possível excluir este usuário pois há {} matrícula(s) associada(s).",
            matriculas
        )));
    }

    sqlx::query("DELETE FROM users WHERE id = ?1").bind(user_id).execute(db_pool).await?;
    tracing::info!("🗑️ Utilizador {} removido.", user_id);
    Ok(())
}

/// Gera o token de redefinição. Devolve `None` se o e-mail não existir
/// (o handler responde da mesma forma nos dois casos).
pub async fn gerar_token_redefinicao(
    db_pool: &SqlitePool,
    email: &str,
    validade_minutos: i64,
) -> AppResult<Option<String>> {
    let Some(user) = find_user_by_email(db_pool, email).await? else {
        tracing::info!("Pedido de redefinição para e-mail desconhecido: {}", email);
        return Ok(None);
    };

    let token = uuid::Uuid::new_v4().to_string();
    let expira_em = Utc::now().naive_utc() + Duration::minutes(validade_minutos);
    sqlx::query("UPDATE users SET token_redefinicao = ?1, data_token = ?2 WHERE id = ?3")
        .bind(&token)
        .bind(expira_em)
        .bind(user.id)
        .execute(db_pool)
        .await?;

    tracing::info!("Token de redefinição gerado para user {}", user.id);
    Ok(Some(token))
}

/// Utilizador dono de um token ainda dentro da validade.
pub async fn find_by_reset_token(db_pool: &SqlitePool, token: &str) -> AppResult<Option<User>> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE token_redefinicao = ?1"
    ))
    .bind(token.trim())
    .fetch_optional(db_pool)
    .await?;

    let agora = Utc::now().naive_utc();
    Ok(user.filter(|u| u.data_token.is_some_and(|expira| expira > agora)))
}

pub async fn redefinir_senha(db_pool: &SqlitePool, form: &RedefinirSenhaForm) -> AppResult<()> {
    let user = find_by_reset_token(db_pool, &form.token).await?.ok_or(AppError::InvalidToken)?;
    form.validate()?;
    // update_user_password limpa o token
    update_user_password(db_pool, user.id, &form.nova_senha).await
}

/// Pesquisa para iniciar conversas: exclui o próprio e os administradores.
pub async fn buscar_para_chat(
    db_pool: &SqlitePool,
    termo: &str,
    solicitante_id: i64,
) -> AppResult<Vec<UsuarioResumo>> {
    let padrao = format!("%{}%", termo.trim());
    let users = sqlx::query_as::<_, UsuarioResumo>(
        r#"
        SELECT id, nome, email, perfil FROM users
        WHERE (nome LIKE ?1 OR email LIKE ?1) AND id != ?2 AND perfil != ?3
        ORDER BY nome ASC
        LIMIT 10
        "#,
    )
    .bind(padrao)
    .bind(solicitante_id)
    .bind(Perfil::Admin)
    .fetch_all(db_pool)
    .await?;
    Ok(users)
}

/// Cria o primeiro administrador quando ainda não existe nenhum.
pub async fn seed_admin(db_pool: &SqlitePool, email: &str, senha: &str) -> AppResult<bool> {
    if contar_por_perfil(db_pool, Perfil::Admin).await? > 0 {
        tracing::debug!("Administrador já existe, seed ignorado.");
        return Ok(false);
    }
    let dados = DadosUsuario {
        nome: "Administrador".into(),
        email: email.to_string(),
        perfil: Perfil::Admin,
        ..DadosUsuario::default()
    };
    inserir_usuario(db_pool, &dados, senha).await?;
    tracing::info!("👤 Administrador inicial '{}' criado.", email);
    Ok(true)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::create_test_pool;

    /// Insere um utilizador com a senha "senha1234" (custo bcrypt baixo para os testes).
    pub(crate) async fn criar_usuario(pool: &SqlitePool, email: &str, perfil: Perfil) -> i64 {
        let hash = bcrypt::hash("senha1234", 4).unwrap();
        sqlx::query("INSERT INTO users (nome, email, password_hash, perfil) VALUES (?1, ?2, ?3, ?4)")
            .bind(format!("Utilizador {}", email))
            .bind(email)
            .bind(hash)
            .bind(perfil)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    fn cadastro(email: &str) -> CadastroForm {
        CadastroForm {
            nome: "Maria Silva".into(),
            email: email.into(),
            senha: "segredo123".into(),
            confirmar_senha: "segredo123".into(),
        }
    }

    #[tokio::test]
    async fn cadastro_publico_cria_aluno() {
        let pool = create_test_pool().await;
        let id = cadastrar_aluno(&pool, &cadastro("maria@agendafit.test")).await.unwrap();
        let user = find_user_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.perfil, Perfil::Aluno);
        assert_ne!(user.password_hash, "segredo123");
    }

    #[tokio::test]
    async fn email_repetido_e_recusado_sem_distinguir_maiusculas() {
        let pool = create_test_pool().await;
        cadastrar_aluno(&pool, &cadastro("maria@agendafit.test")).await.unwrap();
        let erro = cadastrar_aluno(&pool, &cadastro("MARIA@agendafit.test")).await.unwrap_err();
        assert!(matches!(erro, AppError::EmailAlreadyExists));
    }

    #[tokio::test]
    async fn senhas_diferentes_falham_na_validacao() {
        let pool = create_test_pool().await;
        let mut form = cadastro("joao@agendafit.test");
        form.confirmar_senha = "outra1234".into();
        let erro = cadastrar_aluno(&pool, &form).await.unwrap_err();
        assert!(erro.user_message().contains("As senhas não coincidem."));
    }

    #[tokio::test]
    async fn professor_com_turma_nao_pode_ser_excluido() {
        let pool = create_test_pool().await;
        let admin = criar_usuario(&pool, "admin@agendafit.test", Perfil::Admin).await;
        let prof = criar_usuario(&pool, "prof@agendafit.test", Perfil::Professor).await;
        let cat = sqlx::query("INSERT INTO categorias (nome) VALUES ('Lutas')")
            .execute(&pool).await.unwrap().last_insert_rowid();
        let ativ = sqlx::query("INSERT INTO atividades (id_categoria, nome) VALUES (?1, 'Judo')")
            .bind(cat).execute(&pool).await.unwrap().last_insert_rowid();
        sqlx::query(
            "INSERT INTO turmas (nome, id_atividade, id_professor, horario_inicio, horario_fim, dias_semana, vagas)
             VALUES ('Judo A', ?1, ?2, '08:00', '09:00', 'Seg', 10)",
        )
        .bind(ativ).bind(prof).execute(&pool).await.unwrap();

        let erro = delete_user(&pool, prof, admin).await.unwrap_err();
        assert!(matches!(erro, AppError::DeleteBlocked(ref m) if m.contains("1 turma(s)")));
        assert!(find_user_by_id(&pool, prof).await.unwrap().is_some());

        let erro = delete_user(&pool, admin, admin).await.unwrap_err();
        assert!(matches!(erro, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn token_de_redefinicao_vale_uma_vez() {
        let pool = create_test_pool().await;
        let id = criar_usuario(&pool, "rui@agendafit.test", Perfil::Aluno).await;

        assert!(gerar_token_redefinicao(&pool, "nao@existe.test", 60).await.unwrap().is_none());
        let token = gerar_token_redefinicao(&pool, "rui@agendafit.test", 60).await.unwrap().unwrap();

        let form = RedefinirSenhaForm { token: token.clone(), nova_senha: "novaSenha99".into() };
        redefinir_senha(&pool, &form).await.unwrap();

        let user = find_user_by_id(&pool, id).await.unwrap().unwrap();
        assert!(user.token_redefinicao.is_none());
        assert!(auth_service::verify_password("novaSenha99", &user.password_hash).await.unwrap());

        let erro = redefinir_senha(&pool, &form).await.unwrap_err();
        assert!(matches!(erro, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn token_expirado_e_recusado() {
        let pool = create_test_pool().await;
        criar_usuario(&pool, "eva@agendafit.test", Perfil::Aluno).await;
        let token = gerar_token_redefinicao(&pool, "eva@agendafit.test", -1).await.unwrap().unwrap();
        assert!(find_by_reset_token(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pesquisa_do_chat_exclui_admins_e_o_proprio() {
        let pool = create_test_pool().await;
        let eu = criar_usuario(&pool, "eu@agendafit.test", Perfil::Aluno).await;
        criar_usuario(&pool, "outro@agendafit.test", Perfil::Professor).await;
        criar_usuario(&pool, "chefe@agendafit.test", Perfil::Admin).await;

        let encontrados = buscar_para_chat(&pool, "agendafit", eu).await.unwrap();
        assert_eq!(encontrados.len(), 1);
        assert_eq!(encontrados[0].email, "outro@agendafit.test");
    }

    #[tokio::test]
    async fn seed_so_cria_o_primeiro_admin() {
        let pool = create_test_pool().await;
        assert!(seed_admin(&pool, "admin@agendafit.test", "admin1234").await.unwrap());
        assert!(!seed_admin(&pool, "outro@agendafit.test", "admin1234").await.unwrap());
        assert_eq!(contar_por_perfil(&pool, Perfil::Admin).await.unwrap(), 1);
    }
}

// src/web/feedback.rs
// Post/Redirect/Get com a mensagem na query string.
use crate::error::{AppError, AppResult};
use axum::response::Redirect;

fn com_mensagem(path: &str, chave: &str, mensagem: &str) -> Redirect {
    let separador = if path.contains('?') { '&' } else { '?' };
    let url = format!("{}{}{}={}", path, separador, chave, urlencoding::encode(mensagem));
    Redirect::to(&url)
}

pub fn sucesso(path: &str, mensagem: &str) -> Redirect {
    com_mensagem(path, "success", mensagem)
}

pub fn erro(path: &str, mensagem: &str) -> Redirect {
    com_mensagem(path, "error", mensagem)
}

/// Erros de negócio voltam para `path` com a mensagem; os restantes propagam.
pub fn redirecionar_erro(path: &str, e: AppError) -> AppResult<Redirect> {
    if e.is_user_facing() {
        tracing::debug!("Operação recusada ({}): {}", path, e);
        Ok(erro(path, &e.user_message()))
    } else {
        Err(e)
    }
}

/// Converte o resultado de uma operação num redirect com feedback.
pub fn concluir<T>(resultado: AppResult<T>, path: &str, mensagem_sucesso: &str) -> AppResult<Redirect> {
    match resultado {
        Ok(_) => Ok(sucesso(path, mensagem_sucesso)),
        Err(e) => redirecionar_erro(path, e),
    }
}

/// Mensagem a mostrar num formulário re-renderizado; erros internos propagam.
pub fn mensagem_formulario(e: AppError) -> AppResult<String> {
    if e.is_user_facing() {
        Ok(e.user_message())
    } else {
        Err(e)
    }
}

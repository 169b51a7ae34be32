// src/web/mw_rate_limit.rs
use crate::{error::AppError, state::AppState};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Primeiro valor de X-Forwarded-For, se tiver cara de endereço (até 64 bytes,
/// alfanumérico mais `.` `:` `-`).
fn forwarded_for_normalizado(headers: &HeaderMap) -> Option<String> {
    let bruto = headers.get("x-forwarded-for")?.to_str().ok()?;
    let primeiro = bruto.split(',').next()?.trim();
    if primeiro.is_empty() || primeiro.len() > 64 {
        return None;
    }
    primeiro
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
        .then(|| primeiro.to_string())
}

/// Chave do cliente: o endereço do peer. X-Forwarded-For só conta com
/// `confiar_proxy` ligado.
pub fn chave_cliente(headers: &HeaderMap, peer: Option<SocketAddr>, confiar_proxy: bool) -> String {
    confiar_proxy
        .then(|| forwarded_for_normalizado(headers))
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "local".to_string())
}

pub fn chave_do_pedido(request: &Request, confiar_proxy: bool) -> String {
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
    chave_cliente(request.headers(), peer, confiar_proxy)
}

/// Limita as operações de escrita (tudo o que não é GET) da área administrativa.
pub async fn limitar_escritas_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        let chave = chave_do_pedido(&request, state.config.trust_proxy);
        if !state.limitador_admin.verificar(&chave).await {
            return Err(AppError::RateLimited);
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn com_xff(valor: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(valor).unwrap());
        headers
    }

    #[test]
    fn sem_proxy_confiavel_ignora_o_cabecalho() {
        let headers = com_xff("10.0.0.1, 172.16.0.1");
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        assert_eq!(chave_cliente(&headers, Some(peer), false), "192.168.1.5");
        assert_eq!(chave_cliente(&headers, None, false), "local");
    }

    #[test]
    fn com_proxy_confiavel_usa_o_primeiro_ip() {
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        assert_eq!(chave_cliente(&com_xff("10.0.0.1, 172.16.0.1"), Some(peer), true), "10.0.0.1");
        assert_eq!(chave_cliente(&com_xff("2001:db8::1"), Some(peer), true), "2001:db8::1");
        assert_eq!(chave_cliente(&HeaderMap::new(), Some(peer), true), "192.168.1.5");
        assert_eq!(chave_cliente(&HeaderMap::new(), None, true), "local");
    }

    #[test]
    fn cabecalho_invalido_cai_no_peer() {
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        let longo = "1".repeat(65);
        for valor in ["", " , 10.0.0.1", "10.0.0.1/evil", "a b", longo.as_str()] {
            assert_eq!(chave_cliente(&com_xff(valor), Some(peer), true), "192.168.1.5", "{:?}", valor);
        }
    }
}

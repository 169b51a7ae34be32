// src/rate_limit.rs
// Janela deslizante em memória, por chave de cliente.
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max: usize,
    janela: Duration,
    tentativas: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max: usize, janela: Duration) -> Self {
        Self { max, janela, tentativas: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Regista o pedido e devolve `true` se ainda estiver dentro do limite.
    pub async fn verificar(&self, chave: &str) -> bool {
        self.verificar_em(chave, Instant::now()).await
    }

    pub async fn verificar_em(&self, chave: &str, agora: Instant) -> bool {
        let mut tentativas = self.tentativas.lock().await;
        let fila = tentativas.entry(chave.to_string()).or_default();

        while let Some(&mais_antiga) = fila.front() {
            if agora.duration_since(mais_antiga) >= self.janela {
                fila.pop_front();
            } else {
                break;
            }
        }

        if fila.len() >= self.max {
            tracing::warn!("Limite de pedidos atingido para '{}'", chave);
            return false;
        }
        fila.push_back(agora);
        true
    }

    /// Remove chaves sem pedidos recentes e devolve quantas saíram.
    pub async fn limpar(&self) -> usize {
        self.limpar_em(Instant::now()).await
    }

    pub async fn limpar_em(&self, agora: Instant) -> usize {
        let janela = self.janela;
        let mut tentativas = self.tentativas.lock().await;
        let antes = tentativas.len();
        tentativas.retain(|_, fila| {
            fila.back().is_some_and(|&ultima| agora.duration_since(ultima) < janela)
        });
        antes - tentativas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bloqueia_acima_do_maximo() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.verificar_em("1.2.3.4", t0).await);
        assert!(limiter.verificar_em("1.2.3.4", t0).await);
        assert!(!limiter.verificar_em("1.2.3.4", t0).await);
        // outra chave tem o seu próprio contador
        assert!(limiter.verificar_em("5.6.7.8", t0).await);
    }

    #[tokio::test]
    async fn libera_depois_da_janela() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(limiter.verificar_em("a", t0).await);
        assert!(!limiter.verificar_em("a", t0 + Duration::from_secs(5)).await);
        assert!(limiter.verificar_em("a", t0 + Duration::from_secs(11)).await);
    }

    #[tokio::test]
    async fn limpar_remove_chaves_expiradas() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        for i in 0..100 {
            assert!(limiter.verificar_em(&format!("10.0.0.{}", i), t0).await);
        }
        assert!(limiter.verificar_em("recente", t0 + Duration::from_secs(8)).await);

        assert_eq!(limiter.limpar_em(t0 + Duration::from_secs(15)).await, 100);
        let tentativas = limiter.tentativas.lock().await;
        assert_eq!(tentativas.len(), 1);
        assert!(tentativas.contains_key("recente"));
    }
}

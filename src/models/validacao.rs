// src/models/validacao.rs
// Validadores partilhados pelos formulários (usados via `#[validate(custom(...))]`).
use chrono::{Local, NaiveDate, NaiveTime};
use validator::{ValidationError, ValidationErrors};

fn erro(codigo: &'static str, mensagem: &'static str) -> ValidationError {
    ValidationError::new(codigo).with_message(mensagem.into())
}

/// Mínimo 8 caracteres, com pelo menos uma letra e um dígito.
pub fn validar_senha_forte(senha: &str) -> Result<(), ValidationError> {
    if senha.chars().count() < 8 {
        return Err(erro("senha_curta", "A senha deve ter pelo menos 8 caracteres."));
    }
    let tem_letra = senha.chars().any(|c| c.is_alphabetic());
    let tem_digito = senha.chars().any(|c| c.is_ascii_digit());
    if !tem_letra || !tem_digito {
        return Err(erro("senha_fraca", "A senha deve conter letras e números."));
    }
    Ok(())
}

/// Telefone opcional: vazio ou 10/11 dígitos (ignora pontuação).
pub fn validar_telefone(telefone: &str) -> Result<(), ValidationError> {
    let digitos = telefone.chars().filter(|c| c.is_ascii_digit()).count();
    if digitos == 0 && telefone.trim().is_empty() {
        return Ok(());
    }
    if !(10..=11).contains(&digitos) {
        return Err(erro("telefone", "Telefone deve ter 10 ou 11 dígitos."));
    }
    Ok(())
}

/// Data de nascimento opcional (AAAA-MM-DD), nunca no futuro nem há mais de 120 anos.
pub fn validar_data_nascimento(valor: &str) -> Result<(), ValidationError> {
    let valor = valor.trim();
    if valor.is_empty() {
        return Ok(());
    }
    let data = NaiveDate::parse_from_str(valor, "%Y-%m-%d")
        .map_err(|_| erro("data_nascimento", "Data de nascimento inválida."))?;
    let hoje = Local::now().date_naive();
    if data > hoje {
        return Err(erro("data_nascimento", "Data de nascimento não pode ser no futuro."));
    }
    if (hoje - data).num_days() / 365 > 120 {
        return Err(erro("data_nascimento", "Data de nascimento inválida."));
    }
    Ok(())
}

fn valor_positivo(valor: f64, mensagem: &'static str) -> Result<(), ValidationError> {
    // `range(exclusive_min)` deixaria passar `inf`
    if valor.is_finite() && valor > 0.0 {
        Ok(())
    } else {
        Err(erro("valor", mensagem))
    }
}

pub fn validar_mensalidade(valor: impl std::borrow::Borrow<f64>) -> Result<(), ValidationError> {
    valor_positivo(*valor.borrow(), "O valor da mensalidade deve ser maior que zero.")
}

pub fn validar_valor_pago(valor: impl std::borrow::Borrow<f64>) -> Result<(), ValidationError> {
    valor_positivo(*valor.borrow(), "O valor pago deve ser maior que zero.")
}

pub fn parse_horario(valor: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(valor.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(valor.trim(), "%H:%M:%S"))
        .ok()
}

/// Horários no formato HH:MM.
pub fn validar_horario(valor: &str) -> Result<(), ValidationError> {
    match parse_horario(valor) {
        Some(_) => Ok(()),
        None => Err(erro("horario", "Horário deve estar no formato HH:MM.")),
    }
}

/// Achata os erros de validação em mensagens legíveis, ordenadas por campo.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut campos: Vec<_> = errors.field_errors().into_iter().collect();
    campos.sort_by(|a, b| a.0.cmp(&b.0));

    let mut mensagens: Vec<String> = campos
        .into_iter()
        .flat_map(|(campo, erros)| {
            erros.iter().map(move |e| match &e.message {
                Some(m) => m.to_string(),
                None => format!("Valor inválido no campo '{}'.", campo),
            })
        })
        .collect();

    // Erros de structs aninhadas (ex: NovoUsuarioForm.dados)
    for (_, erro) in errors.errors() {
        if let validator::ValidationErrorsKind::Struct(interno) = erro {
            mensagens.extend(validation_messages(interno));
        }
    }
    mensagens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn senha_exige_tamanho_letras_e_digitos() {
        assert!(validar_senha_forte("abc123").is_err());
        assert!(validar_senha_forte("abcdefgh").is_err());
        assert!(validar_senha_forte("12345678").is_err());
        assert!(validar_senha_forte("senha123").is_ok());
    }

    #[test]
    fn telefone_vazio_ou_com_dez_a_onze_digitos() {
        assert!(validar_telefone("").is_ok());
        assert!(validar_telefone("(11) 98765-4321").is_ok());
        assert!(validar_telefone("1234").is_err());
    }

    #[test]
    fn data_nascimento_no_futuro_e_rejeitada() {
        let amanha = Local::now().date_naive() + chrono::Duration::days(1);
        assert!(validar_data_nascimento(&amanha.format("%Y-%m-%d").to_string()).is_err());
        assert!(validar_data_nascimento("1990-05-10").is_ok());
        assert!(validar_data_nascimento("10/05/1990").is_err());
        assert!(validar_data_nascimento("").is_ok());
    }

    #[test]
    fn valores_tem_de_ser_finitos_e_positivos() {
        assert!(validar_mensalidade(&120.0).is_ok());
        assert!(validar_valor_pago(&0.01).is_ok());
        for valor in [0.0, -1.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(validar_mensalidade(&valor).is_err(), "{}", valor);
            assert!(validar_valor_pago(&valor).is_err(), "{}", valor);
        }
    }

    #[test]
    fn horario_aceita_hh_mm() {
        assert!(validar_horario("07:30").is_ok());
        assert!(validar_horario("25:00").is_err());
        assert!(validar_horario("7h").is_err());
    }
}

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// ── Remote API errors ──

/// Failure of a call to the Remote Business API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, timeout, connection reset, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP 401. The bearer token is missing, expired or the credentials are wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx status. `message` is the server's `message` field, if any.
    #[error("request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },

    /// 2xx with a body we could not decode.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// The message the backend attached to the failure, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } => Some(message),
            Self::NotFound(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Text to show the visitor: the server's own message or `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ── Form validation ──

/// Field-level validation messages for a form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, &'static str>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: &'static str) {
        self.0.insert(field, message);
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when no field failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), StepError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(StepError::InvalidForm(self))
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().copied().collect();
        f.write_str(&messages.join("\n"))
    }
}

// ── Wizard step errors ──

/// Why a wizard action did not go through. `Display` is the inline message
/// shown to the visitor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("Por favor, selecione uma data")]
    MissingDate,

    #[error("Por favor, selecione um horário")]
    MissingSlot,

    #[error("O horário {time} não está disponível")]
    SlotUnavailable { time: String },

    #[error("Por favor, selecione um profissional")]
    MissingProfessional,

    #[error("Profissional indisponível neste horário")]
    ProfessionalUnavailable,

    #[error("Por favor, selecione um esporte")]
    MissingSport,

    #[error("Por favor, selecione um pet")]
    MissingPet,

    #[error("Você precisa estar logado para continuar.")]
    NotAuthenticated,

    #[error("Você precisa estar logado para ver seus pets.")]
    PetsRequireLogin,

    #[error("Você precisa estar logado para aplicar um cupom.")]
    VoucherRequiresLogin,

    #[error("Você precisa estar logado para agendar.")]
    BookingRequiresLogin,

    #[error("Um cupom já foi aplicado.")]
    VoucherAlreadyApplied,

    #[error("Endereço é obrigatório")]
    AddressRequired,

    #[error("Todos os campos são obrigatórios.")]
    IncompletePet,

    #[error("{0}")]
    InvalidForm(FormErrors),

    #[error("Email ou senha incorretos")]
    InvalidCredentials,

    #[error("Sua sessão expirou. Entre novamente.")]
    SessionExpired,

    #[error("{0}")]
    Remote(String),

    #[error("Esta ação não está disponível nesta etapa.")]
    WrongStep,
}

impl StepError {
    /// Map a remote failure onto the inline message, preferring the server's text.
    pub fn remote(err: &ApiError, fallback: &str) -> Self {
        Self::Remote(err.user_message(fallback))
    }
}

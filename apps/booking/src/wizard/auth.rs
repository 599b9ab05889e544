//! Step 2: login and registration forms.

use crate::error::{FormErrors, StepError};
use crate::models::{LoginRequest, RegisterRequest};

const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Countries a visitor can register from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Country {
    #[default]
    Brasil,
    Uruguai,
}

impl Country {
    pub fn name(self) -> &'static str {
        match self {
            Self::Brasil => "Brasil",
            Self::Uruguai => "Uruguai",
        }
    }

    /// International dialing prefix, e.g. `+55`.
    pub fn phone_prefix(self) -> &'static str {
        match self {
            Self::Brasil => "+55",
            Self::Uruguai => "+598",
        }
    }

    /// Number of digits a local phone number must have.
    pub fn phone_digits(self) -> usize {
        match self {
            Self::Brasil => 11,
            Self::Uruguai => 8,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Brasil" => Some(Self::Brasil),
            "Uruguai" => Some(Self::Uruguai),
            _ => None,
        }
    }
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Display formatting while typing: `(11) 98765-4321` or `9876 5432`.
pub fn format_phone(country: Country, raw: &str) -> String {
    let n = digits(raw);
    match country {
        Country::Brasil => match n.len() {
            0..=2 => format!("({n}"),
            3..=7 => format!("({}) {}", &n[..2], &n[2..]),
            8..=11 => format!("({}) {}-{}", &n[..2], &n[2..7], &n[7..]),
            _ => format!("({}) {}-{}", &n[..2], &n[2..7], &n[7..11]),
        },
        Country::Uruguai => match n.len() {
            0..=4 => n,
            5..=8 => format!("{} {}", &n[..4], &n[4..]),
            _ => format!("{} {}", &n[..4], &n[4..8]),
        },
    }
}

/// Shape check only: something, `@`, something, `.`, something, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn check_email(email: &str, errors: &mut FormErrors) {
    let email = email.trim();
    if email.is_empty() {
        errors.add("email", "Email é obrigatório");
    } else if !is_valid_email(email) {
        errors.add("email", "Email é inválido");
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), StepError> {
        let mut errors = FormErrors::new();
        check_email(&self.email, &mut errors);
        errors.into_result()
    }

    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub country: Country,
    pub phone: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), StepError> {
        let mut errors = FormErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "Nome é obrigatório");
        }
        check_email(&self.email, &mut errors);
        let len = self.password.chars().count();
        if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
            errors.add("password", "A senha deve ter entre 6 e 20 caracteres");
        }
        if self.password != self.confirm_password {
            errors.add("confirm_password", "As senhas não coincidem");
        }
        if digits(&self.phone).len() != self.country.phone_digits() {
            errors.add("phone", "Telefone inválido");
        }
        errors.into_result()
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            country: self.country.name().to_string(),
            ddi: self.country.phone_prefix().trim_start_matches('+').to_string(),
            phone: format_phone(self.country, &self.phone),
        }
    }
}

/// Form state of the auth step.
#[derive(Debug, Clone, Default)]
pub struct AuthStep {
    pub mode: AuthMode,
    pub login: LoginForm,
    pub register: RegisterForm,
}

impl AuthStep {
    /// Drops typed passwords; kept identifiers survive for a retry.
    pub fn clear_secrets(&mut self) {
        self.login.password.clear();
        self.register.password.clear();
        self.register.confirm_password.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_register() -> RegisterForm {
        RegisterForm {
            name: "Ana Lima".into(),
            email: "ana@lima.com".into(),
            password: "segredo1".into(),
            confirm_password: "segredo1".into(),
            country: Country::Brasil,
            phone: "11987654321".into(),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("a@.co"));
    }

    #[test]
    fn test_login_requires_email() {
        let form = LoginForm::default();
        match form.validate() {
            Err(StepError::InvalidForm(errors)) => {
                assert_eq!(errors.get("email"), Some("Email é obrigatório"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_login_trims_email() {
        let form = LoginForm {
            email: "  ana@lima.com ".into(),
            password: "x".into(),
        };
        assert!(form.validate().is_ok());
        assert_eq!(form.to_request().email, "ana@lima.com");
    }

    #[test]
    fn test_register_valid() {
        assert!(valid_register().validate().is_ok());
    }

    #[test]
    fn test_register_collects_all_errors() {
        let form = RegisterForm {
            password: "123".into(),
            confirm_password: "1234".into(),
            phone: "1234".into(),
            ..RegisterForm::default()
        };
        let Err(StepError::InvalidForm(errors)) = form.validate() else {
            panic!("expected form errors");
        };
        assert_eq!(errors.get("name"), Some("Nome é obrigatório"));
        assert_eq!(errors.get("email"), Some("Email é obrigatório"));
        assert_eq!(
            errors.get("password"),
            Some("A senha deve ter entre 6 e 20 caracteres")
        );
        assert_eq!(errors.get("confirm_password"), Some("As senhas não coincidem"));
        assert_eq!(errors.get("phone"), Some("Telefone inválido"));
    }

    #[test]
    fn test_register_phone_length_per_country() {
        let mut form = valid_register();
        form.country = Country::Uruguai;
        assert!(form.validate().is_err());
        form.phone = "9876 5432".into();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_register_request_payload() {
        let request = valid_register().to_request();
        assert_eq!(request.ddi, "55");
        assert_eq!(request.country, "Brasil");
        assert_eq!(request.phone, "(11) 98765-4321");
    }

    #[test]
    fn test_format_phone_progressive() {
        assert_eq!(format_phone(Country::Brasil, "1"), "(1");
        assert_eq!(format_phone(Country::Brasil, "11987"), "(11) 987");
        assert_eq!(format_phone(Country::Brasil, "119876543210000"), "(11) 98765-4321");
        assert_eq!(format_phone(Country::Uruguai, "987"), "987");
        assert_eq!(format_phone(Country::Uruguai, "98765432"), "9876 5432");
    }

    #[test]
    fn test_clear_secrets_keeps_email() {
        let mut step = AuthStep::default();
        step.login.email = "a@b.co".into();
        step.login.password = "pw".into();
        step.clear_secrets();
        assert_eq!(step.login.email, "a@b.co");
        assert!(step.login.password.is_empty());
    }
}

//! Inline-button callback data. Every button carries one `Action`, encoded
//! as `name` or `name:arg` (Telegram caps callback data at 64 bytes).

use buzke_booking::models::PetSex;
use buzke_booking::wizard::RecurrenceDuration;
use chrono::NaiveDate;

/// Field a free-text reply fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Email,
    Password,
    Name,
    ConfirmPassword,
    Phone,
    PetName,
    Address,
    Voucher,
}

impl Input {
    fn code(self) -> &'static str {
        match self {
            Input::Email => "email",
            Input::Password => "password",
            Input::Name => "name",
            Input::ConfirmPassword => "confirm",
            Input::Phone => "phone",
            Input::PetName => "petname",
            Input::Address => "address",
            Input::Voucher => "voucher",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        [
            Input::Email,
            Input::Password,
            Input::Name,
            Input::ConfirmPassword,
            Input::Phone,
            Input::PetName,
            Input::Address,
            Input::Voucher,
        ]
        .into_iter()
        .find(|i| i.code() == code)
    }

    /// Prompt sent when the field is requested.
    pub fn prompt(self) -> &'static str {
        match self {
            Input::Email => "Digite seu email:",
            Input::Password => "Digite sua senha:",
            Input::Name => "Digite seu nome completo:",
            Input::ConfirmPassword => "Confirme sua senha:",
            Input::Phone => "Digite seu telefone (somente números):",
            Input::PetName => "Qual o nome do pet?",
            Input::Address => "Digite o endereço completo para o atendimento:",
            Input::Voucher => "Digite o código do cupom:",
        }
    }

    /// Replies to these prompts are deleted from the chat.
    pub fn is_secret(self) -> bool {
        matches!(self, Input::Password | Input::ConfirmPassword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Service catalog for a day.
    Services(NaiveDate),
    Hours,
    Reviews,
    /// Open the wizard for a service.
    OpenService(i64),
    /// Show the month starting at this date in the calendar.
    Month(NaiveDate),
    Date(NaiveDate),
    Slot(String),
    Professional(i64),
    Sport(i64),
    Next,
    Back,
    LoginMode,
    RegisterMode,
    ToggleCountry,
    SubmitAuth,
    Logout,
    Ask(Input),
    Pet(i64),
    NewPetForm,
    ReloadPets,
    PetType(i64),
    PetSex(PetSex),
    CreatePet,
    Recurring(bool),
    Recurrence(RecurrenceDuration),
    AtHome(bool),
    Confirm,
    Close,
    /// Disabled button (past day, label).
    Noop,
}

fn flag(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Action::Services(d) => format!("services:{d}"),
            Action::Hours => "hours".into(),
            Action::Reviews => "reviews".into(),
            Action::OpenService(id) => format!("svc:{id}"),
            Action::Month(d) => format!("cal:{d}"),
            Action::Date(d) => format!("date:{d}"),
            Action::Slot(time) => format!("slot:{time}"),
            Action::Professional(id) => format!("prof:{id}"),
            Action::Sport(id) => format!("sport:{id}"),
            Action::Next => "next".into(),
            Action::Back => "back".into(),
            Action::LoginMode => "auth:login".into(),
            Action::RegisterMode => "auth:register".into(),
            Action::ToggleCountry => "auth:country".into(),
            Action::SubmitAuth => "auth:submit".into(),
            Action::Logout => "auth:logout".into(),
            Action::Ask(input) => format!("ask:{}", input.code()),
            Action::Pet(id) => format!("pet:{id}"),
            Action::NewPetForm => "pet:new".into(),
            Action::ReloadPets => "pet:retry".into(),
            Action::PetType(id) => format!("pettype:{id}"),
            Action::PetSex(PetSex::Male) => "petsex:M".into(),
            Action::PetSex(PetSex::Female) => "petsex:F".into(),
            Action::CreatePet => "pet:create".into(),
            Action::Recurring(on) => format!("rec:{}", flag(*on)),
            Action::Recurrence(d) => format!("recdur:{}", d.code()),
            Action::AtHome(on) => format!("home:{}", flag(*on)),
            Action::Confirm => "confirm".into(),
            Action::Close => "close".into(),
            Action::Noop => "noop".into(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (name, arg) = match data.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (data, None),
        };
        let action = match (name, arg) {
            ("services", Some(d)) => Action::Services(parse_date(d)?),
            ("hours", None) => Action::Hours,
            ("reviews", None) => Action::Reviews,
            ("svc", Some(id)) => Action::OpenService(id.parse().ok()?),
            ("cal", Some(d)) => Action::Month(parse_date(d)?),
            ("date", Some(d)) => Action::Date(parse_date(d)?),
            ("slot", Some(time)) if !time.is_empty() => Action::Slot(time.to_string()),
            ("prof", Some(id)) => Action::Professional(id.parse().ok()?),
            ("sport", Some(id)) => Action::Sport(id.parse().ok()?),
            ("next", None) => Action::Next,
            ("back", None) => Action::Back,
            ("auth", Some("login")) => Action::LoginMode,
            ("auth", Some("register")) => Action::RegisterMode,
            ("auth", Some("country")) => Action::ToggleCountry,
            ("auth", Some("submit")) => Action::SubmitAuth,
            ("auth", Some("logout")) => Action::Logout,
            ("ask", Some(code)) => Action::Ask(Input::from_code(code)?),
            ("pet", Some("new")) => Action::NewPetForm,
            ("pet", Some("retry")) => Action::ReloadPets,
            ("pet", Some("create")) => Action::CreatePet,
            ("pet", Some(id)) => Action::Pet(id.parse().ok()?),
            ("pettype", Some(id)) => Action::PetType(id.parse().ok()?),
            ("petsex", Some("M")) => Action::PetSex(PetSex::Male),
            ("petsex", Some("F")) => Action::PetSex(PetSex::Female),
            ("rec", Some(f)) => Action::Recurring(parse_flag(f)?),
            ("recdur", Some(code)) => Action::Recurrence(RecurrenceDuration::from_code(code)?),
            ("home", Some(f)) => Action::AtHome(parse_flag(f)?),
            ("confirm", None) => Action::Confirm,
            ("close", None) => Action::Close,
            ("noop", None) => Action::Noop,
            _ => return None,
        };
        Some(action)
    }
}

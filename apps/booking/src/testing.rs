//! In-memory `BusinessApi` for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use crate::api::BusinessApi;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

/// Canned reply: a value or an HTTP failure status.
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Status(u16, Option<&'static str>),
}

impl<T: Clone> Reply<T> {
    fn result(&self) -> ApiResult<T> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Status(401, _) => Err(ApiError::Unauthorized),
            Reply::Status(404, message) => {
                Err(ApiError::NotFound(message.unwrap_or_default().to_string()))
            }
            Reply::Status(status, message) => Err(ApiError::Rejected {
                status: *status,
                message: message.map(str::to_string),
            }),
        }
    }
}

pub struct FakeState {
    pub envelope: Reply<AppointmentSlots>,
    pub login: Reply<String>,
    pub register: Reply<String>,
    pub user: Reply<User>,
    pub pets: Reply<Vec<Pet>>,
    pub pet_types: Reply<Vec<PetType>>,
    pub create_pet: Reply<i64>,
    pub voucher: Reply<Voucher>,
    pub appointment: Reply<String>,
    pub calls: Vec<&'static str>,
    pub last_appointment: Option<CreateAppointmentRequest>,
    pub last_voucher_code: Option<String>,
}

pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new(envelope: AppointmentSlots) -> Self {
        Self {
            state: Mutex::new(FakeState {
                envelope: Reply::Ok(envelope),
                login: Reply::Ok("token-1".into()),
                register: Reply::Ok("token-new".into()),
                user: Reply::Ok(user()),
                pets: Reply::Ok(vec![]),
                pet_types: Reply::Ok(pet_types()),
                create_pet: Reply::Ok(55),
                voucher: Reply::Ok(voucher_p10()),
                appointment: Reply::Ok("991".into()),
                calls: vec![],
                last_appointment: None,
                last_voucher_code: None,
            }),
        }
    }

    pub fn with(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last_appointment(&self) -> Option<CreateAppointmentRequest> {
        self.state.lock().unwrap().last_appointment.clone()
    }

    pub fn last_voucher_code(&self) -> Option<String> {
        self.state.lock().unwrap().last_voucher_code.clone()
    }

    fn record<T: Clone>(&self, call: &'static str, pick: impl Fn(&FakeState) -> &Reply<T>) -> ApiResult<T> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        pick(&*state).result()
    }
}

#[async_trait]
impl BusinessApi for FakeApi {
    async fn business(&self, _username: &str) -> ApiResult<Company> {
        Err(ApiError::NotFound(String::new()))
    }

    async fn services(&self, _company_id: i64, _date: NaiveDate) -> ApiResult<Vec<Service>> {
        Ok(vec![service()])
    }

    async fn appointment_slots(
        &self,
        _service_id: i64,
        _date: NaiveDate,
    ) -> ApiResult<AppointmentSlots> {
        self.record("appointment_slots", |s| &s.envelope)
    }

    async fn login(&self, _request: &LoginRequest) -> ApiResult<String> {
        self.record("login", |s| &s.login)
    }

    async fn register(&self, _request: &RegisterRequest) -> ApiResult<String> {
        self.record("register", |s| &s.register)
    }

    async fn current_user(&self, _token: &str) -> ApiResult<User> {
        self.record("current_user", |s| &s.user)
    }

    async fn pet_types(&self) -> ApiResult<Vec<PetType>> {
        self.record("pet_types", |s| &s.pet_types)
    }

    async fn pets(&self, _token: &str) -> ApiResult<Vec<Pet>> {
        self.record("pets", |s| &s.pets)
    }

    async fn create_pet(&self, _token: &str, _request: &CreatePetRequest) -> ApiResult<i64> {
        self.record("create_pet", |s| &s.create_pet)
    }

    async fn validate_voucher(
        &self,
        _token: &str,
        code: &str,
        _business_id: i64,
    ) -> ApiResult<Voucher> {
        self.state.lock().unwrap().last_voucher_code = Some(code.to_string());
        self.record("validate_voucher", |s| &s.voucher)
    }

    async fn create_appointment(
        &self,
        _token: &str,
        request: &CreateAppointmentRequest,
    ) -> ApiResult<String> {
        self.state.lock().unwrap().last_appointment = Some(request.clone());
        self.record("create_appointment", |s| &s.appointment)
    }
}

// ── Fixtures ──

pub fn service() -> Service {
    Service {
        id: 31,
        company_id: 7,
        name: "Banho e tosa".into(),
        description: "Banho completo".into(),
        duration: "1h".into(),
        price: 100.0,
        images: vec![],
        rating: None,
        tipo: Some("Serviço".into()),
    }
}

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()
}

/// Envelope with a morning slot (professional user 101 free), an inactive
/// evening slot and an at-home-only slot.
pub fn envelope(kind: &str, requires_pet: bool) -> AppointmentSlots {
    serde_json::from_value(json!({
        "tipo": kind,
        "selecao_pet": requires_pet,
        "profissionais": [
            { "id": 1, "usuario": { "id": 101, "nome": "Bia Santos" } },
            { "id": 2, "usuario": { "id": 102, "nome": "Caio Lima" } }
        ],
        "subcategorias": [{ "id": 5, "subcategoria": { "id": 50, "esporte_nome": "Tênis" } }],
        "horarios": [
            {
                "time": "09:00",
                "default_value": "100.00",
                "availableProfessionals": [101],
                "enable_fixed_scheduling": true,
                "fixed_type": "weekly"
            },
            { "time": "15:00", "default_value": 80, "availableProfessionals": [101, 102], "at_home": true, "only_at_home": true },
            { "time": "19:00", "default_value": 100, "availableProfessionals": [], "active": false, "motivo": "Fechado" }
        ]
    }))
    .unwrap()
}

pub fn user() -> User {
    User {
        id: 9,
        name: "Ana Lima".into(),
        email: "ana@lima.com".into(),
        username: None,
        img: None,
        phone: None,
        phone_ddi: None,
        country: None,
        customer_id: None,
    }
}

pub fn pet_types() -> Vec<PetType> {
    vec![PetType {
        id: 1,
        slug: Some("cachorro".into()),
        name: "Cachorro".into(),
    }]
}

pub fn pet(id: i64) -> Pet {
    Pet {
        id,
        name: "Thor".into(),
        sex: PetSex::Male,
        breed: None,
        photo: None,
        kind: PetKind {
            id: 1,
            name: "Cachorro".into(),
        },
    }
}

pub fn voucher_p10() -> Voucher {
    Voucher {
        id: 8,
        code: "PROMO10".into(),
        discount: DiscountKind::Percentage,
        value: None,
        percentage: Some(10.0),
        valid_from: None,
        valid_until: None,
        description: Some("10% de desconto".into()),
        usage_limit: None,
        active: true,
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Weekday names indexed like `horario_dia_semana` (0 = Sunday).
pub const WEEKDAYS: [&str; 7] = [
    "Domingo",
    "Segunda-feira",
    "Terça-feira",
    "Quarta-feira",
    "Quinta-feira",
    "Sexta-feira",
    "Sábado",
];

// ── Company ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
    pub description: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub address: Address,
    pub business_hours: Vec<BusinessHours>,
    pub categories: Vec<String>,
    pub rating_average: Option<f64>,
    pub total_reviews: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub country: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessHours {
    pub day: String,
    pub hours: String,
}

impl Company {
    /// `"street, number, city - state"`, omitting the city part when unknown.
    pub fn location_text(&self) -> String {
        let a = &self.address;
        let mut text = format!("{}, {}", a.street, a.number);
        if !a.city.is_empty() {
            text.push_str(&format!(", {} - {}", a.city, a.state));
        }
        text
    }
}

/// Raw `/business/{username}` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessPayload {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(rename = "empresaSubcategorias", default)]
    pub categories: Vec<CategoryLink>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub telefone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wp: Option<String>,
    #[serde(default)]
    pub pais: Option<String>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub endereco_n: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(rename = "cidadeBr", default)]
    pub city_br: Option<BrazilianCity>,
    #[serde(rename = "cidadeUi", default)]
    pub city_ui: Option<NamedPlace>,
    #[serde(rename = "estadoUi", default)]
    pub state_ui: Option<NamedPlace>,
    #[serde(default)]
    pub horarios_atendimento: Vec<OpeningHours>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub media_avaliacoes: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub total_avaliacoes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryLink {
    pub subcategoria: NamedPlace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedPlace {
    pub nome: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrazilianCity {
    pub loc_no: String,
    pub ufe_sg: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpeningHours {
    pub horario_dia_semana: usize,
    pub abertura: String,
    pub fechamento: String,
}

impl From<BusinessPayload> for Company {
    fn from(raw: BusinessPayload) -> Self {
        let categories: Vec<String> = raw
            .categories
            .into_iter()
            .map(|c| c.subcategoria.nome)
            .collect();

        let (city, state) = match (raw.city_br, raw.city_ui, raw.state_ui) {
            (Some(br), _, _) => (br.loc_no, br.ufe_sg),
            (None, city, state) => (
                city.map(|c| c.nome).unwrap_or_default(),
                state.map(|s| s.nome).unwrap_or_default(),
            ),
        };

        let business_hours = raw
            .horarios_atendimento
            .iter()
            .filter_map(|h| {
                let day = WEEKDAYS.get(h.horario_dia_semana)?;
                Some(BusinessHours {
                    day: day.to_string(),
                    hours: format!("{} - {}", hh_mm(&h.abertura), hh_mm(&h.fechamento)),
                })
            })
            .collect();

        Self {
            id: raw.id,
            name: raw.nome,
            logo: raw.logo,
            description: categories.join(", "),
            phone: raw.telefone,
            whatsapp: raw.wp,
            address: Address {
                country: raw.pais.unwrap_or_default(),
                street: raw.endereco.unwrap_or_default(),
                number: raw.endereco_n.unwrap_or_default(),
                neighborhood: raw.bairro.unwrap_or_default(),
                city,
                state,
            },
            business_hours,
            categories,
            rating_average: raw.media_avaliacoes,
            total_reviews: raw.total_avaliacoes,
        }
    }
}

/// `"08:30:00"` → `"08:30"`.
pub fn hh_mm(time: &str) -> &str {
    time.get(..5).unwrap_or(time)
}

// ── Services ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub price: f64,
    pub images: Vec<String>,
    pub rating: Option<f64>,
    pub tipo: Option<String>,
}

/// Raw entry of `/services/index`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicePayload {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub horarios_atendimento: Vec<ServiceSchedule>,
    #[serde(default)]
    pub fotos: Vec<ServicePhoto>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub media_avaliacoes: Option<f64>,
    #[serde(default)]
    pub tipo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSchedule {
    pub duracao: String,
    #[serde(deserialize_with = "lenient::decimal")]
    pub valor_padrao: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicePhoto {
    pub imagem: String,
}

impl ServicePayload {
    /// Duration and price come from the first schedule; a service without one
    /// cannot be booked and yields `None`.
    pub fn into_service(self, company_id: i64) -> Option<Service> {
        let schedule = self.horarios_atendimento.first()?;
        Some(Service {
            id: self.id,
            company_id,
            name: self.nome,
            description: self.descricao.unwrap_or_default(),
            duration: format_duration(&schedule.duracao),
            price: schedule.valor_padrao,
            images: self.fotos.into_iter().map(|f| f.imagem).collect(),
            rating: self.media_avaliacoes,
            tipo: self.tipo,
        })
    }
}

/// `"00:45:00"` → `"45min"`, `"01:00"` → `"1h"`, `"01:30:00"` → `"1h 30min"`.
pub fn format_duration(raw: &str) -> String {
    let mut parts = raw.split(':').map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let hours = parts.next().unwrap_or(0);
    let minutes = parts.next().unwrap_or(0);
    match (hours, minutes) {
        (0, m) => format!("{m}min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}min"),
    }
}

// ── Availability ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(rename = "endTime", default)]
    pub end_time: String,
    #[serde(default)]
    pub label: String,
    #[serde(deserialize_with = "lenient::decimal")]
    pub default_value: f64,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub fixed_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub default_value_old: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    pub fixed_value_old: Option<f64>,
    #[serde(default)]
    pub at_home: bool,
    #[serde(default)]
    pub only_at_home: bool,
    #[serde(default)]
    pub enable_fixed_scheduling: bool,
    #[serde(default)]
    pub fixed_type: Option<String>,
    #[serde(default)]
    pub have_promotion: bool,
    /// User ids (`usuario.id`) of the professionals free at this time.
    #[serde(rename = "availableProfessionals", default)]
    pub available_professionals: Vec<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(rename = "motivo", default)]
    pub inactive_reason: Option<String>,
}

impl TimeSlot {
    /// Hour component of `time` (`"14:30"` → 14).
    pub fn hour(&self) -> Option<u32> {
        self.time.split(':').next()?.trim().parse().ok()
    }

    pub fn offers_professional(&self, user_id: i64) -> bool {
        self.available_professionals.contains(&user_id)
    }

    /// The label to show; falls back to `time` when the backend sent none.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.time
        } else {
            &self.label
        }
    }
}

/// What kind of resource the service books, from the envelope's `tipo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingKind {
    /// `"Serviço"`: a professional must be chosen.
    Service,
    /// `"Quadra"`: a sport must be chosen.
    Court,
    Other(String),
}

impl From<String> for BookingKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Serviço" => Self::Service,
            "Quadra" => Self::Court,
            _ => Self::Other(value),
        }
    }
}

impl From<BookingKind> for String {
    fn from(kind: BookingKind) -> Self {
        match kind {
            BookingKind::Service => "Serviço".into(),
            BookingKind::Court => "Quadra".into(),
            BookingKind::Other(other) => other,
        }
    }
}

/// Response of `/services/data-to-appointment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSlots {
    #[serde(rename = "origem", default)]
    pub origin: Option<String>,
    #[serde(rename = "tipo")]
    pub kind: BookingKind,
    #[serde(default)]
    pub is_court: bool,
    #[serde(rename = "selecao_pet", default)]
    pub requires_pet: bool,
    #[serde(rename = "localidade", default)]
    pub locality: Option<String>,
    #[serde(rename = "prazo_cancelamento", default)]
    pub cancellation_deadline: Option<String>,
    #[serde(rename = "profissionais", default)]
    pub professionals: Vec<Professional>,
    #[serde(rename = "subcategorias", default)]
    pub sports: Vec<Sport>,
    #[serde(rename = "horarios", default)]
    pub slots: Vec<TimeSlot>,
}

impl AppointmentSlots {
    pub fn slot(&self, time: &str) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.time == time)
    }

    pub fn professional(&self, id: i64) -> Option<&Professional> {
        self.professionals.iter().find(|p| p.id == id)
    }

    pub fn sport(&self, id: i64) -> Option<&Sport> {
        self.sports.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: i64,
    #[serde(rename = "usuario")]
    pub user: ProfessionalUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalUser {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default)]
    pub img: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sport {
    pub id: i64,
    #[serde(rename = "subcategoria")]
    pub category: SportCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportCategory {
    pub id: i64,
    #[serde(rename = "esporte_nome", default)]
    pub name: Option<String>,
}

impl Sport {
    pub fn name(&self) -> &str {
        self.category.name.as_deref().unwrap_or("Esporte")
    }
}

// ── Pets ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetType {
    pub id: i64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PetSex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl PetSex {
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Macho",
            Self::Female => "Fêmea",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "sexo")]
    pub sex: PetSex,
    #[serde(rename = "raca", default)]
    pub breed: Option<String>,
    #[serde(rename = "foto", default)]
    pub photo: Option<String>,
    #[serde(rename = "tipo")]
    pub kind: PetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetKind {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
}

// ── Users ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "usuario", default)]
    pub username: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "telefone_ddi", default)]
    pub phone_ddi: Option<String>,
    #[serde(rename = "pais", default)]
    pub country: Option<String>,
    #[serde(rename = "cliente_id", default)]
    pub customer_id: Option<i64>,
}

impl User {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

// ── Vouchers ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    /// `porcentagem_desconto` percent off.
    #[serde(rename = "P")]
    Percentage,
    /// `valor_desconto` off, in currency.
    #[serde(rename = "V")]
    FixedValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "tipo_desconto")]
    pub discount: DiscountKind,
    #[serde(rename = "valor_desconto", default, deserialize_with = "lenient::opt_decimal")]
    pub value: Option<f64>,
    #[serde(
        rename = "porcentagem_desconto",
        default,
        deserialize_with = "lenient::opt_decimal"
    )]
    pub percentage: Option<f64>,
    #[serde(rename = "validade_inicio", default)]
    pub valid_from: Option<String>,
    #[serde(rename = "validade_fim", default)]
    pub valid_until: Option<String>,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "limite_uso", default)]
    pub usage_limit: Option<i64>,
    #[serde(rename = "ativo", default = "default_true")]
    pub active: bool,
}

// ── Appointments ──

/// A booking accepted by the backend. Built once from the confirmed wizard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
    pub id: String,
    pub service_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub customer_name: String,
    pub customer_email: String,
    pub is_recurring: bool,
    pub is_at_home: bool,
    pub address: Option<String>,
    pub professional_id: Option<i64>,
    pub sport_id: Option<i64>,
    pub pet_id: Option<i64>,
    pub voucher_ids: Vec<i64>,
    pub total_price: f64,
}

/// `Y`/`N` flag as the backend expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

// ── API request/response types ──

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
    #[serde(rename = "pais")]
    pub country: String,
    pub ddi: String,
    #[serde(rename = "telefone")]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePetRequest {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo_pet_id")]
    pub pet_type_id: i64,
    #[serde(rename = "sexo")]
    pub sex: PetSex,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAppointmentRequest {
    #[serde(rename = "cliente_id")]
    pub company_id: i64,
    #[serde(rename = "servico_id")]
    pub service_id: i64,
    /// RFC 3339 timestamp with the business offset.
    #[serde(rename = "horario")]
    pub starts_at: String,
    #[serde(rename = "domicilio")]
    pub at_home: Flag,
    #[serde(rename = "endereco", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "ilimitado", skip_serializing_if = "Option::is_none")]
    pub unlimited: Option<Flag>,
    #[serde(rename = "limite", skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(rename = "profissional_id", skip_serializing_if = "Option::is_none")]
    pub professional_user_id: Option<i64>,
    #[serde(rename = "subcategoria_id", skip_serializing_if = "Option::is_none")]
    pub sport_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<i64>,
    #[serde(rename = "vouchersIds", skip_serializing_if = "Option::is_none")]
    pub voucher_ids: Option<Vec<i64>>,
    #[serde(rename = "valor_final")]
    pub total_price: f64,
}

/// Any creation response; only the id matters.
#[derive(Debug, Deserialize)]
pub struct CreatedResource {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
}

fn default_true() -> bool {
    true
}

// ── Lenient decoding ──

/// The backend is inconsistent about numbers: decimals arrive as `"10.00"` or
/// `10`, ids as `42` or `"42"`. These helpers accept both.
mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Str(String),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Scalar::Int(n) => n.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Str(s) => s,
            }
        }

        fn into_decimal(self) -> Option<f64> {
            match self {
                Scalar::Int(n) => Some(n as f64),
                Scalar::Float(f) => Some(f),
                Scalar::Str(s) => s.trim().replace(',', ".").parse().ok(),
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?
            .map(Scalar::into_string)
            .unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_string))
    }

    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?
            .and_then(Scalar::into_decimal)
            .unwrap_or(0.0))
    }

    pub fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.and_then(Scalar::into_decimal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn business_json() -> serde_json::Value {
        json!({
            "id": 7,
            "nome": "MD Beauty Studio",
            "logo": "https://cdn/logo.png",
            "empresaSubcategorias": [
                { "subcategoria": { "nome": "Cabelo" } },
                { "subcategoria": { "nome": "Unhas" } }
            ],
            "telefone": "11999990000",
            "wp": 11999990000i64,
            "pais": "Brasil",
            "endereco": "Rua das Flores",
            "endereco_n": 120,
            "bairro": "Centro",
            "cidadeBr": { "loc_no": "São Paulo", "ufe_sg": "SP" },
            "horarios_atendimento": [
                { "horario_dia_semana": 1, "abertura": "08:00:00", "fechamento": "18:30:00" },
                { "horario_dia_semana": 6, "abertura": "09:00:00", "fechamento": "13:00:00" }
            ],
            "media_avaliacoes": "4.5",
            "total_avaliacoes": 12
        })
    }

    // ── Company ──

    #[test]
    fn test_company_from_payload() {
        let raw: BusinessPayload = serde_json::from_value(business_json()).unwrap();
        let company = Company::from(raw);
        assert_eq!(company.id, 7);
        assert_eq!(company.description, "Cabelo, Unhas");
        assert_eq!(company.whatsapp.as_deref(), Some("11999990000"));
        assert_eq!(company.address.number, "120");
        assert_eq!(company.address.city, "São Paulo");
        assert_eq!(company.rating_average, Some(4.5));
        assert_eq!(company.total_reviews, "12");
        assert_eq!(
            company.business_hours[0],
            BusinessHours {
                day: "Segunda-feira".into(),
                hours: "08:00 - 18:30".into()
            }
        );
        assert_eq!(company.business_hours[1].day, "Sábado");
    }

    #[test]
    fn test_company_uruguayan_address() {
        let mut value = business_json();
        value["cidadeBr"] = serde_json::Value::Null;
        value["pais"] = json!("Uruguai");
        value["cidadeUi"] = json!({ "nome": "Montevideo" });
        value["estadoUi"] = json!({ "nome": "Montevideo" });
        let company = Company::from(serde_json::from_value::<BusinessPayload>(value).unwrap());
        assert_eq!(
            company.location_text(),
            "Rua das Flores, 120, Montevideo - Montevideo"
        );
    }

    #[test]
    fn test_company_without_rating() {
        let mut value = business_json();
        value["media_avaliacoes"] = serde_json::Value::Null;
        let company = Company::from(serde_json::from_value::<BusinessPayload>(value).unwrap());
        assert_eq!(company.rating_average, None);
    }

    #[test]
    fn test_unknown_weekday_is_skipped() {
        let mut value = business_json();
        value["horarios_atendimento"] =
            json!([{ "horario_dia_semana": 9, "abertura": "08:00", "fechamento": "12:00" }]);
        let company = Company::from(serde_json::from_value::<BusinessPayload>(value).unwrap());
        assert!(company.business_hours.is_empty());
    }

    // ── Services ──

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration("00:45:00"), "45min");
        assert_eq!(format_duration("01:00:00"), "1h");
        assert_eq!(format_duration("01:30"), "1h 30min");
        assert_eq!(format_duration("garbage"), "0min");
    }

    #[test]
    fn test_service_from_payload() {
        let raw: ServicePayload = serde_json::from_value(json!({
            "id": 31,
            "nome": "Corte",
            "descricao": "Corte feminino",
            "horarios_atendimento": [{ "duracao": "01:30:00", "valor_padrao": "120.50" }],
            "fotos": [{ "imagem": "a.jpg" }],
            "tipo": "Serviço"
        }))
        .unwrap();
        let service = raw.into_service(7).unwrap();
        assert_eq!(service.company_id, 7);
        assert_eq!(service.duration, "1h 30min");
        assert_eq!(service.price, 120.5);
        assert_eq!(service.images, vec!["a.jpg".to_string()]);
    }

    #[test]
    fn test_service_without_schedule_is_dropped() {
        let raw: ServicePayload =
            serde_json::from_value(json!({ "id": 1, "nome": "X" })).unwrap();
        assert!(raw.into_service(7).is_none());
    }

    // ── Availability ──

    #[test]
    fn test_envelope_decodes_kind_and_slots() {
        let envelope: AppointmentSlots = serde_json::from_value(json!({
            "tipo": "Quadra",
            "selecao_pet": false,
            "subcategorias": [{ "id": 3, "subcategoria": { "id": 9, "esporte_nome": null } }],
            "horarios": [{
                "time": "18:00",
                "default_value": 80,
                "availableProfessionals": [],
                "active": false,
                "motivo": "Lotado"
            }]
        }))
        .unwrap();
        assert_eq!(envelope.kind, BookingKind::Court);
        assert_eq!(envelope.sports[0].name(), "Esporte");
        let slot = envelope.slot("18:00").unwrap();
        assert!(!slot.active);
        assert_eq!(slot.inactive_reason.as_deref(), Some("Lotado"));
        assert_eq!(slot.display_label(), "18:00");
        assert_eq!(slot.hour(), Some(18));
    }

    #[test]
    fn test_other_booking_kind_round_trips_text() {
        assert_eq!(
            BookingKind::from("Aula".to_string()),
            BookingKind::Other("Aula".into())
        );
        assert_eq!(String::from(BookingKind::Service), "Serviço");
    }

    // ── Vouchers / users ──

    #[test]
    fn test_voucher_decimal_strings() {
        let voucher: Voucher = serde_json::from_value(json!({
            "id": 5,
            "codigo": "PROMO10",
            "tipo_desconto": "P",
            "valor_desconto": null,
            "porcentagem_desconto": "10.00",
            "descricao": "10% off"
        }))
        .unwrap();
        assert_eq!(voucher.discount, DiscountKind::Percentage);
        assert_eq!(voucher.percentage, Some(10.0));
        assert_eq!(voucher.value, None);
        assert!(voucher.active);
    }

    #[test]
    fn test_user_first_name() {
        let user: User = serde_json::from_value(json!({
            "id": 1, "nome": "Maria Clara Souza", "email": "m@x.com"
        }))
        .unwrap();
        assert_eq!(user.first_name(), "Maria");
    }

    // ── Requests ──

    #[test]
    fn test_appointment_request_omits_absent_fields() {
        let request = CreateAppointmentRequest {
            company_id: 7,
            service_id: 31,
            starts_at: "2026-10-20T14:30:00-03:00".into(),
            at_home: Flag::No,
            address: None,
            unlimited: None,
            limit: None,
            professional_user_id: Some(44),
            sport_id: None,
            pet_id: None,
            voucher_ids: None,
            total_price: 90.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "cliente_id": 7,
                "servico_id": 31,
                "horario": "2026-10-20T14:30:00-03:00",
                "domicilio": "N",
                "profissional_id": 44,
                "valor_final": 90.0
            })
        );
    }

    #[test]
    fn test_created_resource_accepts_numeric_id() {
        let created: CreatedResource = serde_json::from_value(json!({ "id": 991 })).unwrap();
        assert_eq!(created.id, "991");
    }
}

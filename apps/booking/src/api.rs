//! Client for the Remote Business API.
//!
//! `BusinessApi` is the seam the wizard talks to; `ApiClient` is the reqwest
//! implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::models::*;

/// Default request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
/// Page size used for the service catalog.
const SERVICES_PAGE_LIMIT: u32 = 50;

/// Every call the booking widget makes against the backend.
#[async_trait]
pub trait BusinessApi: Send + Sync {
    async fn business(&self, username: &str) -> ApiResult<Company>;

    /// Bookable services of `company_id` on `date`.
    async fn services(&self, company_id: i64, date: NaiveDate) -> ApiResult<Vec<Service>>;

    /// Slots, professionals and sports for one service on one date.
    async fn appointment_slots(
        &self,
        service_id: i64,
        date: NaiveDate,
    ) -> ApiResult<AppointmentSlots>;

    /// Exchanges credentials for a bearer token.
    async fn login(&self, request: &LoginRequest) -> ApiResult<String>;

    /// Creates an account and returns its bearer token.
    async fn register(&self, request: &RegisterRequest) -> ApiResult<String>;

    async fn current_user(&self, token: &str) -> ApiResult<User>;

    async fn pet_types(&self) -> ApiResult<Vec<PetType>>;

    async fn pets(&self, token: &str) -> ApiResult<Vec<Pet>>;

    /// Returns the id of the new pet.
    async fn create_pet(&self, token: &str, request: &CreatePetRequest) -> ApiResult<i64>;

    async fn validate_voucher(
        &self,
        token: &str,
        code: &str,
        business_id: i64,
    ) -> ApiResult<Voucher>;

    /// Returns the backend id of the new appointment.
    async fn create_appointment(
        &self,
        token: &str,
        request: &CreateAppointmentRequest,
    ) -> ApiResult<String>;
}

// ── Configuration ──

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Parses `base_url`; it must be an absolute http(s) URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self { base_url, timeout })
    }
}

// ── reqwest implementation ──

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.http.get(self.endpoint(segments))
    }

    fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> RequestBuilder {
        self.http.post(self.endpoint(segments)).json(body)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        tracing::debug!(%status, path = %url, "business api response");

        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body)
                .map_err(|e| ApiError::InvalidResponse(format!("{url}: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::NOT_FOUND => ApiError::NotFound(message.unwrap_or_default()),
            _ => ApiError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
    request.bearer_auth(token)
}

/// `DD/MM/YYYY`, the date format every query endpoint expects.
pub fn query_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// The backend reports failures as `{"message": "..."}` or, for validation
/// errors, `{"message": ["...", "..."]}`.
pub fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

#[async_trait]
impl BusinessApi for ApiClient {
    async fn business(&self, username: &str) -> ApiResult<Company> {
        let raw: BusinessPayload = self.send(self.get(&["business", username])).await?;
        Ok(Company::from(raw))
    }

    async fn services(&self, company_id: i64, date: NaiveDate) -> ApiResult<Vec<Service>> {
        let request = self.get(&["services", "index"]).query(&[
            ("data", query_date(date)),
            ("limit", SERVICES_PAGE_LIMIT.to_string()),
            ("offset", "0".to_string()),
            ("cliente_id", company_id.to_string()),
        ]);
        let raw: Vec<ServicePayload> = self.send(request).await?;
        let total = raw.len();
        let services: Vec<Service> = raw
            .into_iter()
            .filter_map(|s| s.into_service(company_id))
            .collect();
        if services.len() < total {
            tracing::warn!(
                company_id,
                skipped = total - services.len(),
                "services without schedule skipped"
            );
        }
        Ok(services)
    }

    async fn appointment_slots(
        &self,
        service_id: i64,
        date: NaiveDate,
    ) -> ApiResult<AppointmentSlots> {
        let request = self.get(&["services", "data-to-appointment"]).query(&[
            ("servico_id", service_id.to_string()),
            ("data", query_date(date)),
        ]);
        self.send(request).await
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<String> {
        let response: LoginResponse = self.send(self.post(&["auth", "login"], request)).await?;
        Ok(response.access_token)
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<String> {
        let response: RegisterResponse =
            self.send(self.post(&["users", "create"], request)).await?;
        Ok(response.token)
    }

    async fn current_user(&self, token: &str) -> ApiResult<User> {
        self.send(bearer(self.get(&["users", "me"]), token)).await
    }

    async fn pet_types(&self) -> ApiResult<Vec<PetType>> {
        self.send(self.get(&["pet-types"])).await
    }

    async fn pets(&self, token: &str) -> ApiResult<Vec<Pet>> {
        self.send(bearer(self.get(&["pet"]), token)).await
    }

    async fn create_pet(&self, token: &str, request: &CreatePetRequest) -> ApiResult<i64> {
        let created: CreatedResource = self
            .send(bearer(self.post(&["pet"], request), token))
            .await?;
        created
            .id
            .parse()
            .map_err(|_| ApiError::InvalidResponse(format!("pet id {:?}", created.id)))
    }

    async fn validate_voucher(
        &self,
        token: &str,
        code: &str,
        business_id: i64,
    ) -> ApiResult<Voucher> {
        let request = self
            .get(&["vouchers", "validate"])
            .query(&[("code", code.to_string()), ("business_id", business_id.to_string())]);
        self.send(bearer(request, token)).await
    }

    async fn create_appointment(
        &self,
        token: &str,
        request: &CreateAppointmentRequest,
    ) -> ApiResult<String> {
        let created: CreatedResource = self
            .send(bearer(
                self.post(&["appointments", "create-from-external-link"], request),
                token,
            ))
            .await?;
        if created.id.is_empty() {
            return Err(ApiError::InvalidResponse("appointment without id".into()));
        }
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = ApiConfig::new(base, Duration::from_secs(5)).unwrap();
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let api = client("https://api.buzke.com.br/v1");
        assert_eq!(
            api.endpoint(&["services", "index"]).as_str(),
            "https://api.buzke.com.br/v1/services/index"
        );
    }

    #[test]
    fn test_endpoint_handles_trailing_slash() {
        let api = client("https://api.buzke.com.br/v1/");
        assert_eq!(
            api.endpoint(&["pet-types"]).as_str(),
            "https://api.buzke.com.br/v1/pet-types"
        );
    }

    #[test]
    fn test_endpoint_escapes_username() {
        let api = client("https://api.buzke.com.br");
        assert_eq!(
            api.endpoint(&["business", "md beauty/x"]).as_str(),
            "https://api.buzke.com.br/business/md%20beauty%2Fx"
        );
    }

    #[test]
    fn test_config_rejects_non_base_url() {
        assert!(ApiConfig::new("mailto:a@b.c", Duration::from_secs(1)).is_err());
        assert!(ApiConfig::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_query_date_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(query_date(date), "07/03/2026");
    }

    #[test]
    fn test_extract_message_variants() {
        assert_eq!(
            extract_message(r#"{"message":"Cupom expirado"}"#).as_deref(),
            Some("Cupom expirado")
        );
        assert_eq!(
            extract_message(r#"{"message":["email must be an email","senha too short"]}"#)
                .as_deref(),
            Some("email must be an email; senha too short")
        );
        assert_eq!(extract_message(r#"{"message":""}"#), None);
        assert_eq!(extract_message("<html>502</html>"), None);
    }
}

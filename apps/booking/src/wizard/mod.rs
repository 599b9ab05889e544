//! Booking wizard for one service.
//!
//! The wizard walks a `StepPlan` by position. Every operation validates
//! locally first, makes at most one remote call and returns a `StepOutcome`;
//! failures leave the wizard on the same step with `error()` set. A 401 from
//! an authenticated call logs the session out and moves back to the auth step.

mod auth;
mod confirmation;
mod pet;
mod selection;
mod steps;

pub use auth::{format_phone, is_valid_email, AuthMode, AuthStep, Country, LoginForm, RegisterForm};
pub use confirmation::{appointment_time, recurrence_label, ConfirmationForm, RecurrenceDuration};
pub use pet::{NewPetForm, PetStatus, PetStep};
pub use selection::{group_slots, DayPeriod, Requirement, Selection};
pub use steps::{StepDescriptor, StepKind, StepPlan};

use chrono::{FixedOffset, NaiveDate};

use crate::api::BusinessApi;
use crate::error::{ApiError, StepError};
use crate::models::{Appointment, CreateAppointmentRequest, Flag, Service, TimeSlot};
use crate::session::Session;

const SLOTS_FETCH_FAILED: &str = "Não foi possível carregar os horários.";
const USER_FETCH_FAILED: &str = "Falha ao buscar dados do usuário.";
const LOGIN_FAILED: &str = "Erro ao fazer login";
const REGISTER_FAILED: &str = "Erro ao criar conta";
const VOUCHER_INVALID: &str = "Cupom inválido";
const BOOKING_FAILED: &str = "Erro ao criar agendamento";

/// What an operation did to the wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// State changed; still on the same step.
    Updated,
    /// Now on another step.
    Moved(StepKind),
    /// The appointment was created. The wizard is finished.
    Booked(Appointment),
}

#[derive(Debug)]
pub struct BookingWizard {
    service: Service,
    plan: StepPlan,
    position: usize,
    selection: Selection,
    auth: AuthStep,
    pet: PetStep,
    pet_id: Option<i64>,
    confirmation: ConfirmationForm,
    error: Option<String>,
    appointment: Option<Appointment>,
    utc_offset: FixedOffset,
}

impl BookingWizard {
    /// Fresh wizard on step 1. The pet step is unknown until availability
    /// for a date has been loaded.
    pub fn open(service: Service, session: &Session, utc_offset: FixedOffset) -> Self {
        tracing::debug!(service_id = service.id, "booking wizard opened");
        Self {
            service,
            plan: StepPlan::build(false, session.is_authenticated()),
            position: 0,
            selection: Selection::default(),
            auth: AuthStep::default(),
            pet: PetStep::default(),
            pet_id: None,
            confirmation: ConfirmationForm::default(),
            error: None,
            appointment: None,
            utc_offset,
        }
    }

    // ── Read access ──

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn plan(&self) -> &StepPlan {
        &self.plan
    }

    /// `None` once the appointment exists.
    pub fn current_step(&self) -> Option<&StepDescriptor> {
        if self.appointment.is_some() {
            return None;
        }
        self.plan.get(self.position)
    }

    pub fn step_kind(&self) -> Option<StepKind> {
        self.current_step().map(|s| s.kind)
    }

    /// 1-based.
    pub fn step_number(&self) -> usize {
        self.position + 1
    }

    pub fn step_count(&self) -> usize {
        self.plan.len()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn slot(&self) -> Option<&TimeSlot> {
        self.selection.slot()
    }

    pub fn auth(&self) -> &AuthStep {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthStep {
        &mut self.auth
    }

    pub fn pet(&self) -> &PetStep {
        &self.pet
    }

    pub fn pet_mut(&mut self) -> &mut PetStep {
        &mut self.pet
    }

    pub fn pet_id(&self) -> Option<i64> {
        self.pet_id
    }

    pub fn confirmation(&self) -> &ConfirmationForm {
        &self.confirmation
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn appointment(&self) -> Option<&Appointment> {
        self.appointment.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.appointment.is_some()
    }

    /// Slot price after the applied voucher, if a slot is chosen.
    pub fn total_price(&self) -> Option<f64> {
        self.slot().map(|s| self.confirmation.total_price(s))
    }

    // ── Step 1 ──

    /// Picks a date and loads its availability. The step list is rebuilt
    /// because the pet requirement comes with the availability.
    pub async fn select_date(
        &mut self,
        api: &dyn BusinessApi,
        session: &Session,
        date: NaiveDate,
    ) -> Result<StepOutcome, StepError> {
        let result = self.load_date(api, session, date).await;
        self.record(result)
    }

    async fn load_date(
        &mut self,
        api: &dyn BusinessApi,
        session: &Session,
        date: NaiveDate,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::DateTime)?;
        self.selection.set_date(date);
        match api.appointment_slots(self.service.id, date).await {
            Ok(availability) => {
                tracing::debug!(
                    service_id = self.service.id,
                    %date,
                    slots = availability.slots.len(),
                    "availability loaded"
                );
                self.selection.set_availability(Some(availability));
                self.rebuild_plan(session.is_authenticated());
                Ok(StepOutcome::Updated)
            }
            Err(err) => {
                tracing::warn!(service_id = self.service.id, %date, error = %err, "availability fetch failed");
                self.selection.set_availability(None);
                Err(StepError::remote(&err, SLOTS_FETCH_FAILED))
            }
        }
    }

    pub fn select_slot(&mut self, time: &str) -> Result<StepOutcome, StepError> {
        let result = self.expect_step(StepKind::DateTime).and_then(|_| {
            self.selection.select_slot(time)?;
            if let Some(slot) = self.selection.slot() {
                self.confirmation.fit_to(slot);
            }
            Ok(StepOutcome::Updated)
        });
        self.record(result)
    }

    pub fn select_professional(&mut self, id: i64) -> Result<StepOutcome, StepError> {
        let result = self
            .expect_step(StepKind::DateTime)
            .and_then(|_| self.selection.select_professional(id))
            .map(|_| StepOutcome::Updated);
        self.record(result)
    }

    pub fn select_sport(&mut self, id: i64) -> Result<StepOutcome, StepError> {
        let result = self
            .expect_step(StepKind::DateTime)
            .and_then(|_| self.selection.select_sport(id))
            .map(|_| StepOutcome::Updated);
        self.record(result)
    }

    // ── Navigation ──

    /// "Continue": advances one step when the current one is complete.
    pub async fn continue_step(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        let result = self.try_continue(api, session).await;
        self.record(result)
    }

    async fn try_continue(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        match self.step_kind() {
            Some(StepKind::DateTime) => self.selection.validate()?,
            Some(StepKind::Auth) => {
                if !session.is_authenticated() {
                    return Err(StepError::NotAuthenticated);
                }
                self.ensure_user(api, session).await?;
            }
            Some(StepKind::Pet) => {
                if self.pet_id.is_none() {
                    return Err(StepError::MissingPet);
                }
            }
            Some(StepKind::Confirmation) | None => return Err(StepError::WrongStep),
        }
        self.advance(api, session).await
    }

    /// "Voltar": one step back. Clears the inline error.
    pub fn back(&mut self) -> Result<StepOutcome, StepError> {
        if self.appointment.is_some() || self.position == 0 {
            return Err(StepError::WrongStep);
        }
        self.position -= 1;
        self.error = None;
        Ok(StepOutcome::Moved(self.plan.get(self.position).map_or(StepKind::DateTime, |s| s.kind)))
    }

    async fn advance(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        if self.position + 1 >= self.plan.len() {
            return Err(StepError::WrongStep);
        }
        self.position += 1;
        let kind = self.plan.get(self.position).map_or(StepKind::Confirmation, |s| s.kind);
        tracing::debug!(service_id = self.service.id, step = ?kind, "wizard advanced");
        match kind {
            StepKind::Auth if session.is_authenticated() => {
                self.ensure_user(api, session).await?;
            }
            StepKind::Pet => self.load_pets(api, session).await?,
            StepKind::Confirmation => self.reset_confirmation(),
            StepKind::Auth | StepKind::DateTime => {}
        }
        Ok(StepOutcome::Moved(kind))
    }

    // ── Step 2 ──

    pub async fn login(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        let result = self.try_login(api, session).await;
        self.record(result)
    }

    async fn try_login(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::Auth)?;
        self.auth.login.validate()?;
        match api.login(&self.auth.login.to_request()).await {
            Ok(token) => self.signed_in(api, session, token).await,
            Err(ApiError::Unauthorized) => {
                tracing::info!("login rejected");
                Err(StepError::InvalidCredentials)
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                Err(StepError::remote(&err, LOGIN_FAILED))
            }
        }
    }

    pub async fn register(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        let result = self.try_register(api, session).await;
        self.record(result)
    }

    async fn try_register(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::Auth)?;
        self.auth.register.validate()?;
        match api.register(&self.auth.register.to_request()).await {
            Ok(token) => {
                tracing::info!("account created");
                self.signed_in(api, session, token).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "registration failed");
                Err(StepError::remote(&err, REGISTER_FAILED))
            }
        }
    }

    async fn signed_in(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
        token: String,
    ) -> Result<StepOutcome, StepError> {
        session.sign_in(token);
        self.auth.clear_secrets();
        self.rebuild_plan(true);
        self.ensure_user(api, session).await?;
        self.advance(api, session).await
    }

    /// Logs out from the auth step or later; the wizard falls back to the
    /// auth step when it was past it.
    pub fn logout(&mut self, session: &mut Session) -> StepOutcome {
        session.logout();
        let before = self.position;
        self.signed_out();
        self.error = None;
        if self.position != before {
            StepOutcome::Moved(StepKind::Auth)
        } else {
            StepOutcome::Updated
        }
    }

    async fn ensure_user(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<(), StepError> {
        match session.hydrate(api).await {
            Ok(()) => Ok(()),
            // hydrate already dropped the token
            Err(ApiError::Unauthorized) => {
                self.signed_out();
                Err(StepError::SessionExpired)
            }
            Err(err) => Err(StepError::remote(&err, USER_FETCH_FAILED)),
        }
    }

    fn expire_session(&mut self, session: &mut Session) -> StepError {
        tracing::warn!(service_id = self.service.id, "token rejected, back to login");
        session.logout();
        self.signed_out();
        StepError::SessionExpired
    }

    fn signed_out(&mut self) {
        self.auth.clear_secrets();
        self.pet.reset();
        self.pet_id = None;
        self.confirmation = ConfirmationForm::default();
        self.rebuild_plan(false);
        if let Some(auth) = self.plan.position_of(StepKind::Auth) {
            self.position = self.position.min(auth);
        }
    }

    /// Fresh form for the chosen slot on every arrival at the last step.
    fn reset_confirmation(&mut self) {
        self.confirmation = self
            .selection
            .slot()
            .map_or_else(ConfirmationForm::default, ConfirmationForm::for_slot);
    }

    // ── Step 3 ──

    /// Fetches pets, then pet types. Failures block only this step.
    async fn load_pets(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<(), StepError> {
        self.pet.reset();
        let Some(token) = session.token().map(str::to_string) else {
            self.pet.failed(StepError::PetsRequireLogin.to_string());
            return Ok(());
        };
        let pets = match api.pets(&token).await {
            Ok(pets) => pets,
            Err(ApiError::Unauthorized) => return Err(self.expire_session(session)),
            Err(err) => {
                tracing::warn!(error = %err, "pets fetch failed");
                self.pet.failed(pet::PETS_FETCH_FAILED);
                return Ok(());
            }
        };
        let pet_types = match api.pet_types().await {
            Ok(types) => types,
            Err(err) => {
                tracing::warn!(error = %err, "pet types fetch failed");
                self.pet.failed(pet::PET_TYPES_FETCH_FAILED);
                return Ok(());
            }
        };
        self.pet.loaded(pets, pet_types);
        Ok(())
    }

    /// Retries the pet fetch after a failure.
    pub async fn reload_pets(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        let result = match self.expect_step(StepKind::Pet) {
            Ok(()) => self.load_pets(api, session).await.map(|_| StepOutcome::Updated),
            Err(err) => Err(err),
        };
        self.record(result)
    }

    pub async fn choose_pet(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
        id: i64,
    ) -> Result<StepOutcome, StepError> {
        let result = match self.expect_step(StepKind::Pet) {
            Ok(()) if self.pet.is_ready() && self.pet.pet(id).is_some() => {
                self.pet_id = Some(id);
                self.advance(api, session).await
            }
            Ok(()) => Err(StepError::MissingPet),
            Err(err) => Err(err),
        };
        self.record(result)
    }

    /// Submits the new-pet form; the created pet is selected.
    pub async fn create_pet(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        let result = self.try_create_pet(api, session).await;
        self.record(result)
    }

    async fn try_create_pet(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::Pet)?;
        let request = self.pet.form.to_request()?;
        let token = session
            .token()
            .map(str::to_string)
            .ok_or(StepError::PetsRequireLogin)?;
        match api.create_pet(&token, &request).await {
            Ok(id) => {
                tracing::info!(pet_id = id, "pet created");
                self.pet_id = Some(id);
                self.pet.form = NewPetForm::default();
                self.advance(api, session).await
            }
            Err(ApiError::Unauthorized) => Err(self.expire_session(session)),
            Err(err) => Err(StepError::remote(&err, pet::PET_CREATE_FAILED)),
        }
    }

    // ── Step 4 ──

    pub fn set_recurring(&mut self, on: bool) -> Result<StepOutcome, StepError> {
        let result = self.on_confirmation(|form, slot| form.set_recurring(slot, on));
        self.record(result)
    }

    pub fn set_recurrence(&mut self, duration: RecurrenceDuration) -> Result<StepOutcome, StepError> {
        let result = self.on_confirmation(|form, _| {
            form.set_duration(duration);
            Ok(())
        });
        self.record(result)
    }

    pub fn set_at_home(&mut self, on: bool) -> Result<StepOutcome, StepError> {
        let result = self.on_confirmation(|form, slot| form.set_at_home(slot, on));
        self.record(result)
    }

    pub fn set_address(&mut self, address: &str) -> Result<StepOutcome, StepError> {
        let result = self.on_confirmation(|form, _| {
            form.set_address(address);
            Ok(())
        });
        self.record(result)
    }

    fn on_confirmation(
        &mut self,
        f: impl FnOnce(&mut ConfirmationForm, &TimeSlot) -> Result<(), StepError>,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::Confirmation)?;
        let slot = self.selection.slot().ok_or(StepError::MissingSlot)?;
        f(&mut self.confirmation, slot)?;
        Ok(StepOutcome::Updated)
    }

    /// Validates `code` against the backend. The voucher's own feedback
    /// (success text or rejection) lands in `confirmation()`, not in
    /// `error()`; only a wrong step or an expired session is an `Err`.
    pub async fn apply_voucher(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
        code: &str,
    ) -> Result<StepOutcome, StepError> {
        let result = self.try_apply_voucher(api, session, code).await;
        self.record(result)
    }

    async fn try_apply_voucher(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
        code: &str,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::Confirmation)?;
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Ok(StepOutcome::Updated);
        }
        self.confirmation.voucher_code = code.clone();
        if self.confirmation.voucher().is_some() {
            self.confirmation
                .reject_voucher(StepError::VoucherAlreadyApplied.to_string());
            return Ok(StepOutcome::Updated);
        }
        let Some(token) = session.token().map(str::to_string) else {
            self.confirmation
                .reject_voucher(StepError::VoucherRequiresLogin.to_string());
            return Ok(StepOutcome::Updated);
        };

        match api
            .validate_voucher(&token, &code, self.service.company_id)
            .await
        {
            Ok(voucher) => {
                tracing::info!(voucher_id = voucher.id, code = %code, "voucher applied");
                self.confirmation.apply_voucher(voucher);
                Ok(StepOutcome::Updated)
            }
            Err(ApiError::Unauthorized) => Err(self.expire_session(session)),
            Err(err) => {
                tracing::info!(code = %code, error = %err, "voucher rejected");
                self.confirmation
                    .reject_voucher(err.user_message(VOUCHER_INVALID));
                Ok(StepOutcome::Updated)
            }
        }
    }

    /// Submits the appointment. On success the wizard becomes terminal.
    pub async fn confirm(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        let result = self.try_confirm(api, session).await;
        self.record(result)
    }

    async fn try_confirm(
        &mut self,
        api: &dyn BusinessApi,
        session: &mut Session,
    ) -> Result<StepOutcome, StepError> {
        self.expect_step(StepKind::Confirmation)?;
        if session.is_authenticated() {
            self.ensure_user(api, session).await?;
        }
        let (token, user) = session
            .credentials()
            .ok_or(StepError::BookingRequiresLogin)?;
        let token = token.to_string();
        let (customer_name, customer_email) = (user.name.clone(), user.email.clone());

        self.selection.validate()?;
        if self.plan.contains(StepKind::Pet) && self.pet_id.is_none() {
            return Err(StepError::MissingPet);
        }
        self.confirmation.validate()?;
        let request = self.appointment_request()?;

        match api.create_appointment(&token, &request).await {
            Ok(id) => {
                let appointment = Appointment {
                    id,
                    service_id: self.service.id,
                    date: self.selection.date().ok_or(StepError::MissingDate)?,
                    time: self.slot().map(|s| s.time.clone()).unwrap_or_default(),
                    customer_name,
                    customer_email,
                    is_recurring: self.confirmation.recurring,
                    is_at_home: self.confirmation.at_home,
                    address: request.address.clone(),
                    professional_id: request.professional_user_id,
                    sport_id: request.sport_id,
                    pet_id: request.pet_id,
                    voucher_ids: request.voucher_ids.clone().unwrap_or_default(),
                    total_price: request.total_price,
                };
                tracing::info!(
                    appointment_id = %appointment.id,
                    service_id = appointment.service_id,
                    total = appointment.total_price,
                    "appointment created"
                );
                self.appointment = Some(appointment.clone());
                Ok(StepOutcome::Booked(appointment))
            }
            Err(ApiError::Unauthorized) => Err(self.expire_session(session)),
            Err(err) => {
                tracing::warn!(service_id = self.service.id, error = %err, "appointment rejected");
                Err(StepError::remote(&err, BOOKING_FAILED))
            }
        }
    }

    /// Request body for the current selections.
    pub fn appointment_request(&self) -> Result<CreateAppointmentRequest, StepError> {
        let date = self.selection.date().ok_or(StepError::MissingDate)?;
        let slot = self.slot().ok_or(StepError::MissingSlot)?;
        let starts_at = appointment_time(date, &slot.time, self.utc_offset)
            .ok_or_else(|| StepError::SlotUnavailable {
                time: slot.time.clone(),
            })?;
        let (unlimited, limit) = self.confirmation.recurrence_fields();

        Ok(CreateAppointmentRequest {
            company_id: self.service.company_id,
            service_id: self.service.id,
            starts_at: starts_at.to_rfc3339(),
            at_home: Flag::from(self.confirmation.at_home),
            address: self.confirmation.address_field(),
            unlimited,
            limit,
            professional_user_id: self.selection.professional_user_id(),
            sport_id: self.selection.sport_id(),
            pet_id: self.pet_id,
            voucher_ids: self.confirmation.voucher_ids(),
            total_price: self.confirmation.total_price(slot),
        })
    }

    // ── Internals ──

    fn expect_step(&self, kind: StepKind) -> Result<(), StepError> {
        if self.step_kind() == Some(kind) {
            Ok(())
        } else {
            Err(StepError::WrongStep)
        }
    }

    fn rebuild_plan(&mut self, authenticated: bool) {
        self.plan = StepPlan::build(self.selection.requires_pet(), authenticated);
        self.position = self.position.min(self.plan.len().saturating_sub(1));
    }

    fn record(
        &mut self,
        result: Result<StepOutcome, StepError>,
    ) -> Result<StepOutcome, StepError> {
        match &result {
            Ok(_) => self.error = None,
            Err(err) => self.error = Some(err.to_string()),
        }
        result
    }
}

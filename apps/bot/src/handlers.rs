use buzke_booking::wizard::{format_phone, AuthMode, Country};
use buzke_booking::{ApiError, BookingWizard, Session, StepError, StepKind, StepOutcome};
use chrono::NaiveDate;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError as TelegramApiError, RequestError};

use crate::callbacks::{Action, Input};
use crate::rate_limit::Tier;
use crate::state::{first_of_month, BotState, ChatFlow};
use crate::{keyboards, render, Command};

const COMPANY_FETCH_FAILED: &str = "Não foi possível carregar o estabelecimento.";
const SERVICES_FETCH_FAILED: &str = "Não foi possível carregar os serviços.";
const DATE_UNAVAILABLE: &str = "Não é possível agendar nesta data.";
const SERVICE_NOT_FOUND: &str = "Serviço não encontrado. Atualize a lista.";
const NO_BOOKING: &str = "Nenhum agendamento em andamento. Use /start.";
const USE_BUTTONS: &str = "Use os botões acima ou /start para começar.";
const LOGGED_OUT: &str = "Você saiu da sua conta.";
const BOOKED: &str = "✅ Agendamento confirmado!";

/// A message body plus its keyboard.
pub struct View {
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
}

impl View {
    fn new(text: String, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text,
            keyboard: Some(keyboard),
        }
    }

    fn text(text: String) -> Self {
        Self {
            text,
            keyboard: None,
        }
    }
}

/// What a callback produced: a redrawn view, a prompt for typed input and
/// a toast for the callback answer. Any of them may be absent.
#[derive(Default)]
struct Reply {
    view: Option<View>,
    prompt: Option<Input>,
    toast: Option<String>,
}

impl Reply {
    fn view(view: View) -> Self {
        Self {
            view: Some(view),
            ..Self::default()
        }
    }

    fn toast(text: impl Into<String>) -> Self {
        Self {
            toast: Some(text.into()),
            ..Self::default()
        }
    }
}

fn rate_limited(retry_after: u64) -> String {
    format!("Muitas tentativas. Tente novamente em {retry_after} s.")
}

// ── Command handlers ──

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: &BotState,
) -> anyhow::Result<()> {
    let chat_id = msg.chat.id;
    let chat = state.chat(chat_id.0);
    let Ok(mut guard) = chat.try_lock() else {
        bot.send_message(chat_id, render::BUSY).await?;
        return Ok(());
    };
    let flow = &mut *guard;

    let view = match cmd {
        Command::Start => profile_view(state, flow, ProfilePage::Card).await,
        Command::Horarios => profile_view(state, flow, ProfilePage::Hours).await,
        Command::Avaliacoes => profile_view(state, flow, ProfilePage::Reviews).await,
        Command::Sair => {
            flow.input = None;
            match flow.wizard.as_mut() {
                Some(wizard) => {
                    wizard.logout(&mut flow.session);
                }
                None => flow.session.logout(),
            }
            tracing::info!(chat_id = chat_id.0, "visitor logged out");
            View::text(LOGGED_OUT.to_string())
        }
        Command::Help => View::text(render::help()),
    };
    show(&bot, chat_id, None, view).await
}

// ── Callback query handler (inline button clicks) ──

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: &BotState) -> anyhow::Result<()> {
    let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(Action::parse) else {
        tracing::debug!(data = ?q.data, "unknown callback data");
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };

    let chat = state.chat(chat_id.0);
    let Ok(mut guard) = chat.try_lock() else {
        bot.answer_callback_query(&q.id).text(render::BUSY).await?;
        return Ok(());
    };
    let reply = apply(state, &mut guard, chat_id.0, action).await;
    drop(guard);

    match reply.toast {
        Some(toast) => bot.answer_callback_query(&q.id).text(toast).await?,
        None => bot.answer_callback_query(&q.id).await?,
    };
    if let Some(view) = reply.view {
        show(&bot, chat_id, Some(message_id), view).await?;
    }
    if let Some(input) = reply.prompt {
        bot.send_message(chat_id, input.prompt()).await?;
    }
    Ok(())
}

async fn apply(state: &BotState, flow: &mut ChatFlow, chat_id: i64, action: Action) -> Reply {
    let today = state.today();
    if !matches!(action, Action::Ask(_)) {
        flow.input = None;
    }

    match action {
        Action::Noop => return Reply::default(),
        Action::Services(date) => {
            if !keyboards::in_catalog_window(date, today) {
                return Reply::toast(DATE_UNAVAILABLE);
            }
            return Reply::view(catalog_view(state, flow, date).await);
        }
        Action::Hours => return Reply::view(profile_view(state, flow, ProfilePage::Hours).await),
        Action::Reviews => return Reply::view(profile_view(state, flow, ProfilePage::Reviews).await),
        Action::OpenService(id) => {
            let Some(service) = flow.service(id).cloned() else {
                return Reply::toast(SERVICE_NOT_FOUND);
            };
            tracing::info!(chat_id, service_id = id, "booking started");
            flow.open_wizard(service, today, state.utc_offset);
            return Reply::view(wizard_view(flow, today));
        }
        Action::Close => {
            flow.close_wizard();
            let date = flow.catalog_date.max(today);
            return Reply::view(catalog_view(state, flow, date).await);
        }
        Action::Month(month) => {
            flow.calendar_month = first_of_month(month).max(first_of_month(today));
            return Reply::view(wizard_view(flow, today));
        }
        Action::Logout => {
            match flow.wizard.as_mut() {
                Some(wizard) => {
                    wizard.logout(&mut flow.session);
                }
                None => flow.session.logout(),
            }
            return Reply::view(wizard_view(flow, today));
        }
        Action::Ask(input) => {
            if flow.wizard.is_none() {
                return Reply::toast(NO_BOOKING);
            }
            flow.input = Some(input);
            return Reply {
                prompt: Some(input),
                ..Reply::default()
            };
        }
        _ => {}
    }

    let ChatFlow {
        session, wizard, ..
    } = &mut *flow;
    let Some(wizard) = wizard.as_mut() else {
        return Reply::toast(NO_BOOKING);
    };
    let toast = drive(state, chat_id, wizard, session, action, today).await;
    Reply {
        view: Some(wizard_view(flow, today)),
        prompt: None,
        toast,
    }
}

/// Runs one wizard action. The wizard keeps its own inline error, so only
/// rate limits, past dates and a finished booking produce a toast.
async fn drive(
    state: &BotState,
    chat_id: i64,
    wizard: &mut BookingWizard,
    session: &mut Session,
    action: Action,
    today: NaiveDate,
) -> Option<String> {
    let api = state.api.as_ref();
    let result = match action {
        Action::Date(date) if date < today => return Some(DATE_UNAVAILABLE.to_string()),
        Action::Date(date) => wizard.select_date(api, session, date).await,
        Action::Slot(time) => wizard.select_slot(&time),
        Action::Professional(id) => wizard.select_professional(id),
        Action::Sport(id) => wizard.select_sport(id),
        Action::Next => wizard.continue_step(api, session).await,
        Action::Back => wizard.back(),
        Action::LoginMode => {
            wizard.auth_mut().mode = AuthMode::Login;
            Ok(StepOutcome::Updated)
        }
        Action::RegisterMode => {
            wizard.auth_mut().mode = AuthMode::Register;
            Ok(StepOutcome::Updated)
        }
        Action::ToggleCountry => {
            let register = &mut wizard.auth_mut().register;
            register.country = match register.country {
                Country::Brasil => Country::Uruguai,
                Country::Uruguai => Country::Brasil,
            };
            // digit counts differ per country
            register.phone.clear();
            Ok(StepOutcome::Updated)
        }
        Action::SubmitAuth => {
            if let Err(retry) = state.limiter.check(Tier::Auth, chat_id) {
                tracing::warn!(chat_id, "auth attempts rate limited");
                return Some(rate_limited(retry));
            }
            match wizard.auth().mode {
                AuthMode::Login => wizard.login(api, session).await,
                AuthMode::Register => wizard.register(api, session).await,
            }
        }
        Action::Pet(id) => wizard.choose_pet(api, session, id).await,
        Action::NewPetForm => {
            wizard.pet_mut().show_new_form = true;
            Ok(StepOutcome::Updated)
        }
        Action::ReloadPets => wizard.reload_pets(api, session).await,
        Action::PetType(id) => {
            wizard.pet_mut().form.type_id = Some(id);
            Ok(StepOutcome::Updated)
        }
        Action::PetSex(sex) => {
            wizard.pet_mut().form.sex = Some(sex);
            Ok(StepOutcome::Updated)
        }
        Action::CreatePet => wizard.create_pet(api, session).await,
        Action::Recurring(on) => wizard.set_recurring(on),
        Action::Recurrence(duration) => wizard.set_recurrence(duration),
        Action::AtHome(on) => wizard.set_at_home(on),
        Action::Confirm => {
            if let Err(retry) = state.limiter.check(Tier::Booking, chat_id) {
                tracing::warn!(chat_id, "booking attempts rate limited");
                return Some(rate_limited(retry));
            }
            wizard.confirm(api, session).await
        }
        // handled in `apply` before the wizard is looked up
        _ => return None,
    };
    settle(chat_id, result)
}

fn settle(chat_id: i64, result: Result<StepOutcome, StepError>) -> Option<String> {
    match result {
        Ok(StepOutcome::Booked(appointment)) => {
            tracing::info!(chat_id, appointment_id = %appointment.id, "booking confirmed");
            Some(BOOKED.to_string())
        }
        Ok(StepOutcome::Moved(step)) => {
            tracing::debug!(chat_id, ?step, "step changed");
            None
        }
        Ok(StepOutcome::Updated) => None,
        Err(err) => {
            tracing::debug!(chat_id, error = %err, "wizard action rejected");
            None
        }
    }
}

// ── Typed input ──

pub async fn handle_text(bot: Bot, msg: Message, state: &BotState) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let chat = state.chat(chat_id.0);
    let Ok(mut guard) = chat.try_lock() else {
        bot.send_message(chat_id, render::BUSY).await?;
        return Ok(());
    };
    let flow = &mut *guard;

    let Some(input) = flow.input.take() else {
        bot.send_message(chat_id, USE_BUTTONS).await?;
        return Ok(());
    };
    if input.is_secret() {
        // the visitor may have deleted it already
        bot.delete_message(chat_id, msg.id).await.ok();
    }

    let ChatFlow {
        session, wizard, ..
    } = &mut *flow;
    let Some(wizard) = wizard.as_mut() else {
        bot.send_message(chat_id, NO_BOOKING).await?;
        return Ok(());
    };
    fill(state, chat_id.0, wizard, session, input, text).await;

    let view = wizard_view(flow, state.today());
    show(&bot, chat_id, None, view).await
}

async fn fill(
    state: &BotState,
    chat_id: i64,
    wizard: &mut BookingWizard,
    session: &mut Session,
    input: Input,
    text: &str,
) {
    let value = text.trim();
    let result = match input {
        Input::Email => {
            let auth = wizard.auth_mut();
            match auth.mode {
                AuthMode::Login => auth.login.email = value.to_string(),
                AuthMode::Register => auth.register.email = value.to_string(),
            }
            Ok(StepOutcome::Updated)
        }
        Input::Password => {
            let auth = wizard.auth_mut();
            match auth.mode {
                AuthMode::Login => auth.login.password = text.to_string(),
                AuthMode::Register => auth.register.password = text.to_string(),
            }
            Ok(StepOutcome::Updated)
        }
        Input::Name => {
            wizard.auth_mut().register.name = value.to_string();
            Ok(StepOutcome::Updated)
        }
        Input::ConfirmPassword => {
            wizard.auth_mut().register.confirm_password = text.to_string();
            Ok(StepOutcome::Updated)
        }
        Input::Phone => {
            let register = &mut wizard.auth_mut().register;
            register.phone = format_phone(register.country, value);
            Ok(StepOutcome::Updated)
        }
        Input::PetName => {
            wizard.pet_mut().form.name = value.to_string();
            Ok(StepOutcome::Updated)
        }
        Input::Address => wizard.set_address(value),
        Input::Voucher => wizard.apply_voucher(state.api.as_ref(), session, value).await,
    };
    settle(chat_id, result);
}

// ── Views ──

enum ProfilePage {
    Card,
    Hours,
    Reviews,
}

fn company_error(err: &ApiError) -> String {
    match err {
        ApiError::NotFound(_) => render::load_error(render::COMPANY_NOT_FOUND),
        other => {
            tracing::warn!(error = %other, "business profile fetch failed");
            render::load_error(&other.user_message(COMPANY_FETCH_FAILED))
        }
    }
}

async fn profile_view(state: &BotState, flow: &mut ChatFlow, page: ProfilePage) -> View {
    let today = state.today();
    let company = match flow.company(state.api.as_ref(), &state.business_username).await {
        Ok(company) => company,
        Err(err) => return View::text(company_error(&err)),
    };
    match page {
        ProfilePage::Card => View::new(render::company_card(&company), keyboards::home(today)),
        ProfilePage::Hours => View::new(
            render::business_hours(&company),
            keyboards::back_to_catalog(today),
        ),
        ProfilePage::Reviews => {
            View::new(render::reviews(&company), keyboards::back_to_catalog(today))
        }
    }
}

async fn catalog_view(state: &BotState, flow: &mut ChatFlow, date: NaiveDate) -> View {
    let today = state.today();
    let company = match flow.company(state.api.as_ref(), &state.business_username).await {
        Ok(company) => company,
        Err(err) => return View::text(company_error(&err)),
    };
    match state.api.services(company.id, date).await {
        Ok(services) => {
            flow.services = services;
            flow.catalog_date = date;
            View::new(
                render::catalog(&company, date, &flow.services),
                keyboards::catalog(&flow.services, today, date),
            )
        }
        Err(err) => {
            tracing::warn!(company_id = company.id, %date, error = %err, "services fetch failed");
            View::new(
                render::load_error(&err.user_message(SERVICES_FETCH_FAILED)),
                keyboards::catalog(&[], today, date),
            )
        }
    }
}

fn wizard_view(flow: &ChatFlow, today: NaiveDate) -> View {
    let Some(wizard) = flow.wizard.as_ref() else {
        return View::text(NO_BOOKING.to_string());
    };
    let text = render::wizard(wizard, &flow.session);
    let keyboard = match (wizard.step_kind(), wizard.slot()) {
        (Some(StepKind::DateTime), _) => {
            keyboards::date_time(wizard.selection(), flow.calendar_month, today)
        }
        (Some(StepKind::Auth), _) => keyboards::auth(
            wizard.auth(),
            flow.session.is_authenticated(),
            flow.session.user().map(|u| u.first_name()),
        ),
        (Some(StepKind::Pet), _) => keyboards::pet(wizard.pet(), wizard.pet_id()),
        (Some(StepKind::Confirmation), Some(slot)) => {
            keyboards::confirmation(wizard.confirmation(), slot)
        }
        _ => keyboards::booked(),
    };
    View::new(text, keyboard)
}

/// Edits `message_id` in place when given, otherwise sends a new message.
async fn show(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    view: View,
) -> anyhow::Result<()> {
    if let Some(id) = message_id {
        let mut edit = bot
            .edit_message_text(chat_id, id, view.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = view.keyboard.clone() {
            edit = edit.reply_markup(keyboard);
        }
        match edit.await {
            Ok(_) | Err(RequestError::Api(TelegramApiError::MessageNotModified)) => return Ok(()),
            Err(err) => {
                tracing::debug!(error = %err, "edit failed, sending a new message");
            }
        }
    }

    let mut send = bot.send_message(chat_id, view.text).parse_mode(ParseMode::Html);
    if let Some(keyboard) = view.keyboard {
        send = send.reply_markup(keyboard);
    }
    send.await?;
    Ok(())
}

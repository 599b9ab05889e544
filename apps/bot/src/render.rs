//! HTML message bodies. Everything coming from the backend or the visitor
//! goes through `escape`.

use buzke_booking::models::{hh_mm, Appointment, Company, Service, TimeSlot};
use buzke_booking::pricing::format_brl;
use buzke_booking::wizard::{
    group_slots, recurrence_label, AuthMode, AuthStep, ConfirmationForm, PetStatus, PetStep,
    Requirement, Selection,
};
use buzke_booking::{BookingWizard, Session, StepKind};
use chrono::{Datelike, NaiveDate};
use teloxide::utils::html::escape;

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Monday-first, as chrono counts.
const WEEKDAYS_LONG: [&str; 7] = [
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
    "domingo",
];

pub const BUSY: &str = "Aguarde...";
pub const COMPANY_NOT_FOUND: &str = "Empresa não encontrada.";

fn month_name(date: NaiveDate) -> &'static str {
    MONTHS[date.month0() as usize]
}

/// `Outubro 2026`
pub fn month_title(date: NaiveDate) -> String {
    let name = month_name(date);
    let mut chars = name.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{capitalized} {}", date.year())
}

/// `terça-feira, 20 de outubro de 2026 às 10:00`
pub fn format_date_pt(date: NaiveDate, time: &str) -> String {
    format!(
        "{}, {} de {} de {} às {}",
        WEEKDAYS_LONG[date.weekday().num_days_from_monday() as usize],
        date.day(),
        month_name(date),
        date.year(),
        hh_mm(time)
    )
}

/// `20/10/2026`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Five stars, rounded to the nearest whole star.
pub fn star_bar(average: f64) -> String {
    let full = average.clamp(0.0, 5.0).round() as usize;
    format!("{}{}", "★".repeat(full), "☆".repeat(5 - full))
}

fn masked(secret: &str) -> String {
    if secret.is_empty() {
        "—".to_string()
    } else {
        "•".repeat(secret.chars().count())
    }
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "—".to_string()
    } else {
        escape(value)
    }
}

// ── Business profile ──

pub fn company_card(company: &Company) -> String {
    let mut text = format!("🏪 <b>{}</b>\n", escape(&company.name));
    if !company.description.is_empty() {
        text.push_str(&format!("<i>{}</i>\n", escape(&company.description)));
    }
    text.push_str(&format!("\n📍 {}\n", escape(&company.location_text())));
    if let Some(phone) = company.phone.as_deref().filter(|p| !p.is_empty()) {
        text.push_str(&format!("📞 {}\n", escape(phone)));
    }
    if let Some(wp) = company.whatsapp.as_deref().filter(|p| !p.is_empty()) {
        text.push_str(&format!("💬 WhatsApp: {}\n", escape(wp)));
    }
    if let Some(avg) = company.rating_average {
        text.push_str(&format!(
            "⭐ {avg:.1} ({} avaliações)\n",
            escape(&company.total_reviews)
        ));
    }
    text
}

pub fn business_hours(company: &Company) -> String {
    let mut text = format!("🕐 <b>Horários de atendimento</b>\n{}\n\n", escape(&company.name));
    if company.business_hours.is_empty() {
        text.push_str("Horários não informados.\n");
    }
    for h in &company.business_hours {
        text.push_str(&format!("<b>{}</b>: {}\n", escape(&h.day), escape(&h.hours)));
    }
    text.push_str(
        "\n<i>Em feriados nacionais, nosso estabelecimento permanece fechado. \
         Agendamentos podem ser feitos online 24 horas por dia, 7 dias por semana.</i>",
    );
    text
}

pub fn reviews(company: &Company) -> String {
    match company.rating_average {
        Some(avg) => format!(
            "⭐ <b>Avaliações</b>\n\n{} {avg:.1}\n{} avaliações",
            star_bar(avg),
            escape(&company.total_reviews)
        ),
        None => "⭐ <b>Nenhuma Avaliação</b>\n\nEste estabelecimento ainda não recebeu avaliações. \
                 Seja o primeiro a avaliar após sua visita!"
            .to_string(),
    }
}

pub fn catalog(company: &Company, date: NaiveDate, services: &[Service]) -> String {
    let mut text = format!(
        "🏪 <b>{}</b>\n📅 Serviços para {}\n\n",
        escape(&company.name),
        short_date(date)
    );
    if services.is_empty() {
        text.push_str("Nenhum serviço disponível para esta data.");
        return text;
    }
    for s in services {
        text.push_str(&format!(
            "• <b>{}</b> · {} · {}\n",
            escape(&s.name),
            s.duration,
            format_brl(s.price)
        ));
        if !s.description.trim().is_empty() {
            text.push_str(&format!("  <i>{}</i>\n", escape(s.description.trim())));
        }
    }
    text.push_str("\nEscolha um serviço para agendar.");
    text
}

pub fn load_error(message: &str) -> String {
    format!("⚠️ {}", escape(message))
}

// ── Wizard ──

/// Whole wizard message: header, current step and the inline error.
pub fn wizard(wizard: &BookingWizard, session: &Session) -> String {
    if let Some(appointment) = wizard.appointment() {
        return booked(wizard.service(), appointment, wizard.confirmation(), wizard.slot());
    }
    let Some(step) = wizard.current_step() else {
        return String::new();
    };

    let mut text = format!(
        "💼 <b>{}</b>\nEtapa {} de {} · <b>{}</b>\n<i>{}</i>\n\n",
        escape(&wizard.service().name),
        wizard.step_number(),
        wizard.step_count(),
        step.title,
        step.description
    );
    let body = match step.kind {
        StepKind::DateTime => date_time(wizard.selection()),
        StepKind::Auth => auth(wizard.auth(), session),
        StepKind::Pet => pet(wizard.pet()),
        StepKind::Confirmation => confirmation(wizard, session),
    };
    text.push_str(&body);
    if let Some(error) = wizard.error() {
        text.push_str(&format!("\n\n⚠️ {}", escape(error)));
    }
    text
}

fn slot_line(slot: &TimeSlot) -> String {
    if slot.active {
        format!("{} · {}", escape(slot.display_label()), format_brl(slot.default_value))
    } else {
        let reason = slot.inactive_reason.as_deref().unwrap_or("Indisponível");
        format!("<s>{}</s> · {}", escape(slot.display_label()), escape(reason))
    }
}

pub fn date_time(selection: &Selection) -> String {
    let Some(date) = selection.date() else {
        return "Escolha uma data no calendário.".to_string();
    };
    let mut text = format!("📅 {}\n", short_date(date));
    let Some(availability) = selection.availability() else {
        return text;
    };
    if availability.slots.is_empty() {
        text.push_str("\nNenhum horário disponível para esta data.");
        return text;
    }
    for (period, slots) in group_slots(&availability.slots) {
        text.push_str(&format!("\n<b>{}</b>\n", period.label()));
        for slot in slots {
            text.push_str(&format!("  {}\n", slot_line(slot)));
        }
    }
    match selection.slot() {
        Some(slot) => {
            text.push_str(&format!("\n🕐 Horário: <b>{}</b>", escape(slot.display_label())));
            match selection.requirement() {
                Requirement::Professional => {
                    let chosen = selection
                        .professional_id()
                        .and_then(|id| availability.professional(id));
                    match chosen {
                        Some(p) => text.push_str(&format!("\n👤 {}", escape(&p.user.name))),
                        None => text.push_str("\nEscolha um profissional."),
                    }
                }
                Requirement::Sport => {
                    match selection.sport_id().and_then(|id| availability.sport(id)) {
                        Some(s) => text.push_str(&format!("\n🏅 {}", escape(s.name()))),
                        None => text.push_str("\nEscolha um esporte."),
                    }
                }
                Requirement::Nothing => {}
            }
        }
        None => text.push_str("\nEscolha um horário."),
    }
    text
}

pub fn auth(step: &AuthStep, session: &Session) -> String {
    if session.is_authenticated() {
        return match session.user() {
            Some(user) => format!(
                "Você está conectado como <b>{}</b> ({}).",
                escape(&user.name),
                escape(&user.email)
            ),
            None => "Você está conectado.".to_string(),
        };
    }
    match step.mode {
        AuthMode::Login => format!(
            "<b>Entrar</b>\nEmail: {}\nSenha: {}",
            or_dash(&step.login.email),
            masked(&step.login.password)
        ),
        AuthMode::Register => {
            let r = &step.register;
            format!(
                "<b>Criar conta</b>\nNome: {}\nEmail: {}\nSenha: {}\nConfirmar senha: {}\nPaís: {} ({})\nTelefone: {}",
                or_dash(&r.name),
                or_dash(&r.email),
                masked(&r.password),
                masked(&r.confirm_password),
                r.country.name(),
                r.country.phone_prefix(),
                or_dash(&r.phone)
            )
        }
    }
}

pub fn pet(step: &PetStep) -> String {
    match &step.status {
        PetStatus::Loading => "Carregando seus pets...".to_string(),
        PetStatus::Failed(message) => format!("⚠️ {}", escape(message)),
        PetStatus::Ready if step.show_new_form => {
            let form = &step.form;
            let kind = form
                .type_id
                .and_then(|id| step.pet_type(id))
                .map_or("—", |t| t.name.as_str());
            format!(
                "<b>Cadastrar Novo Pet</b>\nNome: {}\nTipo: {}\nSexo: {}",
                or_dash(&form.name),
                escape(kind),
                form.sex.map_or("—", |s| s.label())
            )
        }
        PetStatus::Ready => "Qual pet será atendido?".to_string(),
    }
}

fn price_line(original: f64, total: f64) -> String {
    if (original - total).abs() > f64::EPSILON {
        format!("<s>{}</s> <b>{}</b>", format_brl(original), format_brl(total))
    } else {
        format!("<b>{}</b>", format_brl(total))
    }
}

fn voucher_feedback(form: &ConfirmationForm) -> Option<String> {
    if let Some(err) = form.voucher_error() {
        return Some(format!("❌ {}", escape(err)));
    }
    let voucher = form.voucher()?;
    let message = form.voucher_message().unwrap_or_default();
    Some(format!("🎟 {}: {}", escape(&voucher.code), escape(message)))
}

pub fn confirmation(wizard: &BookingWizard, session: &Session) -> String {
    let (Some(date), Some(slot)) = (wizard.selection().date(), wizard.slot()) else {
        return String::new();
    };
    let form = wizard.confirmation();
    let mut text = format!("📅 {}\n", format_date_pt(date, &slot.time));

    if let Some(availability) = wizard.selection().availability() {
        if let Some(p) = wizard
            .selection()
            .professional_id()
            .and_then(|id| availability.professional(id))
        {
            text.push_str(&format!("👤 {}\n", escape(&p.user.name)));
        }
        if let Some(s) = wizard.selection().sport_id().and_then(|id| availability.sport(id)) {
            text.push_str(&format!("🏅 {}\n", escape(s.name())));
        }
    }
    if let Some(pet) = wizard.pet_id().and_then(|id| wizard.pet().pet(id)) {
        text.push_str(&format!("🐾 {}\n", escape(&pet.name)));
    }
    if let Some(user) = session.user() {
        text.push_str(&format!("🙋 {} ({})\n", escape(&user.name), escape(&user.email)));
    }

    if form.recurring {
        let kind = slot.fixed_type.as_deref().unwrap_or_default();
        text.push_str(&format!(
            "🔁 {} · {}\n",
            recurrence_label(kind),
            form.duration.label()
        ));
    }
    if form.at_home {
        text.push_str(&format!("🏠 Endereço: {}\n", or_dash(&form.address)));
    }
    if let Some(feedback) = voucher_feedback(form) {
        text.push_str(&format!("{feedback}\n"));
    }
    text.push_str(&format!(
        "\n💰 Total: {}",
        price_line(slot.default_value, form.total_price(slot))
    ));
    text
}

pub fn booked(
    service: &Service,
    appointment: &Appointment,
    form: &ConfirmationForm,
    slot: Option<&TimeSlot>,
) -> String {
    let mut text = format!(
        "🎉 <b>Agendamento Confirmado</b>\n\n💼 {}\n📅 {}\n🙋 {}\n",
        escape(&service.name),
        format_date_pt(appointment.date, &appointment.time),
        escape(&appointment.customer_name)
    );
    if appointment.is_recurring {
        text.push_str(&format!("🔁 Recorrente · {}\n", form.duration.label()));
    }
    if let Some(address) = appointment.address.as_deref().filter(|_| appointment.is_at_home) {
        text.push_str(&format!("🏠 {}\n", escape(address)));
    }
    let original = slot.map_or(appointment.total_price, |s| s.default_value);
    text.push_str(&format!(
        "💰 {}\n\nEnviamos os detalhes para {}.",
        price_line(original, appointment.total_price),
        escape(&appointment.customer_email)
    ));
    text
}

pub fn help() -> String {
    "📖 <b>Como agendar</b>\n\n\
     /start — perfil do estabelecimento\n\
     /horarios — horários de atendimento\n\
     /avaliacoes — avaliações\n\
     /sair — sair da sua conta\n\
     /help — ajuda"
        .to_string()
}

//! Inline keyboards. Every button is built from an `Action`.

use buzke_booking::models::{AppointmentSlots, Pet, PetSex, PetType, Service, TimeSlot};
use buzke_booking::pricing::format_brl;
use buzke_booking::wizard::{
    AuthMode, AuthStep, ConfirmationForm, PetStatus, PetStep, RecurrenceDuration, Requirement,
    Selection,
};
use chrono::{Datelike, Duration, Months, NaiveDate};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::callbacks::{Action, Input};
use crate::render::month_title;
use crate::state::first_of_month;

/// Days offered by the service catalog, today included.
pub const CATALOG_DAYS: i64 = 14;

const WEEKDAY_INITIALS: [&str; 7] = ["D", "S", "T", "Q", "Q", "S", "S"];
const SLOTS_PER_ROW: usize = 4;

type Rows = Vec<Vec<InlineKeyboardButton>>;

fn button(text: impl Into<String>, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.encode())
}

fn blank() -> InlineKeyboardButton {
    button(" ", Action::Noop)
}

fn marked(text: &str, selected: bool) -> String {
    if selected {
        format!("✅ {text}")
    } else {
        text.to_string()
    }
}

// ── Business profile ──

pub fn home(today: NaiveDate) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📅 Agendar", Action::Services(today))],
        vec![
            button("🕐 Horários", Action::Hours),
            button("⭐ Avaliações", Action::Reviews),
        ],
    ])
}

/// Back to the catalog from the hours and reviews views.
pub fn back_to_catalog(today: NaiveDate) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("📅 Ver serviços", Action::Services(today))]])
}

/// Whether `date` is inside the catalog window that starts at `today`.
pub fn in_catalog_window(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today && date < today + Duration::days(CATALOG_DAYS)
}

/// One button per service, then the 14-day strip.
pub fn catalog(services: &[Service], today: NaiveDate, selected: NaiveDate) -> InlineKeyboardMarkup {
    let mut rows: Rows = services
        .iter()
        .map(|s| {
            vec![button(
                format!("{} · {}", s.name, format_brl(s.price)),
                Action::OpenService(s.id),
            )]
        })
        .collect();

    let days: Vec<InlineKeyboardButton> = (0..CATALOG_DAYS)
        .map(|offset| {
            let day = today + Duration::days(offset);
            let label = day.format("%d/%m").to_string();
            let label = if day == selected {
                format!("•{label}•")
            } else {
                label
            };
            button(label, Action::Services(day))
        })
        .collect();
    rows.extend(days.chunks(7).map(<[_]>::to_vec));
    InlineKeyboardMarkup::new(rows)
}

// ── Step 1 ──

/// Sunday-first month grid. Days before `today` are shown but inert, and
/// the previous-month arrow stops at today's month.
pub fn calendar(month: NaiveDate, today: NaiveDate, selected: Option<NaiveDate>) -> Rows {
    let month = first_of_month(month);
    let current = first_of_month(today);

    let prev = month
        .checked_sub_months(Months::new(1))
        .filter(|_| month > current)
        .map_or_else(blank, |d| button("‹", Action::Month(d)));
    let next = month
        .checked_add_months(Months::new(1))
        .map_or_else(blank, |d| button("›", Action::Month(d)));
    let mut rows: Rows = vec![
        vec![prev, button(month_title(month), Action::Noop), next],
        WEEKDAY_INITIALS
            .iter()
            .map(|d| button(*d, Action::Noop))
            .collect(),
    ];

    let lead = month.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<InlineKeyboardButton> = (0..lead).map(|_| blank()).collect();
    for day in month.iter_days().take_while(|d| d.month() == month.month()) {
        let cell = if day < today {
            button("·", Action::Noop)
        } else if Some(day) == selected {
            button(format!("[{}]", day.day()), Action::Date(day))
        } else {
            button(day.day().to_string(), Action::Date(day))
        };
        cells.push(cell);
    }
    while cells.len() % 7 != 0 {
        cells.push(blank());
    }
    rows.extend(cells.chunks(7).map(<[_]>::to_vec));
    rows
}

/// Active slots only; inactive ones are listed in the message text.
pub fn slot_rows(slots: &[TimeSlot], selected: Option<&str>) -> Rows {
    let buttons: Vec<InlineKeyboardButton> = slots
        .iter()
        .filter(|s| s.active)
        .map(|s| {
            button(
                marked(s.display_label(), Some(s.time.as_str()) == selected),
                Action::Slot(s.time.clone()),
            )
        })
        .collect();
    buttons.chunks(SLOTS_PER_ROW).map(<[_]>::to_vec).collect()
}

/// Professionals free at `slot`, or every sport of a court booking.
pub fn requirement_rows(
    availability: &AppointmentSlots,
    requirement: Requirement,
    slot: &TimeSlot,
    selection: &Selection,
) -> Rows {
    match requirement {
        Requirement::Professional => availability
            .professionals
            .iter()
            .filter(|p| slot.offers_professional(p.user.id))
            .map(|p| {
                vec![button(
                    marked(&format!("👤 {}", p.user.name), selection.professional_id() == Some(p.id)),
                    Action::Professional(p.id),
                )]
            })
            .collect(),
        Requirement::Sport => availability
            .sports
            .iter()
            .map(|s| {
                vec![button(
                    marked(s.name(), selection.sport_id() == Some(s.id)),
                    Action::Sport(s.id),
                )]
            })
            .collect(),
        Requirement::Nothing => Vec::new(),
    }
}

pub fn date_time(
    selection: &Selection,
    month: NaiveDate,
    today: NaiveDate,
) -> InlineKeyboardMarkup {
    let mut rows = calendar(month, today, selection.date());
    if let Some(availability) = selection.availability() {
        rows.extend(slot_rows(&availability.slots, selection.slot().map(|s| s.time.as_str())));
        if let Some(slot) = selection.slot() {
            rows.extend(requirement_rows(availability, selection.requirement(), slot, selection));
        }
    }
    rows.push(vec![
        button("✖ Fechar", Action::Close),
        button("Continuar ›", Action::Next),
    ]);
    InlineKeyboardMarkup::new(rows)
}

// ── Step 2 ──

/// `first_name` is set when the session already knows its user.
pub fn auth(step: &AuthStep, authenticated: bool, first_name: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Rows = Vec::new();
    if authenticated {
        let label = match first_name {
            Some(name) => format!("Continuar como {name}"),
            None => "Continuar".to_string(),
        };
        rows.push(vec![button(label, Action::Next)]);
        rows.push(vec![button("Sair", Action::Logout)]);
    } else {
        match step.mode {
            AuthMode::Login => {
                rows.push(vec![
                    button("✉ Email", Action::Ask(Input::Email)),
                    button("🔑 Senha", Action::Ask(Input::Password)),
                ]);
                rows.push(vec![button("Entrar", Action::SubmitAuth)]);
                rows.push(vec![button("Não tem conta? Cadastre-se", Action::RegisterMode)]);
            }
            AuthMode::Register => {
                rows.push(vec![
                    button("Nome", Action::Ask(Input::Name)),
                    button("Email", Action::Ask(Input::Email)),
                ]);
                rows.push(vec![
                    button("Senha", Action::Ask(Input::Password)),
                    button("Confirmar senha", Action::Ask(Input::ConfirmPassword)),
                ]);
                rows.push(vec![
                    button(
                        format!("País: {}", step.register.country.name()),
                        Action::ToggleCountry,
                    ),
                    button("Telefone", Action::Ask(Input::Phone)),
                ]);
                rows.push(vec![button("Criar conta", Action::SubmitAuth)]);
                rows.push(vec![button("Já tem conta? Entrar", Action::LoginMode)]);
            }
        }
    }
    rows.push(vec![button("‹ Voltar", Action::Back)]);
    InlineKeyboardMarkup::new(rows)
}

// ── Step 3 ──

fn pet_list(pets: &[Pet], chosen: Option<i64>) -> Rows {
    pets.iter()
        .map(|p| {
            let label = format!("🐾 {} ({})", p.name, p.kind.name);
            vec![button(marked(&label, chosen == Some(p.id)), Action::Pet(p.id))]
        })
        .collect()
}

fn pet_form(types: &[PetType], type_id: Option<i64>, sex: Option<PetSex>) -> Rows {
    let mut rows: Rows = vec![vec![button("Nome do pet", Action::Ask(Input::PetName))]];
    let type_buttons: Vec<InlineKeyboardButton> = types
        .iter()
        .map(|t| button(marked(&t.name, type_id == Some(t.id)), Action::PetType(t.id)))
        .collect();
    rows.extend(type_buttons.chunks(3).map(<[_]>::to_vec));
    rows.push(
        [PetSex::Male, PetSex::Female]
            .into_iter()
            .map(|s| button(marked(s.label(), sex == Some(s)), Action::PetSex(s)))
            .collect(),
    );
    rows.push(vec![button("Salvar pet", Action::CreatePet)]);
    rows
}

pub fn pet(step: &PetStep, chosen: Option<i64>) -> InlineKeyboardMarkup {
    let mut rows: Rows = match &step.status {
        PetStatus::Loading => Vec::new(),
        PetStatus::Failed(_) => vec![vec![button("Tentar novamente", Action::ReloadPets)]],
        PetStatus::Ready if step.show_new_form => {
            pet_form(&step.pet_types, step.form.type_id, step.form.sex)
        }
        PetStatus::Ready => {
            let mut rows = pet_list(&step.pets, chosen);
            rows.push(vec![button("➕ Cadastrar novo pet", Action::NewPetForm)]);
            rows
        }
    };
    rows.push(vec![button("‹ Voltar", Action::Back)]);
    InlineKeyboardMarkup::new(rows)
}

// ── Step 4 ──

pub fn confirmation(form: &ConfirmationForm, slot: &TimeSlot) -> InlineKeyboardMarkup {
    let mut rows: Rows = Vec::new();

    if slot.enable_fixed_scheduling {
        rows.push(vec![button(
            marked("Agendamento recorrente", form.recurring),
            Action::Recurring(!form.recurring),
        )]);
        if form.recurring {
            rows.push(
                RecurrenceDuration::ALL
                    .into_iter()
                    .map(|d| button(marked(d.label(), form.duration == d), Action::Recurrence(d)))
                    .collect(),
            );
        }
    }

    if slot.only_at_home {
        rows.push(vec![button("🏠 Endereço", Action::Ask(Input::Address))]);
    } else if slot.at_home {
        let mut row = vec![button(
            marked("Atendimento em domicílio", form.at_home),
            Action::AtHome(!form.at_home),
        )];
        if form.at_home {
            row.push(button("🏠 Endereço", Action::Ask(Input::Address)));
        }
        rows.push(row);
    }

    if form.voucher().is_none() {
        rows.push(vec![button("🎟 Aplicar cupom", Action::Ask(Input::Voucher))]);
    }
    rows.push(vec![button("✅ Confirmar agendamento", Action::Confirm)]);
    rows.push(vec![button("‹ Voltar", Action::Back)]);
    InlineKeyboardMarkup::new(rows)
}

/// After booking; closing drops the finished wizard.
pub fn booked() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("📅 Novo agendamento", Action::Close)]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use teloxide::types::InlineKeyboardButtonKind;

    fn data(b: &InlineKeyboardButton) -> Option<Action> {
        match &b.kind {
            InlineKeyboardButtonKind::CallbackData(d) => Action::parse(d),
            _ => None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slot(extra: serde_json::Value) -> TimeSlot {
        let mut value = json!({ "time": "09:00", "default_value": "100.00" });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    // ── Calendar ──

    #[test]
    fn test_calendar_is_sunday_first() {
        // October 2026 starts on a Thursday.
        let rows = calendar(date(2026, 10, 1), date(2026, 10, 1), None);
        let first_week = &rows[2];
        assert_eq!(first_week.len(), 7);
        assert_eq!(first_week[3].text, " ");
        assert_eq!(first_week[4].text, "1");
        assert_eq!(data(&first_week[4]), Some(Action::Date(date(2026, 10, 1))));
        assert!(rows.iter().skip(2).all(|r| r.len() == 7));
    }

    #[test]
    fn test_calendar_past_days_are_inert() {
        let rows = calendar(date(2026, 10, 1), date(2026, 10, 15), Some(date(2026, 10, 20)));
        let days: Vec<&InlineKeyboardButton> = rows.iter().skip(2).flatten().collect();
        let dated: Vec<Action> = days.iter().filter_map(|b| data(b)).filter(|a| matches!(a, Action::Date(_))).collect();
        assert_eq!(dated.len(), 17);
        assert_eq!(dated[0], Action::Date(date(2026, 10, 15)));
        assert!(days.iter().any(|b| b.text == "[20]"));
    }

    #[test]
    fn test_calendar_navigation() {
        let rows = calendar(date(2026, 10, 1), date(2026, 10, 15), None);
        assert_eq!(data(&rows[0][0]), Some(Action::Noop));
        assert_eq!(data(&rows[0][2]), Some(Action::Month(date(2026, 11, 1))));
        assert_eq!(rows[0][1].text, "Outubro 2026");

        let rows = calendar(date(2026, 12, 1), date(2026, 10, 15), None);
        assert_eq!(data(&rows[0][0]), Some(Action::Month(date(2026, 11, 1))));
        assert_eq!(data(&rows[0][2]), Some(Action::Month(date(2027, 1, 1))));
    }

    // ── Catalog ──

    #[test]
    fn test_catalog_window() {
        let today = date(2026, 10, 15);
        assert!(in_catalog_window(today, today));
        assert!(in_catalog_window(date(2026, 10, 28), today));
        assert!(!in_catalog_window(date(2026, 10, 29), today));
        assert!(!in_catalog_window(date(2026, 10, 14), today));
    }

    #[test]
    fn test_catalog_strip_has_two_weeks() {
        let today = date(2026, 10, 15);
        let markup = catalog(&[], today, date(2026, 10, 16));
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0][1].text, "•16/10•");
        assert_eq!(data(&markup.inline_keyboard[1][6]), Some(Action::Services(date(2026, 10, 28))));
    }

    // ── Slots ──

    #[test]
    fn test_inactive_slots_have_no_button() {
        let slots = vec![
            slot(json!({})),
            slot(json!({ "time": "10:00", "active": false, "motivo": "Fechado" })),
            slot(json!({ "time": "11:00" })),
        ];
        let rows = slot_rows(&slots, Some("11:00"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][1].text, "✅ 11:00");
    }

    #[test]
    fn test_only_free_professionals_offered() {
        let availability: AppointmentSlots = serde_json::from_value(json!({
            "tipo": "Serviço",
            "profissionais": [
                { "id": 1, "usuario": { "id": 101, "nome": "Bia" } },
                { "id": 2, "usuario": { "id": 102, "nome": "Caio" } }
            ],
            "horarios": []
        }))
        .unwrap();
        let slot = slot(json!({ "availableProfessionals": [102] }));
        let rows = requirement_rows(&availability, Requirement::Professional, &slot, &Selection::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(data(&rows[0][0]), Some(Action::Professional(2)));
    }

    // ── Confirmation ──

    #[test]
    fn test_confirmation_toggles_follow_slot() {
        let plain = confirmation(&ConfirmationForm::default(), &slot(json!({})));
        let actions: Vec<Action> = plain.inline_keyboard.iter().flatten().filter_map(data).collect();
        assert!(!actions.iter().any(|a| matches!(a, Action::Recurring(_) | Action::AtHome(_))));
        assert!(actions.contains(&Action::Ask(Input::Voucher)));

        let s = slot(json!({ "enable_fixed_scheduling": true, "at_home": true }));
        let mut form = ConfirmationForm::for_slot(&s);
        form.set_recurring(&s, true).unwrap();
        let markup = confirmation(&form, &s);
        let actions: Vec<Action> = markup.inline_keyboard.iter().flatten().filter_map(data).collect();
        assert!(actions.contains(&Action::Recurring(false)));
        assert!(actions.contains(&Action::Recurrence(RecurrenceDuration::Unlimited)));
        assert!(actions.contains(&Action::AtHome(true)));
    }

    #[test]
    fn test_at_home_only_asks_for_address() {
        let s = slot(json!({ "only_at_home": true }));
        let markup = confirmation(&ConfirmationForm::for_slot(&s), &s);
        let actions: Vec<Action> = markup.inline_keyboard.iter().flatten().filter_map(data).collect();
        assert!(actions.contains(&Action::Ask(Input::Address)));
        assert!(!actions.iter().any(|a| matches!(a, Action::AtHome(_))));
    }

    // ── Auth ──

    #[test]
    fn test_signed_in_user_continues() {
        let markup = auth(&AuthStep::default(), true, Some("Ana"));
        assert_eq!(markup.inline_keyboard[0][0].text, "Continuar como Ana");
        assert_eq!(data(&markup.inline_keyboard[1][0]), Some(Action::Logout));
    }

    #[test]
    fn test_register_mode_shows_country() {
        let step = AuthStep {
            mode: AuthMode::Register,
            ..AuthStep::default()
        };
        let markup = auth(&step, false, None);
        let texts: Vec<&str> = markup.inline_keyboard.iter().flatten().map(|b| b.text.as_str()).collect();
        assert!(texts.contains(&"País: Brasil"));
        assert!(texts.contains(&"Criar conta"));
    }
}

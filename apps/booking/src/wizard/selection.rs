//! Step 1: date, slot and the professional or sport the slot requires.

use chrono::NaiveDate;

use crate::error::StepError;
use crate::models::{AppointmentSlots, BookingKind, TimeSlot};

/// What else step 1 needs once a slot is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Professional,
    Sport,
    Nothing,
}

/// Part of the day a slot falls in, used to group the slot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub fn of(slot: &TimeSlot) -> Self {
        match slot.hour().unwrap_or(0) {
            h if h < 12 => Self::Morning,
            h if h < 17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "Manhã",
            Self::Afternoon => "Tarde",
            Self::Evening => "Noite",
        }
    }
}

/// Slots grouped by period, in period order, skipping empty periods.
pub fn group_slots(slots: &[TimeSlot]) -> Vec<(DayPeriod, Vec<&TimeSlot>)> {
    [DayPeriod::Morning, DayPeriod::Afternoon, DayPeriod::Evening]
        .into_iter()
        .map(|period| {
            let group: Vec<&TimeSlot> = slots
                .iter()
                .filter(|s| DayPeriod::of(s) == period)
                .collect();
            (period, group)
        })
        .filter(|(_, group)| !group.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    date: Option<NaiveDate>,
    availability: Option<AppointmentSlots>,
    slot_time: Option<String>,
    professional_id: Option<i64>,
    sport_id: Option<i64>,
}

impl Selection {
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn availability(&self) -> Option<&AppointmentSlots> {
        self.availability.as_ref()
    }

    pub fn slots(&self) -> &[TimeSlot] {
        self.availability
            .as_ref()
            .map(|a| a.slots.as_slice())
            .unwrap_or(&[])
    }

    pub fn slot(&self) -> Option<&TimeSlot> {
        let time = self.slot_time.as_deref()?;
        self.availability.as_ref()?.slot(time)
    }

    pub fn professional_id(&self) -> Option<i64> {
        self.professional_id
    }

    pub fn sport_id(&self) -> Option<i64> {
        self.sport_id
    }

    pub fn requires_pet(&self) -> bool {
        self.availability
            .as_ref()
            .map(|a| a.requires_pet)
            .unwrap_or(false)
    }

    /// Professional/sport requirement of the picked slot. Nothing is required
    /// until a slot is picked.
    pub fn requirement(&self) -> Requirement {
        if self.slot_time.is_none() {
            return Requirement::Nothing;
        }
        match self.availability.as_ref().map(|a| &a.kind) {
            Some(BookingKind::Service) => Requirement::Professional,
            Some(BookingKind::Court) => Requirement::Sport,
            _ => Requirement::Nothing,
        }
    }

    /// New date: everything chosen for the previous date is dropped.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
        self.availability = None;
        self.slot_time = None;
        self.clear_resource();
    }

    /// Availability for the current date; `None` when the fetch failed.
    pub fn set_availability(&mut self, availability: Option<AppointmentSlots>) {
        self.availability = availability;
        self.slot_time = None;
        self.clear_resource();
    }

    pub fn select_slot(&mut self, time: &str) -> Result<(), StepError> {
        let slot = self
            .availability
            .as_ref()
            .and_then(|a| a.slot(time))
            .ok_or(StepError::SlotUnavailable { time: time.into() })?;
        if !slot.active {
            return Err(StepError::SlotUnavailable { time: time.into() });
        }
        self.slot_time = Some(time.to_string());
        self.clear_resource();
        Ok(())
    }

    /// `id` is the professional's own id; availability is checked against
    /// the professional's user id, which is what the slot lists.
    pub fn select_professional(&mut self, id: i64) -> Result<(), StepError> {
        if self.requirement() != Requirement::Professional {
            return Err(StepError::WrongStep);
        }
        let slot = self.slot().ok_or(StepError::MissingSlot)?;
        let professional = self
            .availability
            .as_ref()
            .and_then(|a| a.professional(id))
            .ok_or(StepError::ProfessionalUnavailable)?;
        if !slot.offers_professional(professional.user.id) {
            return Err(StepError::ProfessionalUnavailable);
        }
        self.professional_id = Some(id);
        Ok(())
    }

    pub fn select_sport(&mut self, id: i64) -> Result<(), StepError> {
        if self.requirement() != Requirement::Sport {
            return Err(StepError::WrongStep);
        }
        let known = self
            .availability
            .as_ref()
            .map(|a| a.sport(id).is_some())
            .unwrap_or(false);
        if !known {
            return Err(StepError::MissingSport);
        }
        self.sport_id = Some(id);
        Ok(())
    }

    /// Whether "Continue" may be pressed.
    pub fn validate(&self) -> Result<(), StepError> {
        if self.date.is_none() {
            return Err(StepError::MissingDate);
        }
        if self.slot().is_none() {
            return Err(StepError::MissingSlot);
        }
        match self.requirement() {
            Requirement::Professional if self.professional_id.is_none() => {
                Err(StepError::MissingProfessional)
            }
            Requirement::Sport if self.sport_id.is_none() => Err(StepError::MissingSport),
            _ => Ok(()),
        }
    }

    /// User id of the chosen professional, as the appointment payload wants it.
    pub fn professional_user_id(&self) -> Option<i64> {
        let id = self.professional_id?;
        Some(self.availability.as_ref()?.professional(id)?.user.id)
    }

    fn clear_resource(&mut self) {
        self.professional_id = None;
        self.sport_id = None;
    }
}

//! Step 3: choose one of the visitor's pets or register a new one.

use crate::error::StepError;
use crate::models::{CreatePetRequest, Pet, PetSex, PetType};

pub const PETS_FETCH_FAILED: &str = "Falha ao buscar seus pets.";
pub const PET_TYPES_FETCH_FAILED: &str = "Falha ao buscar os tipos de pet.";
pub const PET_CREATE_FAILED: &str = "Erro ao criar pet.";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PetStatus {
    /// Nothing fetched yet for the current session.
    #[default]
    Loading,
    /// Pets or pet types could not be fetched; only this step is blocked.
    Failed(String),
    Ready,
}

/// Fields of the "Cadastrar Novo Pet" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPetForm {
    pub name: String,
    pub type_id: Option<i64>,
    pub sex: Option<PetSex>,
}

impl NewPetForm {
    pub fn to_request(&self) -> Result<CreatePetRequest, StepError> {
        let name = self.name.trim();
        match (name.is_empty(), self.type_id, self.sex) {
            (false, Some(pet_type_id), Some(sex)) => Ok(CreatePetRequest {
                name: name.to_string(),
                pet_type_id,
                sex,
            }),
            _ => Err(StepError::IncompletePet),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PetStep {
    pub status: PetStatus,
    pub pets: Vec<Pet>,
    pub pet_types: Vec<PetType>,
    pub show_new_form: bool,
    pub form: NewPetForm,
}

impl PetStep {
    /// Both lists arrived. With no pets the creation form opens right away.
    pub fn loaded(&mut self, pets: Vec<Pet>, pet_types: Vec<PetType>) {
        self.show_new_form = pets.is_empty();
        self.pets = pets;
        self.pet_types = pet_types;
        self.status = PetStatus::Ready;
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        self.status = PetStatus::Failed(message.into());
    }

    pub fn is_ready(&self) -> bool {
        self.status == PetStatus::Ready
    }

    pub fn pet(&self, id: i64) -> Option<&Pet> {
        self.pets.iter().find(|p| p.id == id)
    }

    pub fn pet_type(&self, id: i64) -> Option<&PetType> {
        self.pet_types.iter().find(|t| t.id == id)
    }

    /// Back to `Loading`, e.g. after the session changed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PetKind;

    fn pet(id: i64) -> Pet {
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

    fn types() -> Vec<PetType> {
        vec![PetType {
            id: 1,
            slug: Some("cachorro".into()),
            name: "Cachorro".into(),
        }]
    }

    #[test]
    fn test_zero_pets_opens_form() {
        let mut step = PetStep::default();
        step.loaded(vec![], types());
        assert!(step.is_ready());
        assert!(step.show_new_form);
    }

    #[test]
    fn test_existing_pets_hide_form() {
        let mut step = PetStep::default();
        step.loaded(vec![pet(3)], types());
        assert!(!step.show_new_form);
        assert_eq!(step.pet(3).map(|p| p.name.as_str()), Some("Thor"));
        assert!(step.pet(4).is_none());
        assert_eq!(step.pet_type(1).map(|t| t.name.as_str()), Some("Cachorro"));
    }

    #[test]
    fn test_failure_blocks_step() {
        let mut step = PetStep::default();
        step.failed(PETS_FETCH_FAILED);
        assert!(!step.is_ready());
        assert_eq!(step.status, PetStatus::Failed(PETS_FETCH_FAILED.into()));
    }

    #[test]
    fn test_new_pet_form_requires_all_fields() {
        let mut form = NewPetForm {
            name: "  ".into(),
            type_id: Some(1),
            sex: Some(PetSex::Female),
        };
        assert_eq!(form.to_request().unwrap_err(), StepError::IncompletePet);

        form.name = " Luna ".into();
        let request = form.to_request().unwrap();
        assert_eq!(request.name, "Luna");
        assert_eq!(request.sex, PetSex::Female);

        form.sex = None;
        assert!(form.to_request().is_err());
    }
}

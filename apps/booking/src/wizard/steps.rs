/// The kinds of step a booking can go through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    DateTime,
    Auth,
    Pet,
    Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    pub kind: StepKind,
    pub title: &'static str,
    pub description: &'static str,
}

impl StepDescriptor {
    fn new(kind: StepKind, authenticated: bool) -> Self {
        let (title, description) = match kind {
            StepKind::DateTime => ("Data e Hora", "Escolha o melhor horário"),
            StepKind::Auth if authenticated => ("Login", "Continue com sua conta"),
            StepKind::Auth => ("Login", "Acesse ou crie sua conta"),
            StepKind::Pet => ("Pet", "Selecione seu pet"),
            StepKind::Confirmation => ("Confirmação", "Revise e finalize"),
        };
        Self {
            kind,
            title,
            description,
        }
    }
}

/// Ordered step list for one wizard. Built from the current flags and
/// indexed by position; never renumbered in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    steps: Vec<StepDescriptor>,
}

impl StepPlan {
    pub fn build(requires_pet: bool, authenticated: bool) -> Self {
        let mut kinds = vec![StepKind::DateTime, StepKind::Auth];
        if requires_pet {
            kinds.push(StepKind::Pet);
        }
        kinds.push(StepKind::Confirmation);

        Self {
            steps: kinds
                .into_iter()
                .map(|k| StepDescriptor::new(k, authenticated))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&StepDescriptor> {
        self.steps.get(position)
    }

    pub fn position_of(&self, kind: StepKind) -> Option<usize> {
        self.steps.iter().position(|s| s.kind == kind)
    }

    pub fn contains(&self, kind: StepKind) -> bool {
        self.position_of(kind).is_some()
    }

    pub fn last(&self) -> Option<&StepDescriptor> {
        self.steps.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.iter()
    }
}

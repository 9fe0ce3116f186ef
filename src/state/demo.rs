//! Sample data driving the showcase views.

use crate::widgets::{CellValue, Column, Step};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::{Dummy, Fake, Faker};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

pub const PLANS: [&str; 3] = ["Free", "Pro", "Enterprise"];

/// Code accepted by the verification view.
///
pub const DEMO_VERIFICATION_CODE: &str = "123456";

/// Data collected by the onboarding form.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnboardingForm {
    pub name: String,
    pub email: String,
    pub company: String,
    pub team_size: String,
    pub plan: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    Company,
    TeamSize,
    Plan,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Full name",
            FormField::Email => "Work email",
            FormField::Company => "Company",
            FormField::TeamSize => "Team size",
            FormField::Plan => "Plan (Free, Pro, Enterprise)",
        }
    }

    pub fn value<'a>(&self, form: &'a OnboardingForm) -> &'a str {
        match self {
            FormField::Name => &form.name,
            FormField::Email => &form.email,
            FormField::Company => &form.company,
            FormField::TeamSize => &form.team_size,
            FormField::Plan => &form.plan,
        }
    }

    pub fn value_mut<'a>(&self, form: &'a mut OnboardingForm) -> &'a mut String {
        match self {
            FormField::Name => &mut form.name,
            FormField::Email => &mut form.email,
            FormField::Company => &mut form.company,
            FormField::TeamSize => &mut form.team_size,
            FormField::Plan => &mut form.plan,
        }
    }
}

/// Editable fields on each onboarding step. The review step has none.
///
pub fn step_fields(step: usize) -> &'static [FormField] {
    match step {
        0 => &[FormField::Name, FormField::Email],
        1 => &[FormField::Company, FormField::TeamSize],
        2 => &[FormField::Plan],
        _ => &[],
    }
}

fn looks_like_email(value: &str) -> bool {
    value
        .trim()
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.') && !domain.ends_with('.'))
}

/// The four onboarding steps. Choosing a plan is checked asynchronously after
/// `plan_check_delay` to mimic a server round trip.
///
pub fn onboarding_steps(plan_check_delay: Duration) -> Vec<Step<OnboardingForm>> {
    vec![
        Step::new("account", "Account")
            .description("Who will own the workspace")
            .validate_with(|form: &OnboardingForm| {
                Ok(!form.name.trim().is_empty() && looks_like_email(&form.email))
            }),
        Step::new("company", "Company")
            .description("Tell us about your team")
            .optional()
            .validate_with(|form: &OnboardingForm| {
                let size = form.team_size.trim();
                Ok(size.is_empty() || size.parse::<u32>().is_ok_and(|n| n > 0))
            }),
        Step::new("plan", "Plan")
            .description("Pick a subscription")
            .validate_async(move |form: &OnboardingForm| {
                let plan = form.plan.trim().to_string();
                async move {
                    tokio::time::sleep(plan_check_delay).await;
                    Ok(PLANS.iter().any(|p| p.eq_ignore_ascii_case(&plan)))
                }
            }),
        Step::new("review", "Review").description("Confirm and finish"),
    ]
}

struct PlanName;

impl Dummy<PlanName> for String {
    fn dummy_with_rng<R: Rng + ?Sized>(_: &PlanName, rng: &mut R) -> String {
        PLANS.choose(rng).copied().unwrap_or("Free").to_string()
    }
}

/// A row of the customers table.
///
#[derive(Debug, Clone, Serialize, Dummy, PartialEq)]
pub struct Customer {
    pub id: u32,
    #[dummy(faker = "Name()")]
    pub name: String,
    #[dummy(faker = "SafeEmail()")]
    pub email: String,
    #[dummy(faker = "CompanyName()")]
    pub company: String,
    #[dummy(faker = "PlanName")]
    pub plan: String,
    #[dummy(faker = "1..500")]
    pub seats: u32,
    #[dummy(faker = "9.0..5000.0")]
    pub mrr: f64,
    pub active: bool,
}

/// Generate `count` customers with sequential identifiers.
///
pub fn fake_customers(count: usize) -> Vec<Customer> {
    (0..count)
        .map(|i| {
            let mut customer: Customer = Faker.fake();
            customer.id = i as u32 + 1;
            customer.mrr = (customer.mrr * 100.0).round() / 100.0;
            customer
        })
        .collect()
}

pub fn customer_columns() -> Vec<Column<Customer>> {
    vec![
        Column::new("id", "#", |c: &Customer| c.id).unfilterable(),
        Column::new("name", "Name", |c: &Customer| c.name.clone()),
        Column::new("email", "Email", |c: &Customer| c.email.clone()).unsortable(),
        Column::new("company", "Company", |c: &Customer| c.company.clone()),
        Column::new("plan", "Plan", |c: &Customer| c.plan.clone()),
        Column::new("seats", "Seats", |c: &Customer| c.seats),
        Column::new("mrr", "MRR", |c: &Customer| c.mrr),
        Column::new("active", "Active", |c: &Customer| CellValue::Bool(c.active)).unfilterable(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{StepConfig, StepController, Transition};

    fn controller() -> StepController<OnboardingForm> {
        StepController::new(
            onboarding_steps(Duration::from_millis(600)),
            OnboardingForm::default(),
            StepConfig {
                auto_save: false,
                ..StepConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_email_check() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada.example.com"));
    }

    #[test]
    fn test_fields_map_to_form() {
        let mut form = OnboardingForm::default();
        FormField::Plan.value_mut(&mut form).push_str("Pro");
        assert_eq!(form.plan, "Pro");
        assert_eq!(FormField::Plan.value(&form), "Pro");
        assert!(step_fields(3).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_onboarding_flow() {
        let mut steps = controller();
        assert_eq!(steps.next_step().await, Transition::Blocked);

        steps.data_mut().name = "Ada Lovelace".to_string();
        steps.data_mut().email = "ada@example.com".to_string();
        assert_eq!(steps.next_step().await, Transition::Moved(1));

        steps.data_mut().team_size = "many".to_string();
        assert_eq!(steps.next_step().await, Transition::Blocked);
        steps.data_mut().team_size = "12".to_string();
        assert_eq!(steps.next_step().await, Transition::Moved(2));

        steps.data_mut().plan = "gold".to_string();
        assert_eq!(steps.next_step().await, Transition::Blocked);
        steps.data_mut().plan = "pro".to_string();
        assert_eq!(steps.next_step().await, Transition::Moved(3));
        assert_eq!(steps.next_step().await, Transition::Completed);
    }

    #[test]
    fn test_fake_customers() {
        let customers = fake_customers(25);
        assert_eq!(customers.len(), 25);
        assert_eq!(customers[0].id, 1);
        assert_eq!(customers[24].id, 25);
        assert!(customers.iter().all(|c| PLANS.contains(&c.plan.as_str())));
        assert!(customers.iter().all(|c| (1..500).contains(&c.seats)));
    }
}

//! Multi-step form controller.
//!
//! A [`StepController`] walks a fixed, ordered list of [`Step`]s. Moving
//! forward runs the current step's validator first; moving backward never
//! validates. Validators may be synchronous or async, and any error they
//! raise is turned into a generic message recorded against that step. While
//! auto-save is enabled an interval task periodically marks the form as
//! saved.

use super::timer::TaskHandle;
use super::WidgetError;
use chrono::{DateTime, Utc};
use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Message recorded when a validator rejects the current step.
pub const INCOMPLETE_STEP_MESSAGE: &str = "Please complete all required fields before continuing";

/// Message recorded when a validator fails with an error.
pub const VALIDATION_ERROR_MESSAGE: &str = "Validation failed. Please try again.";

const DEFAULT_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(500);

pub type ValidationFuture = Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send>>;
pub type Validator<D> = Arc<dyn Fn(&D) -> ValidationFuture + Send + Sync>;

type StepChangeCallback = Box<dyn FnMut(usize, Direction) + Send>;
type CompleteCallback<D> = Box<dyn FnMut(&D) + Send>;

/// Direction of a step transition.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Result of a navigation request.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Position moved to the given index
    Moved(usize),
    /// Validation failed and movement was refused
    Blocked,
    /// The last step validated and the completion callback fired
    Completed,
    /// Nothing to do (boundary, skip not permitted, form already finished)
    Ignored,
}

/// Display status of a single step, used by progress indicators.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Complete,
    Current,
    Upcoming,
    Error,
}

/// One page of a multi-step form.
///
pub struct Step<D> {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub optional: bool,
    validator: Option<Validator<D>>,
}

impl<D: 'static> Step<D> {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Step {
            id: id.into(),
            title: title.into(),
            description: None,
            optional: false,
            validator: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the step as skippable.
    ///
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Attach a synchronous validator.
    ///
    pub fn validate_with<F>(mut self, validator: F) -> Self
    where
        F: Fn(&D) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(move |data: &D| {
            let outcome = validator(data);
            Box::pin(async move { outcome }) as ValidationFuture
        }));
        self
    }

    /// Attach an async validator. The closure gets the form data by reference
    /// and must copy out whatever its future needs.
    ///
    pub fn validate_async<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(&D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.validator = Some(Arc::new(move |data: &D| {
            Box::pin(validator(data)) as ValidationFuture
        }));
        self
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }
}

/// Controller configuration.
///
#[derive(Debug, Clone)]
pub struct StepConfig {
    pub auto_save: bool,
    pub auto_save_interval: Duration,
    /// Allow failed validations to move forward and optional steps to be
    /// skipped.
    pub allow_skip: bool,
    /// Length of the stand-in persistence call performed by each auto-save.
    pub save_delay: Duration,
}

impl Default for StepConfig {
    fn default() -> Self {
        StepConfig {
            auto_save: true,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL,
            allow_skip: false,
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }
}

/// Auto-save progress shared with the interval task.
///
#[derive(Debug, Clone, Default)]
pub struct AutoSaveStatus {
    pub saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
}

/// Multi-step form state machine over caller-defined form data `D`.
///
pub struct StepController<D> {
    steps: Vec<Step<D>>,
    config: StepConfig,
    data: D,
    current: usize,
    completed: BTreeSet<usize>,
    errors: BTreeMap<usize, String>,
    validating: bool,
    finished: bool,
    auto_save: Arc<Mutex<AutoSaveStatus>>,
    auto_save_task: Option<TaskHandle>,
    on_step_change: Option<StepChangeCallback>,
    on_complete: Option<CompleteCallback<D>>,
}

impl<D> StepController<D> {
    /// Build a controller positioned on the first step. Starts the auto-save
    /// timer when enabled, which requires a running tokio runtime.
    ///
    pub fn new(steps: Vec<Step<D>>, data: D, config: StepConfig) -> Result<Self, WidgetError> {
        if steps.is_empty() {
            return Err(WidgetError::NoSteps);
        }
        let auto_save = Arc::new(Mutex::new(AutoSaveStatus::default()));
        let auto_save_task = if config.auto_save {
            Some(spawn_auto_save(
                Arc::clone(&auto_save),
                config.auto_save_interval,
                config.save_delay,
            )?)
        } else {
            None
        };
        debug!(
            "Created step controller with {} steps (auto-save: {})",
            steps.len(),
            config.auto_save
        );
        Ok(StepController {
            steps,
            config,
            data,
            current: 0,
            completed: BTreeSet::new(),
            errors: BTreeMap::new(),
            validating: false,
            finished: false,
            auto_save,
            auto_save_task,
            on_step_change: None,
            on_complete: None,
        })
    }

    pub fn on_step_change<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize, Direction) + Send + 'static,
    {
        self.on_step_change = Some(Box::new(callback));
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&D) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Move to `target`. Forward moves past the current step validate it
    /// first; a failure blocks the move unless skipping is allowed.
    ///
    pub async fn go_to_step(&mut self, target: usize, direction: Direction) -> Transition {
        if target >= self.steps.len() || target == self.current {
            return Transition::Ignored;
        }
        if direction == Direction::Forward && target > self.current {
            let valid = self.validate_current().await;
            if !valid && !self.config.allow_skip {
                debug!("Step {} blocked by validation", self.current);
                return Transition::Blocked;
            }
        }
        self.move_to(target, direction)
    }

    /// Validate the current step and advance, or fire completion on the last
    /// step.
    ///
    pub async fn next_step(&mut self) -> Transition {
        if self.finished {
            return Transition::Ignored;
        }
        if self.is_last() {
            if self.validate_current().await {
                self.complete();
                Transition::Completed
            } else {
                Transition::Blocked
            }
        } else {
            self.go_to_step(self.current + 1, Direction::Forward).await
        }
    }

    /// Move back one step without validating.
    ///
    pub fn prev_step(&mut self) -> Transition {
        if self.current == 0 {
            return Transition::Ignored;
        }
        self.move_to(self.current - 1, Direction::Backward)
    }

    /// Advance past an optional step without validating it.
    ///
    pub fn skip_step(&mut self) -> Transition {
        if self.finished || !self.config.allow_skip || !self.steps[self.current].optional {
            return Transition::Ignored;
        }
        debug!("Skipping optional step {}", self.current);
        if self.is_last() {
            self.complete();
            Transition::Completed
        } else {
            self.move_to(self.current + 1, Direction::Forward)
        }
    }

    /// Jump to any completed step, or to the step right after the furthest
    /// completed one.
    ///
    pub async fn jump_to_step(&mut self, target: usize) -> Transition {
        if !self.can_go_to_step(target) {
            return Transition::Ignored;
        }
        let direction = if target > self.current {
            Direction::Forward
        } else {
            Direction::Backward
        };
        self.go_to_step(target, direction).await
    }

    pub fn can_go_to_step(&self, target: usize) -> bool {
        if target >= self.steps.len() {
            return false;
        }
        let frontier = self.completed.iter().next_back().map_or(0, |last| last + 1);
        self.completed.contains(&target) || target <= frontier
    }

    async fn validate_current(&mut self) -> bool {
        let index = self.current;
        let Some(validator) = self.steps[index].validator.clone() else {
            self.errors.remove(&index);
            self.completed.insert(index);
            return true;
        };

        self.validating = true;
        let outcome = validator(&self.data).await;
        self.validating = false;

        match outcome {
            Ok(true) => {
                self.errors.remove(&index);
                self.completed.insert(index);
                true
            }
            Ok(false) => {
                self.errors.insert(index, INCOMPLETE_STEP_MESSAGE.to_string());
                false
            }
            Err(e) => {
                warn!("Validator for step '{}' failed: {}", self.steps[index].id, e);
                self.errors.insert(index, VALIDATION_ERROR_MESSAGE.to_string());
                false
            }
        }
    }

    fn move_to(&mut self, target: usize, direction: Direction) -> Transition {
        debug!("Moving from step {} to {} ({:?})", self.current, target, direction);
        self.current = target;
        if let Some(callback) = self.on_step_change.as_mut() {
            callback(target, direction);
        }
        Transition::Moved(target)
    }

    fn complete(&mut self) {
        info!("Multi-step form completed");
        self.finished = true;
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&self.data);
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &Step<D> {
        &self.steps[self.current]
    }

    pub fn steps(&self) -> &[Step<D>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_validating(&self) -> bool {
        self.validating
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    pub fn completed_steps(&self) -> &BTreeSet<usize> {
        &self.completed
    }

    pub fn error(&self, index: usize) -> Option<&str> {
        self.errors.get(&index).map(String::as_str)
    }

    pub fn current_error(&self) -> Option<&str> {
        self.error(self.current)
    }

    pub fn can_skip(&self) -> bool {
        !self.finished && self.config.allow_skip && self.steps[self.current].optional
    }

    /// Share of steps completed, in whole percent.
    ///
    pub fn progress_percent(&self) -> u8 {
        let percent = self.completed.len() * 100 / self.steps.len();
        percent.min(100) as u8
    }

    pub fn step_status(&self, index: usize) -> StepStatus {
        if self.errors.contains_key(&index) {
            StepStatus::Error
        } else if self.completed.contains(&index) {
            StepStatus::Complete
        } else if index == self.current {
            StepStatus::Current
        } else {
            StepStatus::Upcoming
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn auto_save_status(&self) -> AutoSaveStatus {
        self.auto_save
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_auto_saving(&self) -> bool {
        self.auto_save_task.is_some() && self.auto_save_status().saving
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.auto_save_status().last_saved
    }
}

fn spawn_auto_save(
    status: Arc<Mutex<AutoSaveStatus>>,
    period: Duration,
    save_delay: Duration,
) -> Result<TaskHandle, WidgetError> {
    TaskHandle::interval_async(period, move || {
        let status = Arc::clone(&status);
        async move {
            status.lock().unwrap_or_else(PoisonError::into_inner).saving = true;
            tokio::time::sleep(save_delay).await;
            let mut guard = status.lock().unwrap_or_else(PoisonError::into_inner);
            guard.saving = false;
            guard.last_saved = Some(Utc::now());
            debug!("Auto-saved form progress");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Clone)]
    struct Form {
        name: String,
    }

    fn manual_config() -> StepConfig {
        StepConfig {
            auto_save: false,
            ..StepConfig::default()
        }
    }

    fn counting_step(id: &str, result: bool, calls: &Arc<AtomicUsize>) -> Step<Form> {
        let calls = Arc::clone(calls);
        Step::new(id, id).validate_with(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(result)
        })
    }

    #[test]
    fn test_new_rejects_empty_steps() {
        let result = StepController::<Form>::new(vec![], Form::default(), manual_config());
        assert!(matches!(result, Err(WidgetError::NoSteps)));
    }

    #[tokio::test]
    async fn test_three_step_form_blocks_on_failing_second_step() {
        let completions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completions);
        let steps = vec![
            Step::new("account", "Account").validate_with(|_: &Form| Ok(true)),
            Step::new("details", "Details").validate_with(|_: &Form| Ok(false)),
            Step::new("review", "Review"),
        ];
        let mut controller = StepController::new(steps, Form::default(), manual_config())
            .unwrap()
            .on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(controller.next_step().await, Transition::Moved(1));
        assert_eq!(controller.next_step().await, Transition::Blocked);
        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.current_error(), Some(INCOMPLETE_STEP_MESSAGE));
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_completes_after_exactly_n_validations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            counting_step("a", true, &calls),
            counting_step("b", true, &calls),
            counting_step("c", true, &calls),
        ];
        let completed_with = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&completed_with);
        let data = Form {
            name: "Ada".to_string(),
        };
        let mut controller = StepController::new(steps, data, manual_config())
            .unwrap()
            .on_complete(move |form: &Form| {
                *sink.lock().unwrap() = Some(form.name.clone());
            });

        assert_eq!(controller.next_step().await, Transition::Moved(1));
        assert_eq!(controller.next_step().await, Transition::Moved(2));
        assert_eq!(controller.next_step().await, Transition::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(completed_with.lock().unwrap().as_deref(), Some("Ada"));
        assert!(controller.is_finished());
        assert_eq!(controller.current_index(), 2);
        assert_eq!(controller.progress_percent(), 100);

        assert_eq!(controller.next_step().await, Transition::Ignored);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_halts_at_first_failing_validator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            counting_step("a", true, &calls),
            counting_step("b", false, &calls),
            counting_step("c", true, &calls),
        ];
        let mut controller = StepController::new(steps, Form::default(), manual_config()).unwrap();

        for _ in 0..5 {
            controller.next_step().await;
        }
        assert_eq!(controller.current_index(), 1);
        assert!(!controller.is_finished());
        assert!(controller.is_completed(0));
        assert!(!controller.is_completed(1));
        assert_eq!(controller.step_status(1), StepStatus::Error);
    }

    #[tokio::test]
    async fn test_prev_step_never_validates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            counting_step("a", true, &calls),
            counting_step("b", true, &calls),
        ];
        let mut controller = StepController::new(steps, Form::default(), manual_config()).unwrap();

        assert_eq!(controller.prev_step(), Transition::Ignored);
        controller.next_step().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(controller.prev_step(), Transition::Moved(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.go_to_step(1, Direction::Backward).await, Transition::Moved(1));
        assert_eq!(controller.go_to_step(0, Direction::Backward).await, Transition::Moved(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_step_change_callback_receives_direction() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let steps = vec![Step::new("a", "A"), Step::new("b", "B")];
        let mut controller = StepController::new(steps, Form::default(), manual_config())
            .unwrap()
            .on_step_change(move |index, direction| sink.lock().unwrap().push((index, direction)));

        controller.next_step().await;
        controller.prev_step();
        assert_eq!(
            *events.lock().unwrap(),
            vec![(1, Direction::Forward), (0, Direction::Backward)]
        );
    }

    #[tokio::test]
    async fn test_validator_error_becomes_generic_message() {
        let steps = vec![
            Step::new("a", "A").validate_async(|_: &Form| async { Err::<bool, _>(anyhow!("boom")) }),
            Step::new("b", "B"),
        ];
        let mut controller = StepController::new(steps, Form::default(), manual_config()).unwrap();

        assert_eq!(controller.next_step().await, Transition::Blocked);
        assert_eq!(controller.error(0), Some(VALIDATION_ERROR_MESSAGE));
        assert!(!controller.is_validating());
    }

    #[tokio::test]
    async fn test_async_validator_reads_form_data() {
        let steps = vec![
            Step::new("a", "A").validate_async(|form: &Form| {
                let ok = !form.name.is_empty();
                async move { Ok::<_, anyhow::Error>(ok) }
            }),
            Step::new("b", "B"),
        ];
        let mut controller = StepController::new(steps, Form::default(), manual_config()).unwrap();

        assert_eq!(controller.next_step().await, Transition::Blocked);
        controller.data_mut().name = "Grace".to_string();
        assert_eq!(controller.next_step().await, Transition::Moved(1));
        assert_eq!(controller.error(0), None);
    }

    #[tokio::test]
    async fn test_allow_skip_moves_past_failed_validation() {
        let steps = vec![
            Step::new("a", "A").validate_with(|_: &Form| Ok(false)),
            Step::new("b", "B"),
        ];
        let config = StepConfig {
            allow_skip: true,
            ..manual_config()
        };
        let mut controller = StepController::new(steps, Form::default(), config).unwrap();

        assert_eq!(controller.next_step().await, Transition::Moved(1));
        assert!(!controller.is_completed(0));
        assert_eq!(controller.error(0), Some(INCOMPLETE_STEP_MESSAGE));
    }

    #[tokio::test]
    async fn test_skip_step_requires_flag_and_optional_step() {
        let steps = vec![
            Step::new("a", "A").optional().validate_with(|_: &Form| Ok(false)),
            Step::new("b", "B"),
            Step::new("c", "C").optional(),
        ];
        let mut locked = StepController::new(
            vec![Step::new("a", "A").optional(), Step::new("b", "B")],
            Form::default(),
            manual_config(),
        )
        .unwrap();
        assert_eq!(locked.skip_step(), Transition::Ignored);

        let config = StepConfig {
            allow_skip: true,
            ..manual_config()
        };
        let mut controller = StepController::new(steps, Form::default(), config).unwrap();
        assert!(controller.can_skip());
        assert_eq!(controller.skip_step(), Transition::Moved(1));
        assert_eq!(controller.error(0), None);

        assert_eq!(controller.skip_step(), Transition::Ignored);
        controller.next_step().await;
        assert_eq!(controller.skip_step(), Transition::Completed);
        assert!(controller.is_finished());
    }

    #[tokio::test]
    async fn test_jump_limited_to_reached_steps() {
        let steps = vec![
            Step::new("a", "A"),
            Step::new("b", "B"),
            Step::new("c", "C"),
            Step::new("d", "D"),
        ];
        let mut controller = StepController::new(steps, Form::default(), manual_config()).unwrap();

        assert!(!controller.can_go_to_step(2));
        assert_eq!(controller.jump_to_step(2).await, Transition::Ignored);

        controller.next_step().await;
        assert!(controller.can_go_to_step(0));
        assert!(controller.can_go_to_step(1));
        assert!(!controller.can_go_to_step(3));
        assert_eq!(controller.jump_to_step(0).await, Transition::Moved(0));
        assert_eq!(controller.step_status(0), StepStatus::Complete);
        assert_eq!(controller.step_status(1), StepStatus::Upcoming);
        assert_eq!(controller.progress_percent(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_save_records_timestamp() {
        let config = StepConfig {
            auto_save: true,
            auto_save_interval: Duration::from_secs(30),
            save_delay: Duration::from_secs(1),
            allow_skip: false,
        };
        let controller = StepController::new(vec![Step::new("a", "A")], Form::default(), config).unwrap();
        assert!(controller.last_saved().is_none());

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert!(controller.is_auto_saving());
        assert!(controller.last_saved().is_none());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!controller.is_auto_saving());
        assert!(controller.last_saved().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_save_stops_when_controller_dropped() {
        let config = StepConfig {
            auto_save_interval: Duration::from_secs(5),
            save_delay: Duration::ZERO,
            ..StepConfig::default()
        };
        let controller = StepController::new(vec![Step::new("a", "A")], Form::default(), config).unwrap();
        let status = Arc::clone(&controller.auto_save);
        drop(controller);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(status.lock().unwrap().last_saved.is_none());
    }
}

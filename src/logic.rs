//! Transition functions and their outcomes.

use std::collections::HashSet;
use std::hash::Hash;

/// The transition function of a loop.
///
/// Applies one event to the model in place and returns the effects the
/// transition requests. It runs on the event context, so it must be fast and
/// must not block.
///
/// Functions and closures with the signature `Fn(&mut Model, Event) -> Vec<Effect>`
/// implement this trait via the blanket implementation.
pub trait Update<Model, Event, Effect>: Send + Sync {
    fn update(&self, model: &mut Model, event: Event) -> Vec<Effect>;
}

impl<Model, Event, Effect, F> Update<Model, Event, Effect> for F
where
    F: Fn(&mut Model, Event) -> Vec<Effect> + Send + Sync,
{
    fn update(&self, model: &mut Model, event: Event) -> Vec<Effect> {
        self(model, event)
    }
}

/// The initiation function of a loop, run once when the loop starts.
///
/// Functions and closures with the signature `Fn(&mut Model) -> Vec<Effect>`
/// implement this trait via the blanket implementation.
pub trait Initiate<Model, Effect>: Send + Sync {
    fn initiate(&self, model: &mut Model) -> Vec<Effect>;
}

impl<Model, Effect, F> Initiate<Model, Effect> for F
where
    F: Fn(&mut Model) -> Vec<Effect> + Send + Sync,
{
    fn initiate(&self, model: &mut Model) -> Vec<Effect> {
        self(model)
    }
}

/// Initiator used when none is configured: keeps the model, requests nothing.
pub(crate) fn identity_initiator<Model, Effect>(_model: &mut Model) -> Vec<Effect> {
    Vec::new()
}

/// Drop structurally equal effects, keeping the first occurrence of each.
pub(crate) fn unique<Effect: Eq + Hash>(effects: Vec<Effect>) -> Vec<Effect> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(effects.len());
        effects.iter().map(|effect| seen.insert(effect)).collect()
    };
    effects
        .into_iter()
        .zip(keep)
        .filter_map(|(effect, keep)| keep.then_some(effect))
        .collect()
}

/// Outcome of initiation: the first model and the effects to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct First<Model, Effect> {
    model: Model,
    effects: Vec<Effect>,
}

impl<Model, Effect: Eq + Hash> First<Model, Effect> {
    /// Duplicate effects are collapsed into one.
    pub fn new(model: Model, effects: Vec<Effect>) -> Self {
        Self {
            model,
            effects: unique(effects),
        }
    }
}

impl<Model, Effect> First<Model, Effect> {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    pub fn into_parts(self) -> (Model, Vec<Effect>) {
        (self.model, self.effects)
    }
}

/// Outcome of one update: an optional new model and the effects to dispatch.
///
/// An absent model means the previous model is retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Next<Model, Effect> {
    model: Option<Model>,
    effects: Vec<Effect>,
}

impl<Model, Effect: Eq + Hash> Next<Model, Effect> {
    /// A new model and effects. Duplicate effects are collapsed into one.
    pub fn next(model: Model, effects: Vec<Effect>) -> Self {
        Self {
            model: Some(model),
            effects: unique(effects),
        }
    }

    /// Effects without a model change.
    pub fn dispatch(effects: Vec<Effect>) -> Self {
        Self {
            model: None,
            effects: unique(effects),
        }
    }
}

impl<Model, Effect> Next<Model, Effect> {
    pub fn no_change() -> Self {
        Self {
            model: None,
            effects: Vec::new(),
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// The new model, or `previous` when this step did not change it.
    pub fn model_or(self, previous: Model) -> Model {
        self.model.unwrap_or(previous)
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    pub fn into_parts(self) -> (Option<Model>, Vec<Effect>) {
        (self.model, self.effects)
    }
}

impl<Model, Effect> From<First<Model, Effect>> for Next<Model, Effect> {
    fn from(first: First<Model, Effect>) -> Self {
        Self {
            model: Some(first.model),
            effects: first.effects,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// Given/when/then harness for exercising an [`Update`] function in isolation.
///
/// Only available with the `testing` feature.
///
/// # Example
///
/// ```rust
/// use mobius_loop::UpdateSpec;
///
/// fn update(model: &mut u32, event: u32) -> Vec<String> {
///     *model += event;
///     vec![format!("saw {event}")]
/// }
///
/// UpdateSpec::new(update)
///     .given(1)
///     .when(2)
///     .and(3)
///     .then(|result| {
///         assert_eq!(result.model, 6);
///         assert_eq!(result.last_next.effects(), ["saw 3".to_string()]);
///     });
/// ```
pub struct UpdateSpec<U> {
    update: U,
}

#[cfg(any(test, feature = "testing"))]
impl<U> UpdateSpec<U> {
    pub fn new(update: U) -> Self {
        Self { update }
    }

    pub fn given<Model>(self, model: Model) -> UpdateGiven<U, Model> {
        UpdateGiven {
            update: self.update,
            model,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// A model waiting for events. See [`UpdateSpec`].
pub struct UpdateGiven<U, Model> {
    update: U,
    model: Model,
}

#[cfg(any(test, feature = "testing"))]
impl<U, Model> UpdateGiven<U, Model> {
    pub fn when<Event>(self, event: Event) -> UpdateWhen<U, Model, Event> {
        UpdateWhen {
            update: self.update,
            model: self.model,
            events: vec![event],
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// A model and the events to apply to it. See [`UpdateSpec`].
pub struct UpdateWhen<U, Model, Event> {
    update: U,
    model: Model,
    events: Vec<Event>,
}

#[cfg(any(test, feature = "testing"))]
/// Result of an [`UpdateSpec`]: the final model and the outcome of the last event.
pub struct UpdateResult<Model, Effect> {
    pub model: Model,
    pub last_next: Next<Model, Effect>,
}

#[cfg(any(test, feature = "testing"))]
impl<U, Model, Event> UpdateWhen<U, Model, Event> {
    /// Apply another event after the previous ones.
    pub fn and(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Apply every event in order and hand the outcome to `assertion`.
    pub fn then<Effect, A>(self, assertion: A)
    where
        U: Update<Model, Event, Effect>,
        Model: Clone,
        Effect: Eq + Hash,
        A: FnOnce(UpdateResult<Model, Effect>),
    {
        let mut model = self.model;
        let mut last_effects = Vec::new();
        for event in self.events {
            last_effects = self.update.update(&mut model, event);
        }

        assertion(UpdateResult {
            last_next: Next::next(model.clone(), last_effects),
            model,
        });
    }
}

#[cfg(any(test, feature = "testing"))]
/// Given/when/then harness for exercising an [`Initiate`] function in isolation.
///
/// Only available with the `testing` feature.
///
/// # Example
///
/// ```rust
/// use mobius_loop::InitSpec;
///
/// fn initiate(model: &mut String) -> Vec<&'static str> {
///     *model = format!("{model} ready");
///     vec!["load", "load"]
/// }
///
/// InitSpec::new(initiate)
///     .when("app".to_string())
///     .then(|first| {
///         assert_eq!(first.model(), "app ready");
///         assert_eq!(first.effects(), ["load"]);
///     });
/// ```
pub struct InitSpec<I> {
    initiate: I,
}

#[cfg(any(test, feature = "testing"))]
impl<I> InitSpec<I> {
    pub fn new(initiate: I) -> Self {
        Self { initiate }
    }

    pub fn when<Model>(self, model: Model) -> InitWhen<I, Model> {
        InitWhen {
            initiate: self.initiate,
            model,
        }
    }
}

#[cfg(any(test, feature = "testing"))]
/// A model waiting to be initiated. See [`InitSpec`].
pub struct InitWhen<I, Model> {
    initiate: I,
    model: Model,
}

#[cfg(any(test, feature = "testing"))]
impl<I, Model> InitWhen<I, Model> {
    pub fn then<Effect, A>(self, assertion: A)
    where
        I: Initiate<Model, Effect>,
        Effect: Eq + Hash,
        A: FnOnce(First<Model, Effect>),
    {
        let mut model = self.model;
        let effects = self.initiate.initiate(&mut model);
        assertion(First::new(model, effects));
    }
}

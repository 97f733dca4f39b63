//! Filter type guessing from model metadata.

use dashmap::DashMap;

use crate::filter::{FilterOptions, FilterType};
use crate::model::{FieldKind, ModelMetadata};

/// How sure a guesser is; the chain keeps the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeGuess {
    pub filter_type: FilterType,
    pub options: FilterOptions,
    pub confidence: Confidence,
}

impl TypeGuess {
    pub fn new(filter_type: FilterType, confidence: Confidence) -> Self {
        Self {
            filter_type,
            options: FilterOptions::default(),
            confidence,
        }
    }
}

pub trait TypeGuesser: Send + Sync {
    fn guess(&self, metadata: &ModelMetadata, field: &str) -> Option<TypeGuess>;
}

/// Guesses from the declared field kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTypeGuesser;

impl TypeGuesser for FieldTypeGuesser {
    fn guess(&self, metadata: &ModelMetadata, field: &str) -> Option<TypeGuess> {
        if field == metadata.identifier && metadata.get_field(field).is_none() {
            return Some(TypeGuess::new(FilterType::Number, Confidence::Medium));
        }
        let kind = metadata.get_field(field)?.kind;
        let guess = match kind {
            FieldKind::String | FieldKind::Text => TypeGuess::new(FilterType::String, Confidence::High),
            FieldKind::Integer | FieldKind::Float => TypeGuess::new(FilterType::Number, Confidence::High),
            FieldKind::Boolean => TypeGuess::new(FilterType::Boolean, Confidence::High),
            FieldKind::Date => TypeGuess::new(FilterType::Date, Confidence::High),
            FieldKind::DateTime => TypeGuess::new(FilterType::Date, Confidence::Medium),
            FieldKind::Json => return None,
        };
        Some(guess)
    }
}

/// Asks every guesser and keeps the most confident answer.
///
/// Answers are cached per `(class, field)` for the lifetime of the chain.
pub struct TypeGuesserChain {
    guessers: Vec<Box<dyn TypeGuesser>>,
    cache: DashMap<(String, String), Option<TypeGuess>>,
}

impl std::fmt::Debug for TypeGuesserChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeGuesserChain")
            .field("guessers", &self.guessers.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Default for TypeGuesserChain {
    fn default() -> Self {
        Self::new(vec![Box::new(FieldTypeGuesser)])
    }
}

impl TypeGuesserChain {
    pub fn new(guessers: Vec<Box<dyn TypeGuesser>>) -> Self {
        Self {
            guessers,
            cache: DashMap::new(),
        }
    }

    /// Builder: add a guesser to the chain.
    pub fn with_guesser(mut self, guesser: impl TypeGuesser + 'static) -> Self {
        self.guessers.push(Box::new(guesser));
        self.cache.clear();
        self
    }

    pub fn guess(&self, metadata: &ModelMetadata, field: &str) -> Option<TypeGuess> {
        let key = (metadata.class.clone(), field.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        // first guess wins ties
        let mut best: Option<TypeGuess> = None;
        for guess in self.guessers.iter().filter_map(|g| g.guess(metadata, field)) {
            if best.as_ref().is_none_or(|b| guess.confidence > b.confidence) {
                best = Some(guess);
            }
        }
        tracing::debug!(
            "Guessed {:?} for {}::{}",
            best.as_ref().map(|g| g.filter_type),
            metadata.class,
            field
        );
        self.cache.insert(key, best.clone());
        best
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

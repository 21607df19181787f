use inflector::Inflector as _;

/// Singularization and pluralization of relation and entity names.
///
/// The registry and the transformer share one inflector so that a relation
/// key always round-trips to the name the model descriptor expects. Hosts
/// with irregular or non-English entity names can plug their own rules in
/// via [`ModelRegistry::with_inflector`](crate::ModelRegistry::with_inflector).
pub trait Inflect: Send + Sync {
    fn singularize(&self, word: &str) -> String;
    fn pluralize(&self, word: &str) -> String;
}

/// English inflection rules, the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInflection;

impl Inflect for EnglishInflection {
    fn singularize(&self, word: &str) -> String {
        word.to_singular()
    }

    fn pluralize(&self, word: &str) -> String {
        word.to_plural()
    }
}

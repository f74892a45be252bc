use std::error::Error as StdError;
use std::fmt::Debug;
use std::sync::Arc;

use crate::individual::Population;

/// The opaque evolutionary transformer a user plugs into an [`crate::island::Island`]. An
/// `Algorithm` is a value-like handle: cloning it must be cheap, and `evolve` must be pure with
/// respect to any archipelago-visible state — it receives a [`Population`] by value and returns
/// a new one, and must not retain references to the input after returning.
///
/// Implementations register as type-erased, serializable plug-ins with `#[typetag::serde]`.
#[typetag::serde(tag = "algorithm")]
pub trait Algorithm: Send + Sync + Debug {
    /// Advance `population` by one generation (or by however many internal iterations this
    /// algorithm considers "one evolve call"), returning the resulting population.
    ///
    /// Implementations must not assume anything about the population's prior history beyond its
    /// basic invariants (aligned ids/xs/fs, all individuals bound to the same problem).
    fn evolve(&self, population: Population) -> Result<Population, Box<dyn StdError + Send + Sync>>;

    /// A human-readable algorithm name, used in [`crate::island::Island::get_name`] composition.
    fn name(&self) -> String {
        "Unnamed algorithm".to_string()
    }
}

/// A cheap-to-clone handle to a type-erased [`Algorithm`].
pub type AlgorithmHandle = Arc<dyn Algorithm>;

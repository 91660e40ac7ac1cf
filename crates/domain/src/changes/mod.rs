//! Change records and their application to documents

mod apply;
mod cast;
mod change;
mod formula;
mod path;

pub use apply::{
    combine, ChangeApplicator, ChangeHandler, GenericChangeHandler, CURRENT_VALUE_PLACEHOLDER,
};
pub use cast::{cast, is_truthy, number_value, parse_or_string};
pub use change::{ChangeMode, ChangeSet, EffectChange};
pub use formula::{
    compose_formula, inject_argument, is_well_formed, outermost_function, split_top_level,
    top_level_terms, FormulaComposition, FormulaTerm,
};
pub use path::{get_at_path, set_at_path};

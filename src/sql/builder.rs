//! Expression builder: the coercion and array-handling engine.
//!
//! Every operation here takes one or more [`SqlExpr`] values and returns a
//! new [`SqlExpr`] whose error condition subsumes the inputs' conditions.
//! Nothing in this module panics or returns a host-level error: a value
//! that cannot be coerced becomes an error-carrying expression, resolved
//! either at compile time (unconditional) or at evaluation time (guarded).

mod array;
mod branch;
mod cast;
mod ops;

pub use branch::BranchSet;
pub use cast::TextMode;

use crate::sql::{translator::CompilerConfig, validation::TypeValidation};

/// Borrowed view over the compiler configuration and the dialect
/// validation strategy, handed to every coercion and function builder.
pub struct SqlBuilder<'a> {
    pub(crate) config: &'a CompilerConfig,
    pub(crate) validation: &'a dyn TypeValidation,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(config: &'a CompilerConfig, validation: &'a dyn TypeValidation) -> SqlBuilder<'a> {
        SqlBuilder { config, validation }
    }

    /// IANA name of the configured target time zone, embedded into
    /// `AT TIME ZONE` and `to_char` fragments.
    pub fn zone_name(&self) -> &'a str {
        self.config.time_zone.name()
    }
}

use thiserror::Error;

/// Construction-time validation failures raised by component configuration.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A bounded output field declares a minimum above its maximum.
    #[error("bounds for `{field}` are inverted: min {min} > max {max}")]
    InvertedBounds {
        /// Name of the offending field.
        field: &'static str,
        /// Configured lower edge.
        min: f64,
        /// Configured upper edge.
        max: f64,
    },
    /// A bounded output field declares a NaN or infinite edge.
    #[error("bounds for `{field}` must be finite")]
    NonFiniteBounds {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The neutral value of a field lies outside its configured bounds.
    #[error("neutral value {neutral} of `{field}` lies outside [{min}, {max}]")]
    NeutralOutsideBounds {
        /// Name of the offending field.
        field: &'static str,
        /// Neutral value that must remain reachable.
        neutral: f64,
        /// Configured lower edge.
        min: f64,
        /// Configured upper edge.
        max: f64,
    },
    /// A factor that must be a fraction lies outside `[0, 1]`.
    #[error("`{name}` must lie within [0, 1], got {value}")]
    FractionOutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// A parameter that must be strictly positive is zero, negative or non-finite.
    #[error("`{name}` must be positive and finite, got {value}")]
    NonPositive {
        /// Name of the offending parameter.
        name: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// A probability clamp is empty or escapes the open unit interval.
    #[error("probability clamp [{min}, {max}] must satisfy 0 < min < max < 1")]
    InvalidProbabilityClamp {
        /// Configured lower clamp.
        min: f64,
        /// Configured upper clamp.
        max: f64,
    },
    /// A count-like parameter is outside its supported range.
    #[error("`{name}` must lie within {min}..={max}, got {value}")]
    CountOutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// Supplied value.
        value: usize,
        /// Smallest supported value.
        min: usize,
        /// Largest supported value.
        max: usize,
    },
}

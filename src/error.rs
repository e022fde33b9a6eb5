//! Error types.
//!
//! Errors fall in two groups. A [`ConfigurationError`] means that the chain
//! or the link parameters cannot describe a valid link. A [`NumericalError`]
//! means that a valid configuration led to a computation that cannot be
//! carried out reliably. Neither is recovered from inside the crate.

use crate::component::ComponentKind;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// The component kind is not recognized.
    #[error("unknown component kind {0:?}")]
    UnknownComponent(String),
    /// The impairment model is not recognized.
    #[error("unknown impairment model {0:?} (expected \"active\" or \"passive\")")]
    UnknownModel(String),
    /// A parameter required by the component kind is missing.
    #[error("{kind} requires parameter {parameter}")]
    MissingParameter {
        /// Component kind.
        kind: ComponentKind,
        /// Parameter name.
        parameter: &'static str,
    },
    /// A parameter was given to a component kind that does not use it.
    #[error("{kind} does not accept parameter {parameter}")]
    UnexpectedParameter {
        /// Component kind.
        kind: ComponentKind,
        /// Parameter name.
        parameter: &'static str,
    },
    /// A parameter has a value outside its valid range.
    #[error("invalid value {value} for {parameter}")]
    InvalidValue {
        /// Parameter name.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The number of dimensions cannot be handled by the impairment model.
    #[error("unsupported number of dimensions {0} (must be even and at least 2)")]
    IncompatibleDimension(usize),
    /// A component of a dual-polarization link lacks its rotation angles.
    #[error("stage {stage} has no rotation and phase angles")]
    MissingAngles {
        /// Index of the component in the chain.
        stage: usize,
    },
    /// Rotation angles were given for a link that is not dual-polarization.
    #[error("stage {stage} has rotation angles, which only apply to 2 dimensions")]
    UnexpectedAngles {
        /// Index of the component in the chain.
        stage: usize,
    },
    /// The modulation order is not supported by the BER formula.
    #[error("unsupported modulation order {0} (must be a power of two, at least 4)")]
    UnsupportedModulation(u32),
    /// A matrix does not have the expected size.
    #[error("matrix of size {found}x{found} found where {expected}x{expected} was expected")]
    DimensionMismatch {
        /// Expected number of dimensions.
        expected: usize,
        /// Number of dimensions found.
        found: usize,
    },
    /// The noise trace and the tail products have different lengths.
    #[error("{found} noise sources given for {expected} tail products")]
    StageCountMismatch {
        /// Number of tail products.
        expected: usize,
        /// Number of noise sources.
        found: usize,
    },
    /// No impairment matrices were given to build the channel.
    #[error("the channel needs at least one impairment matrix")]
    EmptyChannel,
    /// The textual description of a chain is malformed.
    #[error("invalid chain description: {0}")]
    Parse(String),
}

/// Numerical error.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum NumericalError {
    /// A matrix that needs to be inverted is singular or ill-conditioned.
    #[error("matrix is singular or ill-conditioned")]
    SingularMatrix,
    /// A matrix that needs to be inverted is not square.
    #[error("matrix is not square")]
    NonSquareMatrix,
    /// The SNR estimate of a dimension is not a positive finite number.
    #[error("SNR estimate for dimension {dimension} is degenerate")]
    DegenerateDimension {
        /// Dimension index.
        dimension: usize,
    },
    /// The BER cannot be produced by the BER curve of the modulation.
    #[error("BER {ber} is out of the range of the BER curve")]
    BerOutOfRange {
        /// Offending BER.
        ber: f64,
    },
    /// The BER to SNR inversion did not converge.
    #[error("BER to SNR inversion did not converge after {iterations} iterations")]
    BerInversionDidNotConverge {
        /// Number of iterations performed.
        iterations: usize,
    },
}

impl From<crate::linalg::Error> for NumericalError {
    fn from(e: crate::linalg::Error) -> NumericalError {
        match e {
            crate::linalg::Error::Singular => NumericalError::SingularMatrix,
            crate::linalg::Error::NotSquare => NumericalError::NonSquareMatrix,
        }
    }
}

/// Penalty calculation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration error.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Numerical error.
    #[error(transparent)]
    Numerical(#[from] NumericalError),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

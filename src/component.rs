//! Optical components and chains.
//!
//! A [`Chain`] is the ordered list of components traversed by the signal
//! between the transmitter and the receiver. Components are described by a
//! [`ComponentSpec`], in which every parameter is optional, and validated into
//! a [`Component`], in which the parameters required by the component kind
//! are present and defaults have been resolved.
//!
//! Chains can also be parsed from a compact textual description. Components
//! are separated by `;` and each component is written as
//! `kind[:key=value,...]`:
//!
//! ```
//! # use mmse_penalty::component::Chain;
//! let chain: Chain = "wss:loss=8,pdl=0.55; oa:gain=15,nf=4.5,pdl=0.1; fiber:loss=16,pdl=0"
//!     .parse()?;
//! assert_eq!(chain.len(), 3);
//! # Ok::<(), mmse_penalty::error::ConfigurationError>(())
//! ```

use crate::{error::ConfigurationError, impairment::Angles};
use enum_iterator::Sequence;
use rand::Rng;

/// Component kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Sequence)]
pub enum ComponentKind {
    /// Wavelength-selective switch.
    Wss,
    /// Optical amplifier.
    OpticalAmplifier,
    /// Fiber span.
    Fiber,
    /// Fused coupler (fiber interface unit).
    FusedCoupler,
    /// Variable optical attenuator.
    VariableAttenuator,
}

impl ComponentKind {
    /// Returns `true` for the kinds that have gain and add ASE noise.
    pub fn is_amplifier(&self) -> bool {
        matches!(self, ComponentKind::OpticalAmplifier)
    }

    /// Returns the impairment (dB) used when a component does not give one.
    pub fn default_impairment_db(&self) -> f64 {
        match self {
            ComponentKind::Wss => 0.5,
            ComponentKind::OpticalAmplifier => 0.3,
            ComponentKind::Fiber => 0.0,
            ComponentKind::FusedCoupler => 0.1,
            ComponentKind::VariableAttenuator => 0.1,
        }
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<ComponentKind, ConfigurationError> {
        Ok(match s.trim().to_lowercase().as_str() {
            "wss" => ComponentKind::Wss,
            "oa" | "edfa" | "amplifier" => ComponentKind::OpticalAmplifier,
            "fiber" => ComponentKind::Fiber,
            "fiu" | "fused" | "coupler" => ComponentKind::FusedCoupler,
            "voa" | "attenuator" => ComponentKind::VariableAttenuator,
            _ => return Err(ConfigurationError::UnknownComponent(s.to_string())),
        })
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                ComponentKind::Wss => "WSS",
                ComponentKind::OpticalAmplifier => "OA",
                ComponentKind::Fiber => "fiber",
                ComponentKind::FusedCoupler => "FIU",
                ComponentKind::VariableAttenuator => "VOA",
            }
        )
    }
}

/// Unvalidated component description.
///
/// This is the form in which components are handed over by whatever builds
/// the chain (a topology loader, a parser, a test).
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    /// Component kind.
    pub kind: ComponentKind,
    /// Insertion loss (dB). Passive components only.
    pub loss_db: Option<f64>,
    /// Gain (dB). Amplifiers only.
    pub gain_db: Option<f64>,
    /// Noise figure (dB). Amplifiers only.
    pub noise_figure_db: Option<f64>,
    /// PDL or peak-to-peak MDL (dB).
    pub impairment_db: Option<f64>,
    /// Reference frame angles. Dual-polarization links only.
    pub angles: Option<Angles>,
}

impl ComponentSpec {
    /// Creates a description of the given kind with no parameters.
    pub fn new(kind: ComponentKind) -> ComponentSpec {
        ComponentSpec {
            kind,
            loss_db: None,
            gain_db: None,
            noise_figure_db: None,
            impairment_db: None,
            angles: None,
        }
    }

    /// Validates the description.
    ///
    /// Passive components require a loss, and amplifiers require a gain and
    /// a noise figure. A missing impairment is replaced by the default of the
    /// component kind.
    pub fn resolve(&self) -> Result<Component, ConfigurationError> {
        let kind = self.kind;
        let require = |value: Option<f64>, parameter| match value {
            Some(x) => finite(parameter, x),
            None => Err(ConfigurationError::MissingParameter { kind, parameter }),
        };
        let reject = |value: Option<f64>, parameter| match value {
            Some(_) => Err(ConfigurationError::UnexpectedParameter { kind, parameter }),
            None => Ok(()),
        };
        let stage = if kind.is_amplifier() {
            reject(self.loss_db, "loss")?;
            Stage::Amplifier {
                gain_db: require(self.gain_db, "gain")?,
                noise_figure_db: require(self.noise_figure_db, "noise figure")?,
            }
        } else {
            reject(self.gain_db, "gain")?;
            reject(self.noise_figure_db, "noise figure")?;
            Stage::Loss {
                loss_db: require(self.loss_db, "loss")?,
            }
        };
        let impairment_db = self
            .impairment_db
            .unwrap_or_else(|| kind.default_impairment_db());
        if !(impairment_db.is_finite() && impairment_db >= 0.0) {
            return Err(ConfigurationError::InvalidValue {
                parameter: "impairment",
                value: impairment_db,
            });
        }
        if let Some(angles) = &self.angles {
            finite("rotation angle", angles.rotation)?;
            finite("phase angle", angles.phase)?;
        }
        Ok(Component {
            kind,
            stage,
            impairment_db,
            angles: self.angles,
        })
    }
}

fn finite(parameter: &'static str, value: f64) -> Result<f64, ConfigurationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigurationError::InvalidValue { parameter, value })
    }
}

impl std::str::FromStr for ComponentSpec {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<ComponentSpec, ConfigurationError> {
        let (kind, params) = match s.split_once(':') {
            Some((kind, params)) => (kind, params),
            None => (s, ""),
        };
        let mut spec = ComponentSpec::new(kind.parse()?);
        let mut rotation = None;
        let mut phase = None;
        for param in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = param.split_once('=') else {
                return Err(ConfigurationError::Parse(format!(
                    "expected key=value, found {param:?}"
                )));
            };
            let value: f64 = value.trim().parse().map_err(|_| {
                ConfigurationError::Parse(format!("invalid number in {param:?}"))
            })?;
            let slot = match key.trim().to_lowercase().as_str() {
                "loss" => &mut spec.loss_db,
                "gain" => &mut spec.gain_db,
                "nf" => &mut spec.noise_figure_db,
                "pdl" | "mdl" | "impairment" => &mut spec.impairment_db,
                "alpha" | "rotation" => &mut rotation,
                "beta" | "phase" => &mut phase,
                _ => {
                    return Err(ConfigurationError::Parse(format!(
                        "unknown parameter {key:?}"
                    )))
                }
            };
            if slot.replace(value).is_some() {
                return Err(ConfigurationError::Parse(format!(
                    "parameter {key:?} given twice"
                )));
            }
        }
        spec.angles = match (rotation, phase) {
            (Some(rotation), Some(phase)) => Some(Angles { rotation, phase }),
            (None, None) => None,
            _ => {
                return Err(ConfigurationError::Parse(
                    "rotation and phase angles must be given together".to_string(),
                ))
            }
        };
        Ok(spec)
    }
}

/// Gain or loss of a component.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Stage {
    /// Passive component.
    Loss {
        /// Insertion loss (dB).
        loss_db: f64,
    },
    /// Optical amplifier.
    Amplifier {
        /// Gain (dB).
        gain_db: f64,
        /// Noise figure (dB).
        noise_figure_db: f64,
    },
}

/// Validated component.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    kind: ComponentKind,
    stage: Stage,
    impairment_db: f64,
    angles: Option<Angles>,
}

impl Component {
    /// Creates a wavelength-selective switch.
    pub fn wss(loss_db: f64, impairment_db: f64) -> Component {
        Component::passive(ComponentKind::Wss, loss_db, impairment_db)
    }

    /// Creates an optical amplifier.
    pub fn amplifier(gain_db: f64, noise_figure_db: f64, impairment_db: f64) -> Component {
        Component {
            kind: ComponentKind::OpticalAmplifier,
            stage: Stage::Amplifier {
                gain_db,
                noise_figure_db,
            },
            impairment_db,
            angles: None,
        }
    }

    /// Creates a fiber span.
    pub fn fiber(loss_db: f64, impairment_db: f64) -> Component {
        Component::passive(ComponentKind::Fiber, loss_db, impairment_db)
    }

    /// Creates a fused coupler.
    pub fn fused_coupler(loss_db: f64, impairment_db: f64) -> Component {
        Component::passive(ComponentKind::FusedCoupler, loss_db, impairment_db)
    }

    /// Creates a variable optical attenuator.
    pub fn attenuator(loss_db: f64, impairment_db: f64) -> Component {
        Component::passive(ComponentKind::VariableAttenuator, loss_db, impairment_db)
    }

    fn passive(kind: ComponentKind, loss_db: f64, impairment_db: f64) -> Component {
        Component {
            kind,
            stage: Stage::Loss { loss_db },
            impairment_db,
            angles: None,
        }
    }

    /// Sets the reference frame angles of the component.
    pub fn with_angles(mut self, angles: Angles) -> Component {
        self.angles = Some(angles);
        self
    }

    /// Sets the impairment of the component.
    pub fn with_impairment(mut self, impairment_db: f64) -> Component {
        self.impairment_db = impairment_db;
        self
    }

    /// Returns the component kind.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Returns the gain or loss of the component.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Returns the PDL or peak-to-peak MDL of the component (dB).
    pub fn impairment_db(&self) -> f64 {
        self.impairment_db
    }

    /// Returns the reference frame angles, if any.
    pub fn angles(&self) -> Option<&Angles> {
        self.angles.as_ref()
    }
}

impl TryFrom<&ComponentSpec> for Component {
    type Error = ConfigurationError;

    fn try_from(spec: &ComponentSpec) -> Result<Component, ConfigurationError> {
        spec.resolve()
    }
}

/// Chain of components.
///
/// The chain is immutable once built. Besides its components, it implicitly
/// contains a transmitter noise source (stage 0) and a receiver noise source
/// (stage `len() + 1`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chain {
    components: Vec<Component>,
}

impl Chain {
    /// Creates a chain from its components, in propagation order.
    pub fn new(components: Vec<Component>) -> Chain {
        Chain { components }
    }

    /// Creates a chain by validating component descriptions.
    pub fn from_specs<'a, I>(specs: I) -> Result<Chain, ConfigurationError>
    where
        I: IntoIterator<Item = &'a ComponentSpec>,
    {
        Ok(Chain {
            components: specs
                .into_iter()
                .map(ComponentSpec::resolve)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Returns the components of the chain.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the chain has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns the number of noise stages, including the transmitter and
    /// the receiver.
    pub fn num_stages(&self) -> usize {
        self.components.len() + 2
    }

    /// Returns a copy of the chain in which every component without angles
    /// gets random angles.
    ///
    /// See [`Angles::random`] for the distribution of the angles.
    pub fn with_random_angles<R: Rng + ?Sized>(&self, rng: &mut R) -> Chain {
        Chain {
            components: self
                .components
                .iter()
                .map(|c| match c.angles {
                    Some(_) => c.clone(),
                    None => c.clone().with_angles(Angles::random(rng)),
                })
                .collect(),
        }
    }

    /// Returns a copy of the chain with all the impairments set to zero.
    pub fn without_impairment(&self) -> Chain {
        Chain {
            components: self
                .components
                .iter()
                .map(|c| c.clone().with_impairment(0.0))
                .collect(),
        }
    }
}

impl FromIterator<Component> for Chain {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Chain {
        Chain::new(iter.into_iter().collect())
    }
}

impl std::str::FromStr for Chain {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Chain, ConfigurationError> {
        let specs = s
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::parse::<ComponentSpec>)
            .collect::<Result<Vec<_>, _>>()?;
        Chain::from_specs(&specs)
    }
}

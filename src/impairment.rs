//! Impairment matrix generation.
//!
//! Each component of a chain has a polarization-dependent loss (PDL) or
//! mode-dependent loss (MDL), which is modelled as a D x D complex transfer
//! matrix. The matrix is formed by a real diagonal core, which holds the
//! differential attenuation, conjugated by matrices that set the orientation
//! of the core with respect to the other components.
//!
//! For dual-polarization links (D = 2) the orientation is given explicitly by
//! a rotation angle and a phase retardance (see [`Angles`]). For links with
//! more modes the orientation is drawn at random as a pair of Haar-distributed
//! unitary matrices.
//!
//! # References
//!
//! - *PDL in Optical Links: A Model Analysis and a Demonstration of a
//!   PDL-Resilient Modulation.*
//! - *Impact of Polarization- and Mode-Dependent Gain on the Capacity of
//!   Ultra-Long-Haul Systems.*
//! - *F. Mezzadri, How to generate random matrices from the classical compact
//!   groups, arXiv:math-ph/0609050.*

use crate::{
    error::ConfigurationError,
    linalg::{self, CMatrix},
    units::{db2lin, db2natural},
};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Impairment model.
///
/// This selects how a loss value in dB is turned into the diagonal core of
/// the impairment matrix.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum ImpairmentModel {
    /// Active model.
    ///
    /// The attenuation is split symmetrically around unit gain. For D = 2 the
    /// core is `diag(1 + g, 1 - g)` with `g = (1 - L) / (1 + L)`, where `L`
    /// is the impairment in linear units.
    #[default]
    Active,
    /// Passive model.
    ///
    /// The component only attenuates. For D = 2 the core is
    /// `diag(1, 1 / sqrt(L))`.
    Passive,
}

impl std::str::FromStr for ImpairmentModel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<ImpairmentModel, ConfigurationError> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ImpairmentModel::Active),
            "passive" => Ok(ImpairmentModel::Passive),
            _ => Err(ConfigurationError::UnknownModel(s.to_string())),
        }
    }
}

impl std::fmt::Display for ImpairmentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                ImpairmentModel::Active => "active",
                ImpairmentModel::Passive => "passive",
            }
        )
    }
}

/// Orientation of a polarization impairment.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Angles {
    /// Rotation angle of the reference frame (rad).
    pub rotation: f64,
    /// Phase retardance between the two polarizations (rad).
    pub phase: f64,
}

impl Angles {
    /// Creates new angles.
    pub fn new(rotation: f64, phase: f64) -> Angles {
        Angles { rotation, phase }
    }

    /// Draws random angles.
    ///
    /// The rotation angle is distributed in `[0, pi/2]` with density
    /// `sin(2 * alpha)`, which corresponds to a uniformly distributed
    /// orientation on the Poincaré sphere. The phase is uniform in
    /// `[0, 2 * pi)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Angles {
        let u: f64 = rng.gen();
        let v: f64 = rng.gen();
        Angles {
            rotation: 0.5 * (1.0 - 2.0 * u).acos(),
            phase: 2.0 * PI * v,
        }
    }
}

/// Reference frame of an impairment matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Frame {
    /// Rotation of a dual-polarization reference frame with the given
    /// angles.
    Rotation(Angles),
    /// Random unitary conjugation, drawn independently on each side of the
    /// core.
    Random,
}

/// Generates an impairment matrix.
///
/// The matrix has size `dim` x `dim`. `impairment_db` is the impairment in
/// dB. With [`Frame::Rotation`] it is the PDL of the component and `dim`
/// must be 2. With [`Frame::Random`] it is the peak-to-peak MDL and `dim`
/// must be even.
///
/// Randomness is drawn from `rng` on every call, so that each call gives a
/// new realization of the component.
///
/// # Examples
/// ```
/// # use mmse_penalty::impairment::*;
/// # use mmse_penalty::rand::{Rng, SeedableRng};
/// let mut rng = Rng::seed_from_u64(0);
/// let angles = Angles::new(0.3, 1.2);
/// let h = generate(2, 0.5, ImpairmentModel::Active, &Frame::Rotation(angles), &mut rng)?;
/// assert_eq!(h.dim(), (2, 2));
/// # Ok::<(), mmse_penalty::error::ConfigurationError>(())
/// ```
pub fn generate<R: Rng + ?Sized>(
    dim: usize,
    impairment_db: f64,
    model: ImpairmentModel,
    frame: &Frame,
    rng: &mut R,
) -> Result<CMatrix, ConfigurationError> {
    if !(impairment_db.is_finite() && impairment_db >= 0.0) {
        return Err(ConfigurationError::InvalidValue {
            parameter: "impairment",
            value: impairment_db,
        });
    }
    match frame {
        Frame::Rotation(angles) => {
            if dim != 2 {
                return Err(ConfigurationError::IncompatibleDimension(dim));
            }
            let core = linalg::diag(&polarization_core(impairment_db, model));
            let inverse = rotation(&Angles::new(-angles.rotation, -angles.phase));
            Ok(inverse.dot(&core).dot(&rotation(angles)))
        }
        Frame::Random => {
            if dim < 2 || dim % 2 != 0 {
                return Err(ConfigurationError::IncompatibleDimension(dim));
            }
            let core: Vec<f64> = mode_log_amplitudes(dim, impairment_db, model, rng)
                .into_iter()
                .map(|x| (0.5 * x).exp())
                .collect();
            let left = haar_unitary(dim, rng);
            let right = haar_unitary(dim, rng);
            Ok(left.dot(&linalg::diag(&core)).dot(&right))
        }
    }
}

/// Returns the diagonal of the dual-polarization impairment core.
pub fn polarization_core(impairment_db: f64, model: ImpairmentModel) -> [f64; 2] {
    let l = db2lin(impairment_db);
    match model {
        ImpairmentModel::Active => {
            let g = (1.0 - l) / (1.0 + l);
            [1.0 + g, 1.0 - g]
        }
        ImpairmentModel::Passive => [1.0, 1.0 / l.sqrt()],
    }
}

/// Returns the log-amplitudes of a mode-dependent loss core.
///
/// The peak-to-peak impairment is converted to the natural-log domain, giving
/// a span `pp`. `(dim - 2) / 2` values are drawn uniformly in `[0, pp/2]` and
/// sorted, and the result is the symmetric array
/// `[-pp/2, -(reversed values), values, pp/2]`. This fixes the peak-to-peak
/// span exactly while the intermediate values are random. For the passive
/// model the array is shifted so that its maximum is zero.
///
/// The diagonal core of the impairment is `exp(x / 2)` for each entry `x`.
pub fn mode_log_amplitudes<R: Rng + ?Sized>(
    dim: usize,
    impairment_db: f64,
    model: ImpairmentModel,
    rng: &mut R,
) -> Vec<f64> {
    let half = 0.5 * db2natural(impairment_db);
    let mut inner: Vec<f64> = (0..dim.saturating_sub(2) / 2)
        .map(|_| half * rng.gen::<f64>())
        .collect();
    inner.sort_by(f64::total_cmp);
    let shift = match model {
        ImpairmentModel::Active => 0.0,
        ImpairmentModel::Passive => -half,
    };
    std::iter::once(-half)
        .chain(inner.iter().rev().map(|&x| -x))
        .chain(inner.iter().copied())
        .chain(std::iter::once(half))
        .map(|x| x + shift)
        .collect()
}

/// Rotation of the reference frame.
///
/// `R(alpha, beta) = [[cos(alpha) e^{-j beta}, -sin(alpha)], [sin(alpha),
/// cos(alpha) e^{j beta}]]`.
fn rotation(angles: &Angles) -> CMatrix {
    let (s, c) = angles.rotation.sin_cos();
    let phase = Complex64::from_polar(1.0, angles.phase);
    ndarray::arr2(&[
        [c * phase.conj(), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), c * phase],
    ])
}

/// Draws a Haar-distributed random unitary matrix.
///
/// A matrix with i.i.d. standard complex Gaussian entries is orthonormalized
/// column by column with the modified Gram-Schmidt procedure. The diagonal of
/// the implied R factor is real and positive, which is the condition for the
/// Q factor to be Haar-distributed.
pub fn haar_unitary<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> CMatrix {
    let mut q = CMatrix::from_shape_fn((dim, dim), |_| {
        let re: f64 = rng.sample(StandardNormal);
        let im: f64 = rng.sample(StandardNormal);
        Complex64::new(re, im) * FRAC_1_SQRT_2
    });
    for j in 0..dim {
        for k in 0..j {
            let projection: Complex64 = (0..dim).map(|t| q[[t, k]].conj() * q[[t, j]]).sum();
            for t in 0..dim {
                let x = q[[t, k]];
                q[[t, j]] -= projection * x;
            }
        }
        let norm = q.column(j).iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
        q.column_mut(j).mapv_inplace(|x| x / norm);
    }
    q
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        linalg::is_unitary,
        rand::{Rng, SeedableRng},
        units::lin2db,
    };

    fn models() -> [ImpairmentModel; 2] {
        [ImpairmentModel::Active, ImpairmentModel::Passive]
    }

    #[test]
    fn parse_model() {
        assert_eq!("active".parse(), Ok(ImpairmentModel::Active));
        assert_eq!("Passive".parse(), Ok(ImpairmentModel::Passive));
        assert_eq!(
            "lossy".parse::<ImpairmentModel>(),
            Err(ConfigurationError::UnknownModel("lossy".to_string()))
        );
        for model in models() {
            assert_eq!(model.to_string().parse(), Ok(model));
        }
    }

    #[test]
    fn zero_impairment_is_unitary() {
        let mut rng = Rng::seed_from_u64(0);
        for model in models() {
            for _ in 0..10 {
                let frame = Frame::Rotation(Angles::random(&mut rng));
                let h = generate(2, 0.0, model, &frame, &mut rng).unwrap();
                assert!(is_unitary(&h, 1e-12));
            }
            for dim in [2, 4, 6, 8] {
                let h = generate(dim, 0.0, model, &Frame::Random, &mut rng).unwrap();
                assert!(is_unitary(&h, 1e-12));
            }
        }
    }

    #[test]
    fn active_core_ratio() {
        // The active impairment is the ratio of the core amplitudes.
        for &db in &[0.1, 0.55, 1.0, 3.0] {
            let [a, b] = polarization_core(db, ImpairmentModel::Active);
            assert!((lin2db(b / a) - db).abs() < 1e-12);
        }
    }

    #[test]
    fn passive_core_ratio() {
        // The passive impairment is the ratio of the core powers.
        for &db in &[0.1, 0.55, 1.0, 3.0] {
            let [a, b] = polarization_core(db, ImpairmentModel::Passive);
            assert_eq!(a, 1.0);
            assert!((lin2db((a * a) / (b * b)) - db).abs() < 1e-12);
        }
    }

    #[test]
    fn no_rotation_keeps_core() {
        let mut rng = Rng::seed_from_u64(0);
        for model in models() {
            let frame = Frame::Rotation(Angles::default());
            let h = generate(2, 0.55, model, &frame, &mut rng).unwrap();
            let core = polarization_core(0.55, model);
            assert!((h[[0, 0]] - core[0]).norm() < 1e-15);
            assert!((h[[1, 1]] - core[1]).norm() < 1e-15);
            assert!(h[[0, 1]].norm() < 1e-15);
            assert!(h[[1, 0]].norm() < 1e-15);
        }
    }

    #[test]
    fn rotation_preserves_power_spread() {
        // Conjugating by a unitary leaves trace(H H^H) unchanged.
        let mut rng = Rng::seed_from_u64(1);
        let [a, b] = polarization_core(1.5, ImpairmentModel::Active);
        let frame = Frame::Rotation(Angles::new(0.7, 2.1));
        let h = generate(2, 1.5, ImpairmentModel::Active, &frame, &mut rng).unwrap();
        let power: f64 = h.iter().map(|x| x.norm_sqr()).sum();
        assert!((power - (a * a + b * b)).abs() < 1e-12);
    }

    #[test]
    fn mode_amplitudes_span() {
        let mut rng = Rng::seed_from_u64(2);
        for dim in [2, 4, 6, 8] {
            for model in models() {
                let x = mode_log_amplitudes(dim, 2.0, model, &mut rng);
                assert_eq!(x.len(), dim);
                assert!(x.windows(2).all(|w| w[0] <= w[1]));
                let span = x[dim - 1] - x[0];
                assert!((lin2db(span.exp()) - 2.0).abs() < 1e-12);
                match model {
                    ImpairmentModel::Active => {
                        for j in 0..dim {
                            assert!((x[j] + x[dim - 1 - j]).abs() < 1e-15);
                        }
                    }
                    ImpairmentModel::Passive => assert!(x[dim - 1].abs() < 1e-15),
                }
            }
        }
    }

    #[test]
    fn mode_matrix_power() {
        // trace(H H^H) only depends on the core.
        let mut rng = Rng::seed_from_u64(3);
        let h = generate(4, 1.0, ImpairmentModel::Active, &Frame::Random, &mut rng).unwrap();
        let power: f64 = h.iter().map(|x| x.norm_sqr()).sum();
        assert!(power > 4.0 * (-db2natural(1.0) / 2.0).exp());
        assert!(power < 4.0 * (db2natural(1.0) / 2.0).exp());
    }

    #[test]
    fn fresh_draws() {
        let mut rng = Rng::seed_from_u64(4);
        let a = generate(4, 1.0, ImpairmentModel::Active, &Frame::Random, &mut rng).unwrap();
        let b = generate(4, 1.0, ImpairmentModel::Active, &Frame::Random, &mut rng).unwrap();
        assert_ne!(a, b);
        let mut rng = Rng::seed_from_u64(4);
        let c = generate(4, 1.0, ImpairmentModel::Active, &Frame::Random, &mut rng).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn haar_is_unitary() {
        let mut rng = Rng::seed_from_u64(5);
        for dim in 1..=8 {
            assert!(is_unitary(&haar_unitary(dim, &mut rng), 1e-12));
        }
    }

    #[test]
    fn random_angles_range() {
        let mut rng = Rng::seed_from_u64(6);
        let mut mean_rotation = 0.0;
        let n = 10000;
        for _ in 0..n {
            let a = Angles::random(&mut rng);
            assert!((0.0..=PI / 2.0).contains(&a.rotation));
            assert!((0.0..2.0 * PI).contains(&a.phase));
            mean_rotation += a.rotation / n as f64;
        }
        // The density sin(2 alpha) is symmetric around pi/4.
        assert!((mean_rotation - PI / 4.0).abs() < 0.02);
    }

    #[test]
    fn bad_dimensions() {
        let mut rng = Rng::seed_from_u64(7);
        let frame = Frame::Rotation(Angles::default());
        assert_eq!(
            generate(4, 0.5, ImpairmentModel::Active, &frame, &mut rng),
            Err(ConfigurationError::IncompatibleDimension(4))
        );
        for dim in [0, 3, 5] {
            assert_eq!(
                generate(dim, 0.5, ImpairmentModel::Active, &Frame::Random, &mut rng),
                Err(ConfigurationError::IncompatibleDimension(dim))
            );
        }
    }

    #[test]
    fn bad_impairment() {
        let mut rng = Rng::seed_from_u64(8);
        for db in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                generate(2, db, ImpairmentModel::Active, &Frame::Random, &mut rng),
                Err(ConfigurationError::InvalidValue { .. })
            ));
        }
    }
}

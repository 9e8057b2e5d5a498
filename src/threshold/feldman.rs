use crate::error::{MeshError, MeshResult};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;

/// A Feldman-VSS share: the evaluation point `x` and the polynomial value
/// `y` at that point, both in the Ristretto scalar field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeldmanShare {
    pub x: u8,
    pub y: Scalar,
}

/// Public commitments to the dealer's polynomial coefficients,
/// `C_i = g^{a_i}`, published alongside the shares so each recipient can
/// verify its own share before accepting it.
#[derive(Debug, Clone)]
pub struct Commitments(pub Vec<CompressedRistretto>);

/// Split `secret` into `n` Feldman-VSS shares at threshold `t`, returning
/// the shares and the dealer's public commitments. `a_0 = secret`;
/// `a_1..a_{t-1}` are fresh random scalars.
pub fn deal(secret: Scalar, threshold: u8, n: u8) -> MeshResult<(Vec<FeldmanShare>, Commitments)> {
    if threshold == 0 || threshold > n {
        return Err(MeshError::InvalidThreshold(threshold, n as usize));
    }

    let mut coefficients = vec![secret];
    for _ in 1..threshold {
        coefficients.push(Scalar::random(&mut OsRng));
    }

    let commitments: Vec<CompressedRistretto> = coefficients
        .iter()
        .map(|a_i| (RISTRETTO_BASEPOINT_POINT * a_i).compress())
        .collect();

    let shares: Vec<FeldmanShare> = (1..=n)
        .map(|x| FeldmanShare {
            x,
            y: evaluate(&coefficients, x),
        })
        .collect();

    Ok((shares, Commitments(commitments)))
}

fn evaluate(coefficients: &[Scalar], x: u8) -> Scalar {
    let x_scalar = Scalar::from(x as u64);
    let mut result = Scalar::ZERO;
    let mut power = Scalar::ONE;
    for a_i in coefficients {
        result += a_i * power;
        power *= x_scalar;
    }
    result
}

/// Verify `share` against the dealer's published `commitments`: checks
/// `g^{y} == \prod_i C_i^{x^i}`. A share that fails this check must be
/// rejected by the recipient before it is used in reconstruction.
pub fn verify_share(share: &FeldmanShare, commitments: &Commitments) -> MeshResult<()> {
    let lhs = RISTRETTO_BASEPOINT_POINT * share.y;

    let x_scalar = Scalar::from(share.x as u64);
    let mut rhs = RistrettoPoint::default();
    let mut power = Scalar::ONE;
    for compressed in &commitments.0 {
        let c_i = compressed
            .decompress()
            .ok_or_else(|| MeshError::Generic("invalid commitment point".into()))?;
        rhs += c_i * power;
        power *= x_scalar;
    }

    if lhs == rhs {
        Ok(())
    } else {
        Err(MeshError::InvalidShare)
    }
}

/// Reconstruct the dealer's secret via Lagrange interpolation at `x = 0`
/// from `threshold`-many verified shares.
pub fn reconstruct(shares: &[FeldmanShare], threshold: u8) -> MeshResult<Scalar> {
    if shares.len() < threshold as usize {
        return Err(MeshError::InsufficientShares(shares.len(), threshold as usize));
    }
    let used = &shares[..threshold as usize];

    let mut secret = Scalar::ZERO;
    for (j, share_j) in used.iter().enumerate() {
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        let x_j = Scalar::from(share_j.x as u64);

        for (m, share_m) in used.iter().enumerate() {
            if m == j {
                continue;
            }
            let x_m = Scalar::from(share_m.x as u64);
            numerator *= x_m;
            denominator *= x_m - x_j;
        }

        let lagrange_coefficient = numerator * denominator.invert();
        secret += share_j.y * lagrange_coefficient;
    }

    Ok(secret)
}

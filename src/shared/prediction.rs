//! Pure per-component predictors.
//!
//! Integer kinds use wrapping arithmetic and ignore the quantization step,
//! which makes their delta coding exactly invertible. Float kinds with an
//! active step predict on the step lattice and code integer step counts;
//! without a step they code the raw difference in the native domain.

use crate::core::mixing::{Scalar, Value};

/// Parallelogram prediction: `d0 + d1 - do`, snapped onto the `q` lattice
/// for quantized float kinds.
pub fn predict(d0: Scalar, d1: Scalar, dop: Scalar, q: f64) -> Scalar {
    match (d0, d1, dop) {
        (Scalar::I32(a), Scalar::I32(b), Scalar::I32(c)) => {
            Scalar::I32(a.wrapping_add(b).wrapping_sub(c))
        }
        (Scalar::I64(a), Scalar::I64(b), Scalar::I64(c)) => {
            Scalar::I64(a.wrapping_add(b).wrapping_sub(c))
        }
        (Scalar::U32(a), Scalar::U32(b), Scalar::U32(c)) => {
            Scalar::U32(a.wrapping_add(b).wrapping_sub(c))
        }
        (Scalar::U64(a), Scalar::U64(b), Scalar::U64(c)) => {
            Scalar::U64(a.wrapping_add(b).wrapping_sub(c))
        }
        (Scalar::F32(a), Scalar::F32(b), Scalar::F32(c)) => {
            let p = (a as f64) + (b as f64) - (c as f64);
            Scalar::F32(snap(p, q) as f32)
        }
        (Scalar::F64(a), Scalar::F64(b), Scalar::F64(c)) => Scalar::F64(snap(a + b - c, q)),
        _ => unreachable!("mixed scalar kinds in one list"),
    }
}

/// Passthrough prediction from a single neighbor.
#[inline]
pub fn predict_face(d0: Scalar, _q: f64) -> Scalar {
    d0
}

/// Residual of `raw` against `pred`. Quantized float kinds return the
/// integer step count as an `I64` scalar.
pub fn encode_delta(raw: Scalar, pred: Scalar, q: f64) -> Scalar {
    match (raw, pred) {
        (Scalar::I32(a), Scalar::I32(b)) => Scalar::I32(a.wrapping_sub(b)),
        (Scalar::I64(a), Scalar::I64(b)) => Scalar::I64(a.wrapping_sub(b)),
        (Scalar::U32(a), Scalar::U32(b)) => Scalar::U32(a.wrapping_sub(b)),
        (Scalar::U64(a), Scalar::U64(b)) => Scalar::U64(a.wrapping_sub(b)),
        (Scalar::F32(a), Scalar::F32(b)) => {
            if q > 0.0 {
                Scalar::I64(((a as f64 - b as f64) / q).round() as i64)
            } else {
                Scalar::F32(a - b)
            }
        }
        (Scalar::F64(a), Scalar::F64(b)) => {
            if q > 0.0 {
                Scalar::I64(((a - b) / q).round() as i64)
            } else {
                Scalar::F64(a - b)
            }
        }
        _ => unreachable!("mixed scalar kinds in one list"),
    }
}

/// Inverse of [`encode_delta`].
pub fn decode_delta(delta: Scalar, pred: Scalar, q: f64) -> Scalar {
    match (delta, pred) {
        (Scalar::I32(d), Scalar::I32(p)) => Scalar::I32(p.wrapping_add(d)),
        (Scalar::I64(d), Scalar::I64(p)) => Scalar::I64(p.wrapping_add(d)),
        (Scalar::U32(d), Scalar::U32(p)) => Scalar::U32(p.wrapping_add(d)),
        (Scalar::U64(d), Scalar::U64(p)) => Scalar::U64(p.wrapping_add(d)),
        (Scalar::I64(d), Scalar::F32(p)) => Scalar::F32((p as f64 + d as f64 * q) as f32),
        (Scalar::I64(d), Scalar::F64(p)) => Scalar::F64(p + d as f64 * q),
        (Scalar::F32(d), Scalar::F32(p)) => Scalar::F32(p + d),
        (Scalar::F64(d), Scalar::F64(p)) => Scalar::F64(p + d),
        _ => unreachable!("mixed scalar kinds in one list"),
    }
}

#[inline]
fn snap(p: f64, q: f64) -> f64 {
    if q > 0.0 {
        (p / q).round() * q
    } else {
        p
    }
}

/// Cell-wise parallelogram prediction.
pub fn predict_value(d0: &Value, d1: &Value, dop: &Value, q: f64) -> Value {
    Value::zip3_with(d0, d1, dop, |a, b, c| predict(a, b, c, q))
}

/// Cell-wise passthrough prediction.
pub fn predict_face_value(d0: &Value, q: f64) -> Value {
    Value::zip2_with(d0, d0, |a, _| predict_face(a, q))
}

/// Cell-wise residual.
pub fn encode_delta_value(raw: &Value, pred: &Value, q: f64) -> Value {
    Value::zip2_with(raw, pred, |a, b| encode_delta(a, b, q))
}

/// Cell-wise reconstruction.
pub fn decode_delta_value(delta: &Value, pred: &Value, q: f64) -> Value {
    Value::zip2_with(delta, pred, |a, b| decode_delta(a, b, q))
}

//! Runtime-typed numeric cells.
//!
//! Attribute values are multi-component cells whose component type is only
//! known at runtime. `Scalar` is one component, `Value` is one cell. The
//! prediction pipeline runs component-wise over cells of a single list and
//! therefore of a single kind; a widened kind (`i64`/`u64`/`f64`) is used
//! for the running mean so that summing candidates cannot overflow.

use smallvec::SmallVec;

/// Component type tag of an attribute list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// Kind used for accumulating sums of this kind.
    #[inline]
    pub fn widened(self) -> ScalarKind {
        match self {
            ScalarKind::I32 | ScalarKind::I64 => ScalarKind::I64,
            ScalarKind::U32 | ScalarKind::U64 => ScalarKind::U64,
            ScalarKind::F32 | ScalarKind::F64 => ScalarKind::F64,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ScalarKind::I32 => 0,
            ScalarKind::I64 => 1,
            ScalarKind::U32 => 2,
            ScalarKind::U64 => 3,
            ScalarKind::F32 => 4,
            ScalarKind::F64 => 5,
        }
    }

    pub fn from_tag(tag: u8) -> Option<ScalarKind> {
        Some(match tag {
            0 => ScalarKind::I32,
            1 => ScalarKind::I64,
            2 => ScalarKind::U32,
            3 => ScalarKind::U64,
            4 => ScalarKind::F32,
            5 => ScalarKind::F64,
            _ => return None,
        })
    }
}

/// One component of an attribute cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    #[inline]
    pub fn kind(self) -> ScalarKind {
        match self {
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
        }
    }

    pub fn zero(kind: ScalarKind) -> Scalar {
        match kind {
            ScalarKind::I32 => Scalar::I32(0),
            ScalarKind::I64 => Scalar::I64(0),
            ScalarKind::U32 => Scalar::U32(0),
            ScalarKind::U64 => Scalar::U64(0),
            ScalarKind::F32 => Scalar::F32(0.0),
            ScalarKind::F64 => Scalar::F64(0.0),
        }
    }

    /// Losslessly converts into the widened kind.
    #[inline]
    pub fn widen(self) -> Scalar {
        match self {
            Scalar::I32(x) => Scalar::I64(x as i64),
            Scalar::I64(x) => Scalar::I64(x),
            Scalar::U32(x) => Scalar::U64(x as u64),
            Scalar::U64(x) => Scalar::U64(x),
            Scalar::F32(x) => Scalar::F64(x as f64),
            Scalar::F64(x) => Scalar::F64(x),
        }
    }

    /// Truncating conversion from a widened scalar back to `kind`.
    #[inline]
    pub fn narrow_to(kind: ScalarKind, wide: Scalar) -> Scalar {
        match (kind, wide) {
            (ScalarKind::I32, Scalar::I64(x)) => Scalar::I32(x as i32),
            (ScalarKind::I64, Scalar::I64(x)) => Scalar::I64(x),
            (ScalarKind::U32, Scalar::U64(x)) => Scalar::U32(x as u32),
            (ScalarKind::U64, Scalar::U64(x)) => Scalar::U64(x),
            (ScalarKind::F32, Scalar::F64(x)) => Scalar::F32(x as f32),
            (ScalarKind::F64, Scalar::F64(x)) => Scalar::F64(x),
            _ => unreachable!("narrowing from a non-widened scalar"),
        }
    }

    /// Widened addition used by the mean accumulator.
    #[inline]
    pub fn add_wide(self, other: Scalar) -> Scalar {
        match (self, other.widen()) {
            (Scalar::I64(a), Scalar::I64(b)) => Scalar::I64(a.wrapping_add(b)),
            (Scalar::U64(a), Scalar::U64(b)) => Scalar::U64(a.wrapping_add(b)),
            (Scalar::F64(a), Scalar::F64(b)) => Scalar::F64(a + b),
            _ => unreachable!("accumulator holds a non-widened scalar"),
        }
    }

    /// Round-to-nearest division of a widened scalar by a count.
    #[inline]
    pub fn div_round(self, n: usize) -> Scalar {
        match self {
            Scalar::I64(a) => {
                let n = n as i64;
                Scalar::I64(if a >= 0 {
                    (a + n / 2) / n
                } else {
                    -((-a + n / 2) / n)
                })
            }
            Scalar::U64(a) => {
                let n = n as u64;
                Scalar::U64((a + n / 2) / n)
            }
            Scalar::F64(a) => Scalar::F64(a / n as f64),
            _ => unreachable!("dividing a non-widened scalar"),
        }
    }

    /// Distance to `other` in the real domain, for the candidate selection.
    #[inline]
    pub fn abs_diff(self, other: Scalar) -> f64 {
        let a = match self.widen() {
            Scalar::I64(x) => x as f64,
            Scalar::U64(x) => x as f64,
            Scalar::F64(x) => x,
            _ => unreachable!(),
        };
        let b = match other.widen() {
            Scalar::I64(x) => x as f64,
            Scalar::U64(x) => x as f64,
            Scalar::F64(x) => x,
            _ => unreachable!(),
        };
        (a - b).abs()
    }
}

/// One attribute cell: a short run of components of a single kind.
///
/// A cell holding integer deltas for a quantized float list temporarily
/// carries `I64` components; everywhere else the components match the
/// owning list's kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    comps: SmallVec<[Scalar; 4]>,
}

impl Value {
    pub fn zeros(kind: ScalarKind, dim: usize) -> Value {
        Value {
            comps: (0..dim).map(|_| Scalar::zero(kind)).collect(),
        }
    }

    pub fn from_scalars(comps: &[Scalar]) -> Value {
        Value {
            comps: comps.iter().copied().collect(),
        }
    }

    pub fn of_i32(comps: &[i32]) -> Value {
        Value {
            comps: comps.iter().map(|&c| Scalar::I32(c)).collect(),
        }
    }

    pub fn of_u32(comps: &[u32]) -> Value {
        Value {
            comps: comps.iter().map(|&c| Scalar::U32(c)).collect(),
        }
    }

    pub fn of_f32(comps: &[f32]) -> Value {
        Value {
            comps: comps.iter().map(|&c| Scalar::F32(c)).collect(),
        }
    }

    pub fn of_f64(comps: &[f64]) -> Value {
        Value {
            comps: comps.iter().map(|&c| Scalar::F64(c)).collect(),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.comps.len()
    }

    #[inline]
    pub fn comp(&self, i: usize) -> Scalar {
        self.comps[i]
    }

    #[inline]
    pub fn set_comp(&mut self, i: usize, s: Scalar) {
        self.comps[i] = s;
    }

    /// Component-wise combination of two cells.
    pub fn zip2_with<F>(a: &Value, b: &Value, f: F) -> Value
    where
        F: Fn(Scalar, Scalar) -> Scalar,
    {
        debug_assert_eq!(a.dim(), b.dim());
        Value {
            comps: a
                .comps
                .iter()
                .zip(b.comps.iter())
                .map(|(&x, &y)| f(x, y))
                .collect(),
        }
    }

    /// Component-wise combination of three cells.
    pub fn zip3_with<F>(a: &Value, b: &Value, c: &Value, f: F) -> Value
    where
        F: Fn(Scalar, Scalar, Scalar) -> Scalar,
    {
        debug_assert_eq!(a.dim(), b.dim());
        debug_assert_eq!(a.dim(), c.dim());
        Value {
            comps: a
                .comps
                .iter()
                .zip(b.comps.iter())
                .zip(c.comps.iter())
                .map(|((&x, &y), &z)| f(x, y, z))
                .collect(),
        }
    }

    /// Adds `other` into this widened accumulator cell.
    pub fn accumulate(&mut self, other: &Value) {
        debug_assert_eq!(self.dim(), other.dim());
        for (acc, &c) in self.comps.iter_mut().zip(other.comps.iter()) {
            *acc = acc.add_wide(c);
        }
    }

    /// Round-to-nearest mean of `n` accumulated cells, narrowed to `kind`.
    pub fn mean(&self, n: usize, kind: ScalarKind) -> Value {
        Value {
            comps: self
                .comps
                .iter()
                .map(|&c| Scalar::narrow_to(kind, c.div_round(n)))
                .collect(),
        }
    }
}

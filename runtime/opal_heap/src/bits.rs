//! Scalar bit codec.
//!
//! Flattened scalar cells store little-endian bit patterns. Booleans
//! store as a single byte, 0 or 1. All slices handed in are exactly the
//! scalar's size; the layout guarantees the ranges.

use opal_types::ScalarKind;

use crate::Value;

/// Decode the scalar at `bytes` (exactly `kind.size()` long).
pub(crate) fn decode(kind: ScalarKind, bytes: &[u8]) -> Value {
    match kind {
        ScalarKind::Int32 => Value::Int32(i32::from_le_bytes(array4(bytes))),
        ScalarKind::Int64 => Value::Int64(i64::from_le_bytes(array8(bytes))),
        ScalarKind::Float32 => Value::Float32(f32::from_le_bytes(array4(bytes))),
        ScalarKind::Float64 => Value::Float64(f64::from_le_bytes(array8(bytes))),
        ScalarKind::Bool => Value::Bool(bytes[0] != 0),
        ScalarKind::Byte => Value::Byte(bytes[0]),
    }
}

/// Encode `value` into `bytes` (exactly `kind.size()` long).
///
/// Returns `false` without touching the slice when the value is not the
/// expected scalar kind.
pub(crate) fn encode(kind: ScalarKind, bytes: &mut [u8], value: &Value) -> bool {
    match (kind, value) {
        (ScalarKind::Int32, Value::Int32(v)) => bytes.copy_from_slice(&v.to_le_bytes()),
        (ScalarKind::Int64, Value::Int64(v)) => bytes.copy_from_slice(&v.to_le_bytes()),
        (ScalarKind::Float32, Value::Float32(v)) => bytes.copy_from_slice(&v.to_le_bytes()),
        (ScalarKind::Float64, Value::Float64(v)) => bytes.copy_from_slice(&v.to_le_bytes()),
        (ScalarKind::Bool, Value::Bool(v)) => bytes[0] = u8::from(*v),
        (ScalarKind::Byte, Value::Byte(v)) => bytes[0] = *v,
        _ => return false,
    }
    true
}

fn array4(bytes: &[u8]) -> [u8; 4] {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    buf
}

fn array8(bytes: &[u8]) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    buf
}

// Copyright Rouven Bauer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use super::value_send::ValueSend;

/// A value as it was decoded from the wire.
///
/// Graph entities arrive as [`ValueReceive::Structure`] and are only interpreted further by the
/// response assembly (see [`crate::driver::assemble()`]).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValueReceive {
    Null,
    Boolean(bool),
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<ValueReceive>),
    Map(HashMap<String, ValueReceive>),
    Structure(Structure),
}

/// A tagged PackStream structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub signature: u8,
    pub fields: Vec<ValueReceive>,
}

impl Structure {
    pub fn new(signature: u8, fields: Vec<ValueReceive>) -> Self {
        Self { signature, fields }
    }
}

impl ValueReceive {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ValueReceive::Null)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ValueReceive::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer that fits into `u64`.
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ValueReceive::UnsignedInteger(v) => Some(*v),
            ValueReceive::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Any integer that fits into `i64`.
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValueReceive::Integer(v) => Some(*v),
            ValueReceive::UnsignedInteger(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ValueReceive::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ValueReceive::Bytes(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ValueReceive::String(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[ValueReceive]> {
        match self {
            ValueReceive::List(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&HashMap<String, ValueReceive>> {
        match self {
            ValueReceive::Map(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            ValueReceive::Structure(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    #[allow(clippy::result_large_err)]
    pub fn try_into_string(self) -> Result<String, Self> {
        match self {
            ValueReceive::String(v) => Ok(v),
            _ => Err(self),
        }
    }

    #[inline]
    #[allow(clippy::result_large_err)]
    pub fn try_into_list(self) -> Result<Vec<ValueReceive>, Self> {
        match self {
            ValueReceive::List(v) => Ok(v),
            _ => Err(self),
        }
    }

    #[inline]
    #[allow(clippy::result_large_err)]
    pub fn try_into_map(self) -> Result<HashMap<String, ValueReceive>, Self> {
        match self {
            ValueReceive::Map(v) => Ok(v),
            _ => Err(self),
        }
    }

    /// Like `==` but opaque values ([`ValueReceive::Structure`]) never cause inequality.
    pub(crate) fn eq_ignore_opaque(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueReceive::Structure(_), _) | (_, ValueReceive::Structure(_)) => true,
            (ValueReceive::List(v1), ValueReceive::List(v2)) => {
                v1.len() == v2.len()
                    && v1.iter().zip(v2.iter()).all(|(v1, v2)| v1.eq_ignore_opaque(v2))
            }
            (ValueReceive::Map(v1), ValueReceive::Map(v2)) => {
                v1.len() == v2.len()
                    && v1.iter().all(|(k, v1)| {
                        v2.get(k)
                            .map(|v2| v1.eq_ignore_opaque(v2))
                            .unwrap_or(false)
                    })
            }
            (v1, v2) => match (v1.as_i64(), v2.as_i64()) {
                (Some(i1), Some(i2)) => i1 == i2,
                _ => v1 == v2,
            },
        }
    }
}

impl From<ValueSend> for ValueReceive {
    fn from(v: ValueSend) -> Self {
        match v {
            ValueSend::Null => Self::Null,
            ValueSend::Boolean(v) => Self::Boolean(v),
            ValueSend::Integer(v) => Self::Integer(v),
            ValueSend::Float(v) => Self::Float(v),
            ValueSend::Bytes(v) => Self::Bytes(v),
            ValueSend::String(v) => Self::String(v),
            ValueSend::List(v) => Self::List(v.into_iter().map(Into::into).collect()),
            ValueSend::Map(v) => Self::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(ValueReceive::Integer(0), Some(0))]
    #[case(ValueReceive::Integer(42), Some(42))]
    #[case(ValueReceive::Integer(-1), None)]
    #[case(ValueReceive::UnsignedInteger(u64::MAX), Some(u64::MAX))]
    #[case(ValueReceive::Float(1.0), None)]
    #[case(ValueReceive::String("1".into()), None)]
    fn test_as_u64(#[case] input: ValueReceive, #[case] output: Option<u64>) {
        assert_eq!(input.as_u64(), output);
    }

    #[rstest]
    #[case(ValueReceive::Integer(-1), Some(-1))]
    #[case(ValueReceive::UnsignedInteger(7), Some(7))]
    #[case(ValueReceive::UnsignedInteger(u64::MAX), None)]
    #[case(ValueReceive::Null, None)]
    fn test_as_i64(#[case] input: ValueReceive, #[case] output: Option<i64>) {
        assert_eq!(input.as_i64(), output);
    }

    #[test]
    fn test_eq_ignore_opaque() {
        let point = ValueReceive::Structure(Structure::new(0x58, vec![ValueReceive::Integer(1)]));
        assert!(point.eq_ignore_opaque(&ValueReceive::Null));
        assert!(ValueReceive::Integer(1).eq_ignore_opaque(&ValueReceive::UnsignedInteger(1)));
        assert!(!ValueReceive::Integer(1).eq_ignore_opaque(&ValueReceive::Integer(2)));
        assert!(ValueReceive::List(vec![point.clone()])
            .eq_ignore_opaque(&ValueReceive::List(vec![ValueReceive::Boolean(true)])));
        assert!(!ValueReceive::List(vec![point])
            .eq_ignore_opaque(&ValueReceive::List(vec![])));
    }
}

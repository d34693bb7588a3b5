use crate::player::{DisplayObjectId, FunctionId, ObjectId};

/// A script value. Numbers keep their integer form until an operation
/// forces a double, mirroring how the push record encodes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Avm1Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
    Object(ObjectId),
    Function(FunctionId),
    Clip(DisplayObjectId),
}

impl Avm1Value {
    pub fn from_f64(value: f64) -> Avm1Value {
        if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
            Avm1Value::Int(value as i32)
        } else {
            Avm1Value::Double(value)
        }
    }

    /// Numeric coercion. Before container version 7, `undefined`
    /// converts to 0 instead of NaN.
    pub fn to_number(&self, swf_version: u8) -> f64 {
        match self {
            Avm1Value::Undefined => {
                if swf_version < 7 {
                    0.0
                } else {
                    f64::NAN
                }
            }
            Avm1Value::Null => {
                if swf_version < 7 {
                    0.0
                } else {
                    f64::NAN
                }
            }
            Avm1Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Avm1Value::Int(i) => *i as f64,
            Avm1Value::Double(d) => *d,
            Avm1Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    f64::NAN
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Avm1Value::Object(_) | Avm1Value::Function(_) | Avm1Value::Clip(_) => f64::NAN,
        }
    }

    pub fn to_i32(&self, swf_version: u8) -> i32 {
        let n = self.to_number(swf_version);
        if n.is_nan() || n.is_infinite() {
            0
        } else {
            n as i64 as i32
        }
    }

    pub fn to_bool(&self, swf_version: u8) -> bool {
        match self {
            Avm1Value::Undefined | Avm1Value::Null => false,
            Avm1Value::Bool(b) => *b,
            Avm1Value::Int(i) => *i != 0,
            Avm1Value::Double(d) => *d != 0.0 && !d.is_nan(),
            Avm1Value::Str(s) => {
                if swf_version < 7 {
                    // old players coerce strings through their numeric value
                    let n = self.to_number(swf_version);
                    n != 0.0 && !n.is_nan()
                } else {
                    !s.is_empty()
                }
            }
            Avm1Value::Object(_) | Avm1Value::Function(_) | Avm1Value::Clip(_) => true,
        }
    }

    /// String coercion without object lookup; composite values render
    /// their type tag.
    pub fn coerce_to_string(&self) -> String {
        match self {
            Avm1Value::Undefined => "undefined".to_string(),
            Avm1Value::Null => "null".to_string(),
            Avm1Value::Bool(b) => b.to_string(),
            Avm1Value::Int(i) => i.to_string(),
            Avm1Value::Double(d) => format_double(*d),
            Avm1Value::Str(s) => s.clone(),
            Avm1Value::Object(_) => "[object Object]".to_string(),
            Avm1Value::Function(_) => "[type Function]".to_string(),
            Avm1Value::Clip(_) => "[type MovieClip]".to_string(),
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Avm1Value::Undefined => "undefined",
            Avm1Value::Null => "null",
            Avm1Value::Bool(_) => "boolean",
            Avm1Value::Int(_) | Avm1Value::Double(_) => "number",
            Avm1Value::Str(_) => "string",
            Avm1Value::Object(_) => "object",
            Avm1Value::Function(_) => "function",
            Avm1Value::Clip(_) => "movieclip",
        }
    }

    /// Abstract equality for the typed comparison op: numbers compare
    /// numerically, mixed string/number compares numerically, composites
    /// compare by handle.
    pub fn abstract_eq(&self, other: &Avm1Value, swf_version: u8) -> bool {
        match (self, other) {
            (Avm1Value::Undefined, Avm1Value::Undefined)
            | (Avm1Value::Null, Avm1Value::Null)
            | (Avm1Value::Undefined, Avm1Value::Null)
            | (Avm1Value::Null, Avm1Value::Undefined) => true,
            (Avm1Value::Str(a), Avm1Value::Str(b)) => a == b,
            (Avm1Value::Object(a), Avm1Value::Object(b)) => a == b,
            (Avm1Value::Function(a), Avm1Value::Function(b)) => a == b,
            (Avm1Value::Clip(a), Avm1Value::Clip(b)) => a == b,
            _ => {
                let a = self.to_number(swf_version);
                let b = other.to_number(swf_version);
                a == b
            }
        }
    }

    pub fn strict_eq(&self, other: &Avm1Value) -> bool {
        match (self, other) {
            (Avm1Value::Int(a), Avm1Value::Double(b))
            | (Avm1Value::Double(b), Avm1Value::Int(a)) => *a as f64 == *b,
            _ => self == other,
        }
    }
}

/// Integral doubles print without a trailing ".0".
fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_to_number_by_version() {
        assert_eq!(Avm1Value::Undefined.to_number(6), 0.0);
        assert!(Avm1Value::Undefined.to_number(7).is_nan());
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(Avm1Value::Str(" 3.5 ".into()).to_number(6), 3.5);
        assert!(Avm1Value::Str("abc".into()).to_number(6).is_nan());
    }

    #[test]
    fn test_string_truthiness_by_version() {
        let s = Avm1Value::Str("true".into());
        assert!(!s.to_bool(6)); // "true" is NaN numerically
        assert!(s.to_bool(7));
    }

    #[test]
    fn test_from_f64_collapses_to_int() {
        assert_eq!(Avm1Value::from_f64(3.0), Avm1Value::Int(3));
        assert_eq!(Avm1Value::from_f64(3.5), Avm1Value::Double(3.5));
    }

    #[test]
    fn test_abstract_eq_mixed() {
        assert!(Avm1Value::Int(5).abstract_eq(&Avm1Value::Str("5".into()), 6));
        assert!(Avm1Value::Undefined.abstract_eq(&Avm1Value::Null, 7));
        assert!(!Avm1Value::Str("a".into()).abstract_eq(&Avm1Value::Str("b".into()), 6));
    }

    #[test]
    fn test_strict_eq_numeric_forms() {
        assert!(Avm1Value::Int(2).strict_eq(&Avm1Value::Double(2.0)));
        assert!(!Avm1Value::Int(2).strict_eq(&Avm1Value::Str("2".into())));
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(Avm1Value::Double(4.0).coerce_to_string(), "4");
        assert_eq!(Avm1Value::Double(4.25).coerce_to_string(), "4.25");
        assert_eq!(Avm1Value::Undefined.coerce_to_string(), "undefined");
    }
}

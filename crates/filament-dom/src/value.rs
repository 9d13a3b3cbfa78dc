use std::fmt;

/// A value written into the render tree by a binding.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DomValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl DomValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DomValue::Null)
    }

    /// Script-style truthiness: `null`, `false`, `0`, `NaN` and `""` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            DomValue::Null => false,
            DomValue::Bool(b) => *b,
            DomValue::Number(n) => *n != 0.0 && !n.is_nan(),
            DomValue::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DomValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DomValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            DomValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used for attribute values and text content. `Null` is empty.
    pub fn to_text(&self) -> String {
        match self {
            DomValue::Null => String::new(),
            DomValue::Bool(b) => b.to_string(),
            DomValue::Number(n) => format_number(*n),
            DomValue::Text(s) => s.clone(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for DomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<()> for DomValue {
    fn from(_: ()) -> Self {
        DomValue::Null
    }
}

impl From<bool> for DomValue {
    fn from(v: bool) -> Self {
        DomValue::Bool(v)
    }
}

impl From<String> for DomValue {
    fn from(v: String) -> Self {
        DomValue::Text(v)
    }
}

impl From<&str> for DomValue {
    fn from(v: &str) -> Self {
        DomValue::Text(v.to_string())
    }
}

impl From<&String> for DomValue {
    fn from(v: &String) -> Self {
        DomValue::Text(v.clone())
    }
}

impl From<char> for DomValue {
    fn from(v: char) -> Self {
        DomValue::Text(v.to_string())
    }
}

impl<T: Into<DomValue>> From<Option<T>> for DomValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(DomValue::Null, Into::into)
    }
}

macro_rules! number_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for DomValue {
                fn from(v: $t) -> Self {
                    DomValue::Number(v as f64)
                }
            }
        )*
    };
}

number_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_print_like_script() {
        assert_eq!(DomValue::from(3).to_text(), "3");
        assert_eq!(DomValue::from(-2.0).to_text(), "-2");
        assert_eq!(DomValue::from(0.5).to_text(), "0.5");
        assert_eq!(DomValue::from(f64::NAN).to_text(), "NaN");
        assert_eq!(DomValue::from(f64::NEG_INFINITY).to_text(), "-Infinity");
    }

    #[test]
    fn test_truthiness() {
        assert!(!DomValue::Null.is_truthy());
        assert!(!DomValue::from("").is_truthy());
        assert!(!DomValue::from(0).is_truthy());
        assert!(!DomValue::from(f64::NAN).is_truthy());
        assert!(DomValue::from("x").is_truthy());
        assert!(DomValue::from(-1).is_truthy());
        assert!(DomValue::from(Some(true)).is_truthy());
        assert!(DomValue::from(None::<bool>).is_null());
    }
}

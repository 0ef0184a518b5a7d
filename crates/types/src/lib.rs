use std::cmp::Ordering;

/// The declared column type a [`Value`] is expected to conform to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColumnType {
    Integer,
    Text,
    Real,
    Blob,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// A single SQL value.
///
/// `Text` and `Blob` own their bytes. `Parameter` is a compile-time placeholder
/// (`?` in source text) that must be substituted with a bound value before it is
/// ever evaluated; it never appears in a stored row or a B-tree leaf.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
    Parameter(u32),
}

impl Value {
    fn type_rank(&self) -> Option<u8> {
        match self {
            Value::Null => Some(0),
            Value::Integer(_) | Value::Real(_) => Some(1),
            Value::Text(_) => Some(2),
            Value::Blob(_) => Some(3),
            Value::Parameter(_) => None,
        }
    }

    /// Total ordering across value tags: `Null < {Integer, Real} < Text < Blob`.
    /// Numeric comparisons promote `Integer` to `Real`. Returns `None` only when
    /// either side is an unsubstituted `Parameter`, which has no meaningful order.
    pub fn cmp_value(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(a), Real(b)) => (*a as f64).partial_cmp(b),
            (Real(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Real(a), Real(b)) => a.partial_cmp(b),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Blob(a), Blob(b)) => Some(a.cmp(b)),
            (Parameter(_), _) | (_, Parameter(_)) => None,
            _ => {
                let (ra, rb) = (self.type_rank()?, other.type_rank()?);
                Some(ra.cmp(&rb))
            }
        }
    }

    /// `true`/`false` equality under the same ordering rules as [`Value::cmp_value`].
    pub fn eq_value(&self, other: &Value) -> Option<bool> {
        self.cmp_value(other).map(|ord| ord == Ordering::Equal)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering::{Equal, Greater, Less};

    #[test]
    fn null_is_less_than_everything_else() {
        assert_eq!(Value::Null.cmp_value(&Value::Integer(0)), Some(Less));
        assert_eq!(Value::Null.cmp_value(&Value::Text("".into())), Some(Less));
        assert_eq!(Value::Null.cmp_value(&Value::Blob(vec![])), Some(Less));
        assert_eq!(Value::Null.cmp_value(&Value::Null), Some(Equal));
    }

    #[test]
    fn numeric_promotes_integer_to_real() {
        assert_eq!(
            Value::Integer(2).cmp_value(&Value::Real(2.5)),
            Some(Less)
        );
        assert_eq!(
            Value::Real(2.0).cmp_value(&Value::Integer(2)),
            Some(Equal)
        );
    }

    #[test]
    fn tags_order_numeric_text_blob() {
        assert_eq!(
            Value::Integer(1000).cmp_value(&Value::Text("a".into())),
            Some(Less)
        );
        assert_eq!(
            Value::Text("zzzz".into()).cmp_value(&Value::Blob(vec![0])),
            Some(Less)
        );
    }

    #[test]
    fn parameter_has_no_order() {
        assert_eq!(Value::Parameter(0).cmp_value(&Value::Integer(1)), None);
        assert_eq!(Value::Integer(1).cmp_value(&Value::Parameter(0)), None);
    }

    #[test]
    fn eq_value_matches_equal_ordering() {
        assert_eq!(Value::Integer(4).eq_value(&Value::Real(4.0)), Some(true));
        assert_eq!(Value::Integer(4).eq_value(&Value::Integer(5)), Some(false));
    }

    #[test]
    fn serde_round_trip_stability() {
        let vals = vec![
            Value::Integer(-42),
            Value::Real(1.5),
            Value::Text("Ada".into()),
            Value::Blob(vec![1, 2, 3]),
            Value::Null,
        ];

        let json = serde_json::to_string(&vals).unwrap();
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(vals, back);
    }

    proptest! {
        #[test]
        fn order_is_antisymmetric(i in any::<i64>(), j in any::<i64>()) {
            let a = Value::Integer(i);
            let b = Value::Integer(j);
            match (a.cmp_value(&b), b.cmp_value(&a)) {
                (Some(o1), Some(o2)) => prop_assert_eq!(o1, o2.reverse()),
                _ => prop_assert!(true),
            }
        }

        #[test]
        fn text_cmp_matches_std(a in ".*", b in ".*") {
            let va = Value::Text(a.clone());
            let vb = Value::Text(b.clone());
            prop_assert_eq!(va.cmp_value(&vb), Some(a.cmp(&b)));
        }
    }
}

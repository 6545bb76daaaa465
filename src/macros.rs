/// Build a positional [`ParamSource`](crate::ParamSource).
///
/// Each argument goes through `ParamValue::from`, so `Vec`s and arrays become IN-list
/// bindings and everything else a scalar.
///
/// ```rust
/// use sql_ops::prelude::*;
///
/// let source = params!["hello", vec![1, 2], 10];
/// assert_eq!(source.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::ParamSource::Positional(::std::vec::Vec::new())
    };
    ($($value:expr),+ $(,)?) => {
        $crate::ParamSource::Positional(::std::vec![$($crate::ParamValue::from($value)),+])
    };
}

/// Build a named [`ParamSource`](crate::ParamSource).
///
/// ```rust
/// use sql_ops::prelude::*;
///
/// let source = named_params! { "cnt" => 5, "name" => vec!["a", "b"] };
/// assert_eq!(source.len(), 2);
/// ```
#[macro_export]
macro_rules! named_params {
    () => {
        $crate::ParamSource::Named(::std::collections::HashMap::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::HashMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::ParamValue::from($value));
        )+
        $crate::ParamSource::Named(map)
    }};
}

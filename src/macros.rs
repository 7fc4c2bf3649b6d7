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

// imports for docs
#[allow(unused)]
use std::collections::HashMap;

#[cfg(doc)]
use crate::ValueSend;

#[cfg(test)]
macro_rules! hash_map {
    () => {std::collections::HashMap::new()};
    ( $($key:expr => $value:expr),* $(,)? ) => {
        {
            let mut m = std::collections::HashMap::new();
            $(
                m.insert($key, $value);
            )*
            m
        }
    };
}

#[cfg(test)]
pub(crate) use hash_map;

/// Short notation for creating a [`HashMap<String, ValueSend>`], e.g., for query parameters.
///
/// Every value is converted with [`ValueSend::from`].
///
/// ```
/// use std::collections::HashMap;
/// use bolt_ogm::{value_map, ValueSend};
///
/// assert_eq!(HashMap::new(), value_map!());
///
/// let mut map = HashMap::new();
/// map.insert(String::from("name"), ValueSend::String(String::from("Alice")));
/// map.insert(String::from("age"), ValueSend::Integer(42));
/// map.insert(String::from("nick"), ValueSend::Null);
/// assert_eq!(map, value_map!({"name": "Alice", "age": 42, "nick": ValueSend::Null}));
/// ```
#[macro_export]
macro_rules! value_map {
    ($(,)?) => {
        std::collections::HashMap::<String, $crate::ValueSend>::new()
    };

    ({ $($key:literal : $value:expr),* $(,)? }) => {
        {
            #[allow(unused_mut)]
            let mut map = std::collections::HashMap::<String, $crate::ValueSend>::new();
            $(
                let _ = map.insert(String::from($key), $crate::ValueSend::from($value));
            )*
            map
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::ValueSend;

    #[test]
    fn test_empty() {
        assert!(value_map!().is_empty());
        assert!(value_map!({}).is_empty());
    }

    #[test]
    fn test_mixed_values() {
        let map = value_map!({
            "int": 1,
            "float": 2.5,
            "string": "foo",
            "list": vec![1, 2],
            "null": ValueSend::Null,
        });
        assert_eq!(map.len(), 5);
        assert_eq!(map["int"], ValueSend::Integer(1));
        assert_eq!(map["float"], ValueSend::Float(2.5));
        assert_eq!(map["string"], ValueSend::String(String::from("foo")));
        assert_eq!(
            map["list"],
            ValueSend::List(vec![ValueSend::Integer(1), ValueSend::Integer(2)])
        );
        assert_eq!(map["null"], ValueSend::Null);
    }

    #[test]
    fn test_later_key_wins() {
        let map = value_map!({"a": 1, "a": 2});
        assert_eq!(map["a"], ValueSend::Integer(2));
    }
}

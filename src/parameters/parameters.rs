use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{Table, Value};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Error deserializing parameters")]
    Deserialize(#[from] toml::de::Error),

    #[error("Parameter toml does not have the right structure (error in '{0}')")]
    BadToml(String),

    #[error("Element '{path}' not found")]
    NotFound { path: String },

    #[error("Cannot cast parameter '{path}' to {dtype}")]
    BadCast { path: String, dtype: String },

    #[error("Element '{path}' is not a parameter")]
    NotAParameter { path: String },

    #[error("Element '{path}' is not a map")]
    NotAMap { path: String },
}

/// Typed parameter leaves. Every leaf in the toml is a table of the form
/// `{ val = ..., type = "..." }`, which keeps floats and ints from being
/// silently coerced into each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ParameterValue {
    #[serde(rename = "bool")]
    Bool { val: bool },
    #[serde(rename = "int")]
    Int { val: i64 },
    #[serde(rename = "float")]
    Float { val: f64 },
    #[serde(rename = "str")]
    String { val: String },

    #[serde(rename = "float[]")]
    FloatArray { val: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    path: String,
    value: ParameterValue,
}

impl Parameter {
    pub fn value_float(&self) -> Result<f64, Error> {
        if let ParameterValue::Float { val } = self.value {
            Ok(val)
        } else {
            Err(Error::BadCast {
                path: self.path.clone(),
                dtype: "float".to_string(),
            })
        }
    }

    pub fn value_float_arr(&self) -> Result<&[f64], Error> {
        if let ParameterValue::FloatArray { val } = &self.value {
            Ok(val)
        } else {
            Err(Error::BadCast {
                path: self.path.clone(),
                dtype: "float[]".to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterMap {
    path: String,
    map: BTreeMap<String, ParameterTree>,
}

impl ParameterMap {
    pub fn get(&self, rel_path: &str) -> Result<&ParameterTree, Error> {
        let mut parts = rel_path.split(".");

        let mut elem = self
            .map
            .get(parts.next().expect("Split cannot return an empty iterator"))
            .ok_or(Error::NotFound {
                path: append_path(&self.path, rel_path),
            })?;

        for part in parts {
            match elem {
                ParameterTree::Node(n) => {
                    elem = n.map.get(part).ok_or(Error::NotFound {
                        path: append_path(&self.path, rel_path),
                    })?;
                }
                ParameterTree::Leaf(_) => {
                    return Err(Error::NotFound {
                        path: append_path(&self.path, rel_path),
                    });
                }
            }
        }

        Ok(elem)
    }

    pub fn get_param(&self, rel_path: &str) -> Result<&Parameter, Error> {
        self.get(rel_path)?.as_param()
    }

    pub fn get_map(&self, rel_path: &str) -> Result<&ParameterMap, Error> {
        self.get(rel_path)?.as_map()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterTree {
    Node(ParameterMap),
    Leaf(Parameter),
}

impl Default for ParameterTree {
    fn default() -> Self {
        ParameterTree::Node(ParameterMap::default())
    }
}

impl ParameterTree {
    fn as_param(&self) -> Result<&Parameter, Error> {
        match self {
            Self::Leaf(p) => Ok(p),
            Self::Node(m) => Err(Error::NotAParameter {
                path: m.path.clone(),
            }),
        }
    }

    fn as_map(&self) -> Result<&ParameterMap, Error> {
        match self {
            Self::Node(m) => Ok(m),
            Self::Leaf(p) => Err(Error::NotAMap {
                path: p.path.clone(),
            }),
        }
    }
}

pub fn parse_string(toml_str: String) -> Result<ParameterMap, Error> {
    let table = toml::from_str::<Table>(toml_str.as_str())?;

    parse_table_recursive(table, "".to_string())
}

fn parse_table_recursive(table: Table, root: String) -> Result<ParameterMap, Error> {
    let mut nodes = BTreeMap::new();

    for (key, val) in table.into_iter() {
        let path = append_path(root.as_str(), key.as_str());
        match val {
            Value::Table(val) => {
                if let Ok(value) = val.clone().try_into::<ParameterValue>() {
                    let param = Parameter { path, value };
                    nodes.insert(key, ParameterTree::Leaf(param));
                } else {
                    nodes.insert(key, ParameterTree::Node(parse_table_recursive(val, path)?));
                }
            }
            _ => {
                return Err(Error::BadToml(root));
            }
        }
    }

    Ok(ParameterMap {
        path: root.clone(),
        map: nodes,
    })
}

fn append_path(root: &str, key: &str) -> String {
    format!("{root}.{key}")
}

#[cfg(test)]
mod tests {
    use core::f64;

    use pretty_assertions::assert_eq;
    use toml::Value;

    use super::*;

    #[test]
    fn test_empty() {
        let str = "".to_string();
        assert_eq!(parse_string(str), Ok(ParameterMap::default()))
    }

    fn test_type(
        expected: Vec<(toml::Value, ParameterValue)>,
        good_value: toml::Value,
        good_type: &str,
        bad_values: Vec<toml::Value>,
        bad_type: &str,
    ) {
        for (val, expected) in expected {
            let str = format!("val = {{ val = {val}, type = \"{good_type}\" }}");
            assert_eq!(
                parse_string(str),
                Ok(ParameterMap {
                    path: "".to_string(),
                    map: BTreeMap::from_iter(vec![(
                        "val".to_string(),
                        ParameterTree::Leaf(Parameter {
                            path: ".val".to_string(),
                            value: expected
                        })
                    )])
                })
            );
        }
        let str = format!("val = {{ val = {good_value}, type = \"badtype\" }}");
        assert_eq!(parse_string(str), Err(Error::BadToml(".val".to_string())));

        let str = format!("val = {{ val = {good_value}, type = \"{bad_type}\" }}",);
        assert_eq!(parse_string(str), Err(Error::BadToml(".val".to_string())));

        for bad_value in bad_values {
            let str = format!("val = {{ val = {bad_value}, type = \"{good_type}\" }}");
            assert_eq!(parse_string(str), Err(Error::BadToml(".val".to_string())));
        }
    }

    #[test]
    fn test_bool() {
        test_type(
            vec![
                (Value::Boolean(true), ParameterValue::Bool { val: true }),
                (Value::Boolean(false), ParameterValue::Bool { val: false }),
            ],
            Value::Boolean(false),
            "bool",
            vec![Value::Float(1.0), Value::Integer(1)],
            "float",
        );
    }

    #[test]
    fn test_int() {
        test_type(
            vec![
                (Value::Integer(-1), ParameterValue::Int { val: -1 }),
                (Value::Integer(1), ParameterValue::Int { val: 1 }),
                (Value::Integer(2), ParameterValue::Int { val: 2 }),
            ],
            Value::Integer(1),
            "int",
            vec![
                Value::Float(1.0),
                Value::Boolean(true),
                Value::String("hello".to_string()),
            ],
            "bool",
        );
    }

    #[test]
    fn test_float() {
        test_type(
            vec![
                (
                    Value::Float(f64::INFINITY),
                    ParameterValue::Float { val: f64::INFINITY },
                ),
                (Value::Float(-1.0), ParameterValue::Float { val: -1.0 }),
                (Value::Integer(1), ParameterValue::Float { val: 1.0 }),
                (Value::Float(1.0), ParameterValue::Float { val: 1.0 }),
                (Value::Float(2.0), ParameterValue::Float { val: 2.0 }),
            ],
            Value::Float(1.0),
            "float",
            vec![Value::Boolean(true), Value::String("hello".to_string())],
            "bool",
        );
    }

    #[test]
    fn test_good_structure() {
        let str = "hello_float = { val = 1.23, type = \"float\" }
        hello_int = { val = 1, type = \"int\" }
        hello_bool = { val = true, type = \"bool\" }

        [nested]
        hello_int = { val = 1, type = \"int\" }

        [nested.double]
        hello_bool = { val = true, type = \"bool\" }
        ";

        let parsed = parse_string(str.to_string());

        let expected = ParameterMap {
            path: "".to_string(),
            map: BTreeMap::from_iter(vec![
                (
                    "hello_float".to_string(),
                    ParameterTree::Leaf(Parameter {
                        path: ".hello_float".to_string(),
                        value: ParameterValue::Float { val: 1.23 },
                    }),
                ),
                (
                    "hello_int".to_string(),
                    ParameterTree::Leaf(Parameter {
                        path: ".hello_int".to_string(),
                        value: ParameterValue::Int { val: 1 },
                    }),
                ),
                (
                    "hello_bool".to_string(),
                    ParameterTree::Leaf(Parameter {
                        path: ".hello_bool".to_string(),
                        value: ParameterValue::Bool { val: true },
                    }),
                ),
                (
                    "nested".to_string(),
                    ParameterTree::Node(ParameterMap {
                        path: ".nested".to_string(),
                        map: BTreeMap::from_iter(vec![
                            (
                                "hello_int".to_string(),
                                ParameterTree::Leaf(Parameter {
                                    path: ".nested.hello_int".to_string(),
                                    value: ParameterValue::Int { val: 1 },
                                }),
                            ),
                            (
                                "double".to_string(),
                                ParameterTree::Node(ParameterMap {
                                    path: ".nested.double".to_string(),
                                    map: BTreeMap::from_iter(vec![(
                                        "hello_bool".to_string(),
                                        ParameterTree::Leaf(Parameter {
                                            path: ".nested.double.hello_bool".to_string(),
                                            value: ParameterValue::Bool { val: true },
                                        }),
                                    )]),
                                }),
                            ),
                        ]),
                    }),
                ),
            ]),
        };

        assert_eq!(parsed, Ok(expected));
    }

    #[test]
    fn test_array_float() {
        let str = "array = { val = [ 1.0, 2.0, 3 ], type = \"float[]\" }";
        let expected = ParameterMap {
            path: "".to_string(),
            map: BTreeMap::from_iter(vec![(
                "array".to_string(),
                ParameterTree::Leaf(Parameter {
                    path: ".array".to_string(),
                    value: ParameterValue::FloatArray {
                        val: vec![1.0, 2.0, 3.0],
                    },
                }),
            )]),
        };

        assert_eq!(parse_string(str.to_string()), Ok(expected));

        let str = "array = { val = [ ], type = \"float[]\" }";
        let expected = ParameterMap {
            path: "".to_string(),
            map: BTreeMap::from_iter(vec![(
                "array".to_string(),
                ParameterTree::Leaf(Parameter {
                    path: ".array".to_string(),
                    value: ParameterValue::FloatArray { val: vec![] },
                }),
            )]),
        };

        assert_eq!(parse_string(str.to_string()), Ok(expected));

        let str = "array = { val = [ 1.0, 2.0 ], type = \"float\" }";
        assert_eq!(
            parse_string(str.to_string()),
            Err(Error::BadToml(".array".to_string()))
        );

        let str = "array = { val = [ 1.0, 2.0, \"3.0\" ], type = \"float[]\" }";
        assert_eq!(
            parse_string(str.to_string()),
            Err(Error::BadToml(".array".to_string()))
        );
    }

    #[test]
    fn test_not_found_names_path() {
        let str = "[imu]
        accelBiasSigma = { val = 1.0e-3, type = \"float\" }
        ";

        let params = parse_string(str.to_string()).unwrap();
        let imu = params.get_map("imu").unwrap();

        assert_eq!(
            imu.get_param("gyroBiasSigma"),
            Err(Error::NotFound {
                path: ".imu.gyroBiasSigma".to_string()
            })
        );

        assert_eq!(
            params.get_param("imu.accelBiasSigma.nested"),
            Err(Error::NotFound {
                path: ".imu.accelBiasSigma.nested".to_string()
            })
        );
    }
}

//! Action types and action spaces

use serde::{Deserialize, Serialize};

use crate::error::{EnvError, Result};

/// An action to execute in the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Discrete action index
    Discrete(i64),
    /// Continuous action vector
    Continuous(Vec<f64>),
}

/// Description of an action space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum ActionSpace {
    /// Discrete action space
    Discrete {
        /// Number of discrete actions
        n: usize,
        /// Optional action names
        #[serde(skip_serializing_if = "Option::is_none")]
        names: Option<Vec<String>>,
    },
    /// Continuous action space (Box)
    Continuous {
        /// Action vector shape
        shape: Vec<usize>,
        /// Lower bounds
        low: Vec<f64>,
        /// Upper bounds
        high: Vec<f64>,
    },
}

impl ActionSpace {
    /// Number of actions for discrete spaces, vector length for continuous ones
    pub fn num_actions(&self) -> usize {
        match self {
            ActionSpace::Discrete { n, .. } => *n,
            ActionSpace::Continuous { shape, .. } => shape.iter().product(),
        }
    }

    /// Check that an action has the encoding and arity this space declares.
    ///
    /// A mismatch is reported as [`EnvError::ActionArity`], which the host
    /// treats as fatal.
    pub fn validate(&self, action: &Action) -> Result<()> {
        match (self, action) {
            (ActionSpace::Discrete { n, .. }, Action::Discrete(index)) => {
                if *index < 0 || *index as usize >= *n {
                    return Err(EnvError::ActionArity {
                        expected: format!("index in 0..{}", n),
                        got: index.to_string(),
                    });
                }
                Ok(())
            }
            (ActionSpace::Continuous { .. }, Action::Continuous(values)) => {
                let expected = self.num_actions();
                if values.len() != expected {
                    return Err(EnvError::ActionArity {
                        expected: format!("{} continuous values", expected),
                        got: format!("{} values", values.len()),
                    });
                }
                Ok(())
            }
            (ActionSpace::Discrete { n, .. }, Action::Continuous(values)) => {
                Err(EnvError::ActionArity {
                    expected: format!("discrete index in 0..{}", n),
                    got: format!("vector of {} values", values.len()),
                })
            }
            (ActionSpace::Continuous { .. }, Action::Discrete(index)) => {
                Err(EnvError::ActionArity {
                    expected: format!("{} continuous values", self.num_actions()),
                    got: format!("discrete index {}", index),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_vector_space() -> ActionSpace {
        ActionSpace::Continuous {
            shape: vec![4],
            low: vec![-2.0, -2.0, -2.0, -1.0],
            high: vec![2.0, 2.0, 2.0, 1.0],
        }
    }

    #[test]
    fn test_untagged_action_encoding() {
        let discrete: Action = serde_json::from_str("2").unwrap();
        assert_eq!(discrete, Action::Discrete(2));

        let continuous: Action = serde_json::from_str("[0.5, -1, 0, 0.25]").unwrap();
        assert_eq!(continuous, Action::Continuous(vec![0.5, -1.0, 0.0, 0.25]));
    }

    #[test]
    fn test_action_space_tagged_format() {
        let space = ActionSpace::Discrete {
            n: 3,
            names: Some(vec!["Up".into(), "Down".into(), "Stay".into()]),
        };
        let json = serde_json::to_string(&space).unwrap();
        assert!(json.contains("\"Type\":\"Discrete\""), "got {}", json);
    }

    #[test]
    fn test_validate_discrete_range() {
        let space = ActionSpace::Discrete { n: 3, names: None };
        assert!(space.validate(&Action::Discrete(0)).is_ok());
        assert!(space.validate(&Action::Discrete(2)).is_ok());
        assert!(matches!(
            space.validate(&Action::Discrete(3)),
            Err(EnvError::ActionArity { .. })
        ));
        assert!(matches!(
            space.validate(&Action::Discrete(-1)),
            Err(EnvError::ActionArity { .. })
        ));
    }

    #[test]
    fn test_validate_continuous_arity() {
        let space = quad_vector_space();
        assert_eq!(space.num_actions(), 4);
        assert!(space.validate(&Action::Continuous(vec![0.0; 4])).is_ok());

        let err = space.validate(&Action::Continuous(vec![0.0; 3])).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("3 values"));
    }

    #[test]
    fn test_validate_encoding_mismatch() {
        let space = quad_vector_space();
        assert!(matches!(
            space.validate(&Action::Discrete(1)),
            Err(EnvError::ActionArity { .. })
        ));
    }
}

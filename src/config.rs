use serde::{Deserialize, Serialize};

use crate::slack::{Method, ParseMethodError};

/// Knobs of the slack machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Methods to run for every slack computation. With more than one,
    /// their results are cross-validated.
    pub methods: Vec<Method>,
    /// Narrow the search interval with the results of the next
    /// higher-priority task and with the bounds of `Fixed3`/`Fixed15`.
    pub shortcuts: bool,
    /// Slack values closer than this are considered equal; running slack
    /// this close to zero is clamped to zero.
    pub tolerance: f64,
    /// Step past a release at which a fixed-point search stalled.
    pub nudge: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            methods: vec![Method::Fixed2],
            shortcuts: true,
            tolerance: 1e-5,
            nudge: 5e-7,
        }
    }
}

impl Config {
    pub fn with_methods(methods: impl IntoIterator<Item = Method>) -> Self {
        Config {
            methods: methods.into_iter().collect(),
            ..Config::default()
        }
    }

    pub fn without_shortcuts(self) -> Self {
        Config {
            shortcuts: false,
            ..self
        }
    }
}

/// Parse a comma-separated list of method names such as
/// `"Fixed2,Fast2,Het"`.
pub fn parse_methods(list: &str) -> Result<Vec<Method>, ParseMethodError> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse::<Method>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.methods, vec![Method::Fixed2]);
        assert!(config.shortcuts);
        assert_eq!(config.tolerance, 1e-5);
        assert_eq!(config.nudge, 5e-7);
    }

    #[test]
    fn method_lists() {
        assert_eq!(
            parse_methods("Fixed2, Fast2,SlackHet,"),
            Ok(vec![Method::Fixed2, Method::Fast2, Method::Het])
        );
        assert_eq!(
            parse_methods("Fixed2,Slow"),
            Err(ParseMethodError("Slow".to_string()))
        );
        assert_eq!(parse_methods(""), Ok(vec![]));
    }

    #[test]
    fn from_yaml() {
        let config: Config = serde_yaml::from_str(
            "methods: [Fixed, Davis, SlackHet]\n\
             shortcuts: false\n",
        )
        .unwrap();
        assert_eq!(
            config.methods,
            vec![Method::Fixed, Method::Davis, Method::Het]
        );
        assert!(!config.shortcuts);
        assert_eq!(config.tolerance, 1e-5);

        let config: Config = serde_yaml::from_str("tolerance: 0.001").unwrap();
        assert_eq!(config, Config {
            tolerance: 0.001,
            ..Config::default()
        });

        assert!(serde_yaml::from_str::<Config>("methods: [Slow]").is_err());
    }
}

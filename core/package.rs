/*!
 * Model package - the JSON document an external controller sends to
 * reconfigure one or more regions' active models.
 *
 * Schema (bit-exact, for cross-language compatibility with the
 * original controller):
 *
 * ```json
 * {
 *   "driver":       { "format": "int", "rules": "<expr>" },
 *   "type":         { "index": <int>, "name": "<Random|RoundRobin|Sequential|Static|DecisionTree>" },
 *   "region_names": ["<name>", "__ANY_REGION__"?],
 *   "features":     { "count": <int>, "names": ["<name>", ...] },
 *   "policy":       <int>,     // present iff type.name == "Static"
 *   "seed":         <int>,     // optional, Random only
 *   "tree":         <object>   // present iff type.name == "DecisionTree"
 * }
 * ```
 */

use serde::Deserialize;

/// Sentinel region name meaning "every region not explicitly named".
pub const ANY_REGION: &str = "__ANY_REGION__";

#[derive(Debug, Clone, Deserialize)]
pub struct Driver {
    pub format: String,
    pub rules: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelType {
    pub index: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureSpec {
    pub count: usize,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelPackage {
    pub driver: Driver,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub region_names: Vec<String>,
    pub features: FeatureSpec,
    #[serde(default)]
    pub policy: Option<i64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub tree: Option<serde_json::Value>,
}

impl ModelPackage {
    /// Whether this package targets `region_name`, either by exact
    /// name or via the `__ANY_REGION__` wildcard.
    pub fn applies_to(&self, region_name: &str) -> bool {
        self.region_names
            .iter()
            .any(|n| n == ANY_REGION || n == region_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_package(region_names: Vec<&str>) -> ModelPackage {
        ModelPackage {
            driver: Driver {
                format: "int".to_string(),
                rules: "0".to_string(),
            },
            model_type: ModelType {
                index: 3,
                name: "Static".to_string(),
            },
            region_names: region_names.into_iter().map(str::to_string).collect(),
            features: FeatureSpec {
                count: 0,
                names: vec![],
            },
            policy: Some(1),
            seed: None,
            tree: None,
        }
    }

    #[test]
    fn wildcard_applies_to_any_region() {
        let pkg = static_package(vec![ANY_REGION]);
        assert!(pkg.applies_to("A"));
        assert!(pkg.applies_to("whatever"));
    }

    #[test]
    fn targeted_package_applies_only_to_named_region() {
        let pkg = static_package(vec!["B"]);
        assert!(pkg.applies_to("B"));
        assert!(!pkg.applies_to("A"));
    }

    #[test]
    fn deserializes_from_wire_json() {
        let json = r#"
        {
          "driver": { "format": "int", "rules": "0" },
          "type": { "index": 3, "name": "Static" },
          "region_names": ["loop1"],
          "features": { "count": 0, "names": [] },
          "policy": 2
        }"#;
        let pkg: ModelPackage = serde_json::from_str(json).unwrap();
        assert_eq!(pkg.model_type.name, "Static");
        assert_eq!(pkg.policy, Some(2));
    }
}

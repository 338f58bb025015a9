use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One record from the rules API. Every field is optional; values with an unexpected
/// JSON type are read as absent instead of failing the whole dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEntity {
    #[serde(default, deserialize_with = "lenient::text")]
    pub slug: Option<String>,

    #[serde(default)]
    pub id: Option<FeatureId>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub short_description: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub main_body: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub type_slug: Option<String>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub features: Vec<SubFeature>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub foundation_features: Vec<SubFeature>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub specialization_features: Vec<SubFeature>,

    #[serde(default, deserialize_with = "lenient::list")]
    pub mastery_features: Vec<SubFeature>,

    #[serde(default, deserialize_with = "lenient::text_list")]
    pub class_items: Vec<String>,

    #[serde(default, deserialize_with = "lenient::text_list")]
    pub background_questions: Vec<String>,

    #[serde(default, deserialize_with = "lenient::text_list")]
    pub connection_questions: Vec<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub motives: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub weapon_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub experiences: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub impulses: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub advantages: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub examples: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub potential_adversaries: Option<String>,
}

impl SourceEntity {
    /// Identity shared by both language variants: the slug, else the stringified id.
    pub fn source_key(&self) -> Option<String> {
        match self.slug.as_deref() {
            Some(slug) if !slug.is_empty() => Some(slug.to_string()),
            _ => self.id.as_ref().map(FeatureId::to_string),
        }
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn main_body_or_empty(&self) -> &str {
        self.main_body.as_deref().unwrap_or("")
    }

    pub fn features_of(&self, list: FeatureList) -> &[SubFeature] {
        match list {
            FeatureList::Features => &self.features,
            FeatureList::Foundation => &self.foundation_features,
            FeatureList::Specialization => &self.specialization_features,
            FeatureList::Mastery => &self.mastery_features,
        }
    }

    pub fn text(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::Description => self.description.as_deref(),
            TextField::ShortDescription => self.short_description.as_deref(),
            TextField::MainBody => self.main_body.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Description,
    ShortDescription,
    MainBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureList {
    Features,
    Foundation,
    Specialization,
    Mastery,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubFeature {
    #[serde(default)]
    pub id: Option<FeatureId>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient::text")]
    pub main_body: Option<String>,
}

impl SubFeature {
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn main_body_or_empty(&self) -> &str {
        self.main_body.as_deref().unwrap_or("")
    }
}

/// Feature ids are numeric in the API, but a few packs ship them as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    Text(String),
}

impl FeatureId {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            FeatureId::Number(n) => Some(*n),
            FeatureId::Text(s) => s.parse().ok(),
        }
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceEnvelope {
    #[serde(deserialize_with = "lenient::list")]
    pub data: Vec<SourceEntity>,
}

/// Both language variants of one endpoint.
#[derive(Debug, Clone, Default)]
pub struct Bilingual {
    pub en: Vec<SourceEntity>,
    pub ru: Vec<SourceEntity>,
}

/// Every dataset one sync run works from.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub classes: Bilingual,
    pub subclasses: Bilingual,
    pub ancestries: Bilingual,
    pub communities: Bilingual,
    pub domains: Bilingual,
    pub equipment: Bilingual,
    pub beastforms: Bilingual,
    pub transformations: Bilingual,
    pub adversaries: Bilingual,
    pub environments: Bilingual,
    pub rules: Bilingual,
}

mod lenient {
    use super::*;

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_nulls_and_missing_lists() {
        let json = r#"{"data":[
            {"slug":"bard","name":"Bard","features":null,"class_items":["Torch",null]},
            {"id":147,"name":null,"main_body":"- a\n- b"}
        ]}"#;
        let env: SourceEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.data.len(), 2);
        assert!(env.data[0].features.is_empty());
        assert_eq!(env.data[0].class_items, vec!["Torch".to_string()]);
        assert_eq!(env.data[1].source_key().as_deref(), Some("147"));
        assert_eq!(env.data[1].name_or_empty(), "");
    }

    #[test]
    fn feature_ids_accept_numbers_and_strings() {
        let f: SubFeature = serde_json::from_str(r#"{"id":"159","name":"x"}"#).unwrap();
        assert_eq!(f.id.as_ref().and_then(FeatureId::as_number), Some(159));
        let f: SubFeature = serde_json::from_str(r#"{"id":160}"#).unwrap();
        assert_eq!(f.id, Some(FeatureId::Number(160)));
    }
}

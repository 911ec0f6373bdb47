//! Document schemas for the remote dataset.
//!
//! Unknown fields are kept in `extra` so a document survives a
//! decode/persist cycle without losing data the generator added.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

use crate::error::{SyncError, SyncResult};

/// A document that can be fetched, validated, and cached.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync {
  /// Document kind for log and error messages.
  const KIND: &'static str;

  /// Check required fields. A document failing validation is never trusted.
  fn validate(self) -> SyncResult<Self>;

  /// Decode and validate a JSON value.
  fn from_value(value: Value) -> SyncResult<Self> {
    serde_json::from_value::<Self>(value)
      .map_err(|e| SyncError::Decode(format!("invalid {}: {}", Self::KIND, e)))?
      .validate()
  }
}

// ============================================================================
// Manifest
// ============================================================================

/// Current dataset version and the newest recipe ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub latest_ids: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recipe_count: Option<u64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Document for Manifest {
  const KIND: &'static str = "manifest";

  fn validate(self) -> SyncResult<Self> {
    if self.version.trim().is_empty() {
      return Err(SyncError::Decode("manifest has no version".to_string()));
    }
    Ok(self)
  }
}

// ============================================================================
// Index
// ============================================================================

/// Lightweight per-recipe entry of the browsing index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_image: Option<String>,
  #[serde(default)]
  pub min_age_month: u32,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub time_cost: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub publish_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_name: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// The full browsing list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
  pub items: Vec<RecipeSummary>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Document for IndexDocument {
  const KIND: &'static str = "recipe index";

  /// Drops entries without an id and later duplicates of an id.
  fn validate(mut self) -> SyncResult<Self> {
    let mut seen = HashSet::new();
    let before = self.items.len();
    self
      .items
      .retain(|item| !item.id.is_empty() && seen.insert(item.id.clone()));

    let dropped = before - self.items.len();
    if dropped > 0 {
      warn!(dropped, "dropped index entries with missing or duplicate ids");
    }
    Ok(self)
  }
}

// ============================================================================
// Recipe detail
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub amount: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub step_index: Option<u32>,
  #[serde(default)]
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub img: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Full recipe document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover_image: Option<String>,
  #[serde(default)]
  pub min_age_month: u32,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difficulty: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub time_cost: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nutrition_tip: Option<String>,
  #[serde(default)]
  pub ingredients: Vec<Ingredient>,
  #[serde(default)]
  pub steps: Vec<Step>,
  #[serde(default)]
  pub warnings: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub publish_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub origin_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_name: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Document for RecipeDetail {
  const KIND: &'static str = "recipe";

  fn validate(self) -> SyncResult<Self> {
    if self.id.is_empty() {
      return Err(SyncError::Decode("recipe has no id".to_string()));
    }
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_manifest_requires_version() {
    let err = Manifest::from_value(json!({ "latest_ids": ["a"] })).unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)));

    let err = Manifest::from_value(json!({ "version": "  " })).unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)));

    let manifest = Manifest::from_value(json!({ "version": "v1" })).unwrap();
    assert!(manifest.latest_ids.is_empty());
  }

  #[test]
  fn test_index_requires_items() {
    assert!(IndexDocument::from_value(json!({ "version": "v1" })).is_err());

    let index = IndexDocument::from_value(json!({ "items": [] })).unwrap();
    assert!(index.items.is_empty());
  }

  #[test]
  fn test_index_drops_duplicate_ids_keeping_first() {
    let index = IndexDocument::from_value(json!({
      "items": [
        { "id": "a", "title": "first" },
        { "id": "b", "title": "other" },
        { "id": "a", "title": "second" },
        { "id": "", "title": "nameless" }
      ]
    }))
    .unwrap();

    let titles: Vec<_> = index.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "other"]);
  }

  #[test]
  fn test_index_drops_entries_without_id_key() {
    let index = IndexDocument::from_value(json!({
      "items": [{ "id": "a" }, { "title": "nameless" }]
    }))
    .unwrap();

    assert_eq!(index.items.len(), 1);
    assert_eq!(index.items[0].id, "a");
  }

  #[test]
  fn test_recipe_requires_id() {
    assert!(RecipeDetail::from_value(json!({ "title": "x" })).is_err());
    assert!(RecipeDetail::from_value(json!({ "id": "", "title": "x" })).is_err());
  }

  #[test]
  fn test_unknown_fields_survive_reserialization() {
    let raw = json!({
      "id": "r1",
      "title": "Pumpkin",
      "steps": [{ "step_index": 1, "text": "Steam", "img": null, "duration": 15 }],
      "_translation": { "dest": "zh-CN", "translated": true }
    });

    let detail = RecipeDetail::from_value(raw).unwrap();
    assert_eq!(detail.steps[0].img, None);
    assert_eq!(detail.steps[0].extra["duration"], 15);

    let back = serde_json::to_value(&detail).unwrap();
    assert_eq!(back["_translation"]["translated"], true);
    assert_eq!(back["steps"][0]["duration"], 15);
  }
}

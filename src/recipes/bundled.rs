//! Offline dataset shipped with the client.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

use super::types::{Document, IndexDocument, Manifest, RecipeDetail};

const SEED_MANIFEST: &str = include_str!("../../data/seed/manifest.json");
const SEED_INDEX: &str = include_str!("../../data/seed/recipes_index.json");
const SEED_RECIPES: &[&str] = &[include_str!(
  "../../data/seed/recipes/demo_pumpkin_potato.json"
)];

pub const MANIFEST_FILE: &str = "manifest.json";
pub const INDEX_FILE: &str = "recipes_index.json";
pub const RECIPES_DIR: &str = "recipes";

/// Last-resort documents, used only when both network and cache fail.
#[derive(Debug, Clone, Default)]
pub struct BundledDataset {
  pub manifest: Option<Manifest>,
  pub index: Option<IndexDocument>,
  recipes: HashMap<String, RecipeDetail>,
}

impl BundledDataset {
  /// A dataset with nothing in it.
  pub fn empty() -> Self {
    Self::default()
  }

  /// The seed dataset compiled into the binary.
  pub fn embedded() -> SyncResult<Self> {
    let mut dataset = Self {
      manifest: Some(parse::<Manifest>(SEED_MANIFEST)?),
      index: Some(parse::<IndexDocument>(SEED_INDEX)?),
      recipes: HashMap::new(),
    };
    for raw in SEED_RECIPES {
      dataset.insert_recipe(parse::<RecipeDetail>(raw)?);
    }
    Ok(dataset)
  }

  /// Load a dataset laid out like the remote origin:
  /// `manifest.json`, `recipes_index.json`, and `recipes/<id>.json`.
  ///
  /// Missing files are skipped; unreadable or invalid ones are logged and skipped.
  pub fn from_dir(dir: &Path) -> SyncResult<Self> {
    if !dir.is_dir() {
      return Err(SyncError::Storage(format!(
        "bundled dataset directory not found: {}",
        dir.display()
      )));
    }

    let mut dataset = Self {
      manifest: read_optional(&dir.join(MANIFEST_FILE)),
      index: read_optional(&dir.join(INDEX_FILE)),
      recipes: HashMap::new(),
    };

    let recipes_dir = dir.join(RECIPES_DIR);
    if let Ok(entries) = std::fs::read_dir(&recipes_dir) {
      for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
          continue;
        }
        if let Some(recipe) = read_optional::<RecipeDetail>(&path) {
          dataset.insert_recipe(recipe);
        }
      }
    }

    debug!(
      dir = %dir.display(),
      recipes = dataset.recipes.len(),
      "loaded bundled dataset"
    );
    Ok(dataset)
  }

  pub fn with_manifest(mut self, manifest: Manifest) -> Self {
    self.manifest = Some(manifest);
    self
  }

  pub fn with_recipe(mut self, recipe: RecipeDetail) -> Self {
    self.insert_recipe(recipe);
    self
  }

  fn insert_recipe(&mut self, recipe: RecipeDetail) {
    self.recipes.insert(recipe.id.clone(), recipe);
  }

  pub fn recipe(&self, id: &str) -> Option<&RecipeDetail> {
    self.recipes.get(id)
  }

  pub fn recipe_count(&self) -> usize {
    self.recipes.len()
  }
}

fn parse<T: Document>(raw: &str) -> SyncResult<T> {
  T::from_value(serde_json::from_str(raw)?)
}

fn read_optional<T: Document>(path: &Path) -> Option<T> {
  let raw = match std::fs::read_to_string(path) {
    Ok(raw) => raw,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "unreadable bundled {}", T::KIND);
      return None;
    }
  };

  match parse::<T>(&raw) {
    Ok(doc) => Some(doc),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "invalid bundled {}", T::KIND);
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_embedded_seed() {
    let dataset = BundledDataset::embedded().unwrap();

    let manifest = dataset.manifest.as_ref().unwrap();
    assert_eq!(manifest.version, "seed-1");
    assert_eq!(manifest.latest_ids, vec!["demo_pumpkin_potato"]);

    assert_eq!(dataset.index.as_ref().unwrap().items.len(), 1);
    let recipe = dataset.recipe("demo_pumpkin_potato").unwrap();
    assert_eq!(recipe.steps.len(), 2);
    assert!(dataset.recipe("missing").is_none());
  }

  #[test]
  fn test_from_dir_skips_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join(MANIFEST_FILE),
      r#"{"version":"local-3","latest_ids":["a"]}"#,
    )
    .unwrap();
    std::fs::create_dir(dir.path().join(RECIPES_DIR)).unwrap();
    std::fs::write(
      dir.path().join(RECIPES_DIR).join("a.json"),
      r#"{"id":"a","title":"A"}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join(RECIPES_DIR).join("broken.json"), "{").unwrap();
    std::fs::write(dir.path().join(RECIPES_DIR).join("notes.txt"), "hi").unwrap();

    let dataset = BundledDataset::from_dir(dir.path()).unwrap();
    assert_eq!(dataset.manifest.as_ref().unwrap().version, "local-3");
    assert!(dataset.index.is_none());
    assert_eq!(dataset.recipe_count(), 1);
    assert_eq!(dataset.recipe("a").unwrap().title, "A");
  }

  #[test]
  fn test_from_dir_requires_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(BundledDataset::from_dir(&dir.path().join("nope")).is_err());
  }
}

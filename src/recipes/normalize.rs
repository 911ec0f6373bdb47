//! Media URL and tag normalization.
//!
//! Normalization is idempotent and borrows when nothing changes, so a
//! `Cow::Borrowed` result means "already canonical, no need to re-persist".

use std::borrow::Cow;
use std::collections::HashSet;
use url::Url;

use crate::remote::{directory_url, join_path};

use super::types::{IndexDocument, Manifest, RecipeDetail, RecipeSummary, Step};

/// Canonical snack tag; older datasets used several spellings.
pub const SNACK_TAG: &str = "加餐";

/// Legacy tag tokens (lowercased) and their canonical replacement.
const LEGACY_TAGS: &[(&str, &str)] = &[
  ("breakfast", "早餐"),
  ("lunch", "午餐"),
  ("dinner", "晚餐"),
  ("snack", SNACK_TAG),
  ("snacks", SNACK_TAG),
  ("小吃", SNACK_TAG),
  ("点心", SNACK_TAG),
  ("kid-friendly", "儿童友好"),
  ("30 minutes or less", "30分钟内"),
  ("vegetables", "蔬菜"),
  ("fruits", "水果"),
  ("protein", "蛋白质"),
  ("grains", "谷物"),
  ("dairy", "乳制品"),
  ("main dish", "主菜"),
  ("main dishes", "主菜"),
  ("side dish", "配菜"),
  ("side dishes", "配菜"),
  ("appetizer", "开胃菜"),
  ("dessert", "甜品"),
];

/// Map a single tag to its canonical spelling.
pub fn canonical_tag(tag: &str) -> &str {
  let trimmed = tag.trim();
  let lowered = trimmed.to_lowercase();
  LEGACY_TAGS
    .iter()
    .find(|(legacy, _)| *legacy == lowered)
    .map(|(_, canonical)| *canonical)
    .unwrap_or(trimmed)
}

/// Rewrites media paths against the remote base and canonicalizes tags.
#[derive(Debug, Clone)]
pub struct Normalizer {
  base: Url,
}

/// Schemes a media reference may already carry. Anything else is a path.
const ABSOLUTE_SCHEMES: &[&str] = &["http", "https", "data"];

fn is_absolute(path: &str) -> bool {
  Url::parse(path)
    .map(|url| ABSOLUTE_SCHEMES.contains(&url.scheme()))
    .unwrap_or(false)
}

impl Normalizer {
  pub fn new(base: Url) -> Self {
    Self {
      base: directory_url(base),
    }
  }

  /// Absolute form of a media reference, or `None` if it is already absolute
  /// (or empty, meaning "no image").
  pub fn absolute_media(&self, path: &str) -> Option<String> {
    if path.trim().is_empty() || is_absolute(path) {
      return None;
    }
    if let Some(rest) = path.strip_prefix("//") {
      return Some(format!("{}://{}", self.base.scheme(), rest));
    }
    join_path(&self.base, path).ok().map(String::from)
  }

  fn media_field(&self, field: &Option<String>) -> Option<Option<String>> {
    field
      .as_deref()
      .and_then(|path| self.absolute_media(path))
      .map(Some)
  }

  /// Canonical, de-duplicated tag list, or `None` if `tags` is already canonical.
  pub fn tags(&self, tags: &[String]) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let out: Vec<String> = tags
      .iter()
      .map(|t| canonical_tag(t))
      .filter(|t| !t.is_empty() && seen.insert(*t))
      .map(String::from)
      .collect();

    if out == tags {
      None
    } else {
      Some(out)
    }
  }
}

/// Documents the normalizer knows how to rewrite.
pub trait Normalize: Clone {
  /// Normalized form of `self`; borrowed when already canonical.
  fn normalize<'a>(&'a self, normalizer: &Normalizer) -> Cow<'a, Self>;
}

impl Normalize for Manifest {
  fn normalize<'a>(&'a self, _normalizer: &Normalizer) -> Cow<'a, Self> {
    Cow::Borrowed(self)
  }
}

impl Normalize for RecipeSummary {
  fn normalize<'a>(&'a self, normalizer: &Normalizer) -> Cow<'a, Self> {
    let cover = normalizer.media_field(&self.cover_image);
    let tags = normalizer.tags(&self.tags);
    if cover.is_none() && tags.is_none() {
      return Cow::Borrowed(self);
    }

    let mut out = self.clone();
    if let Some(cover) = cover {
      out.cover_image = cover;
    }
    if let Some(tags) = tags {
      out.tags = tags;
    }
    Cow::Owned(out)
  }
}

impl Normalize for IndexDocument {
  fn normalize<'a>(&'a self, normalizer: &Normalizer) -> Cow<'a, Self> {
    let mut items: Option<Vec<RecipeSummary>> = None;
    for (i, item) in self.items.iter().enumerate() {
      if let Cow::Owned(new) = item.normalize(normalizer) {
        items.get_or_insert_with(|| self.items.clone())[i] = new;
      }
    }

    match items {
      None => Cow::Borrowed(self),
      Some(items) => Cow::Owned(IndexDocument {
        items,
        version: self.version.clone(),
        extra: self.extra.clone(),
      }),
    }
  }
}

impl Normalize for RecipeDetail {
  fn normalize<'a>(&'a self, normalizer: &Normalizer) -> Cow<'a, Self> {
    let cover = normalizer.media_field(&self.cover_image);
    let tags = normalizer.tags(&self.tags);

    let mut steps: Option<Vec<Step>> = None;
    for (i, step) in self.steps.iter().enumerate() {
      if let Some(img) = normalizer.media_field(&step.img) {
        steps.get_or_insert_with(|| self.steps.clone())[i].img = img;
      }
    }

    if cover.is_none() && tags.is_none() && steps.is_none() {
      return Cow::Borrowed(self);
    }

    let mut out = self.clone();
    if let Some(cover) = cover {
      out.cover_image = cover;
    }
    if let Some(tags) = tags {
      out.tags = tags;
    }
    if let Some(steps) = steps {
      out.steps = steps;
    }
    Cow::Owned(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::recipes::types::Document;
  use serde_json::json;

  fn normalizer() -> Normalizer {
    Normalizer::new(Url::parse("https://cdn.example.com/data").unwrap())
  }

  fn legacy_detail() -> RecipeDetail {
    RecipeDetail::from_value(json!({
      "id": "r1",
      "title": "Pumpkin mash",
      "cover_image": "images/abc.webp",
      "tags": ["Breakfast", "小吃", "加餐", " 补锌 ", "breakfast", ""],
      "steps": [
        { "step_index": 1, "text": "Steam", "img": "/images/s1.webp" },
        { "step_index": 2, "text": "Blend", "img": "" },
        { "step_index": 3, "text": "Serve", "img": "https://other.example.com/s3.png" }
      ]
    }))
    .unwrap()
  }

  #[test]
  fn test_canonical_tag_mapping() {
    assert_eq!(canonical_tag("Breakfast"), "早餐");
    assert_eq!(canonical_tag("DINNER"), "晚餐");
    assert_eq!(canonical_tag("小吃"), SNACK_TAG);
    assert_eq!(canonical_tag("  补锌 "), "补锌");
    assert_eq!(canonical_tag("6m+"), "6m+");
  }

  #[test]
  fn test_canonical_tags_are_fixed_points() {
    for (_, canonical) in LEGACY_TAGS {
      assert_eq!(canonical_tag(canonical), *canonical);
    }
  }

  #[test]
  fn test_absolute_media() {
    let n = normalizer();
    assert_eq!(
      n.absolute_media("images/a.webp").as_deref(),
      Some("https://cdn.example.com/data/images/a.webp")
    );
    assert_eq!(
      n.absolute_media("//img.example.com/a.png").as_deref(),
      Some("https://img.example.com/a.png")
    );
    assert_eq!(n.absolute_media("https://x.example.com/a.png"), None);
    assert_eq!(n.absolute_media(""), None);
  }

  #[test]
  fn test_scheme_like_path_is_joined() {
    let n = normalizer();
    let joined = n.absolute_media("localhost:8080/a.png");
    assert_eq!(
      joined.as_deref(),
      Some("https://cdn.example.com/data/localhost:8080/a.png")
    );
    assert_eq!(n.absolute_media(joined.as_deref().unwrap()), None);
    assert_eq!(n.absolute_media("data:image/png;base64,AAAA"), None);
  }

  #[test]
  fn test_detail_normalization() {
    let detail = legacy_detail();
    let normalized = detail.normalize(&normalizer()).into_owned();

    assert_eq!(
      normalized.cover_image.as_deref(),
      Some("https://cdn.example.com/data/images/abc.webp")
    );
    assert_eq!(normalized.tags, vec!["早餐", SNACK_TAG, "补锌"]);
    assert_eq!(
      normalized.steps[0].img.as_deref(),
      Some("https://cdn.example.com/data/images/s1.webp")
    );
    assert_eq!(normalized.steps[1].img.as_deref(), Some(""));
    assert_eq!(
      normalized.steps[2].img.as_deref(),
      Some("https://other.example.com/s3.png")
    );
  }

  #[test]
  fn test_normalize_is_idempotent() {
    let n = normalizer();
    let once = legacy_detail().normalize(&n).into_owned();
    let twice = once.normalize(&n);

    assert!(matches!(twice, Cow::Borrowed(_)));
    assert_eq!(*twice, once);
  }

  #[test]
  fn test_canonical_document_is_borrowed() {
    let index = IndexDocument::from_value(json!({
      "items": [{
        "id": "r1",
        "title": "Pumpkin mash",
        "cover_image": "https://cdn.example.com/data/images/abc.webp",
        "tags": ["6m+", "早餐"]
      }]
    }))
    .unwrap();

    match index.normalize(&normalizer()) {
      Cow::Borrowed(same) => assert!(std::ptr::eq(same, &index)),
      Cow::Owned(_) => panic!("canonical index should not be rewritten"),
    }
  }

  #[test]
  fn test_index_rewrites_only_changed_items() {
    let index = IndexDocument::from_value(json!({
      "version": "v1",
      "items": [
        { "id": "a", "cover_image": "https://cdn.example.com/a.png", "tags": ["早餐"] },
        { "id": "b", "cover_image": "images/b.png", "tags": ["Lunch"] }
      ]
    }))
    .unwrap();

    let normalized = index.normalize(&normalizer()).into_owned();
    assert_eq!(normalized.items[0], index.items[0]);
    assert_eq!(normalized.items[1].tags, vec!["午餐"]);
    assert_eq!(normalized.version.as_deref(), Some("v1"));
  }
}

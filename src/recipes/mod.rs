//! Recipe dataset documents and the offline-first client that reads them.

mod bundled;
mod client;
mod normalize;
mod types;

pub use bundled::BundledDataset;
pub use client::{RecipeSync, UpdateStatus};
pub use normalize::{canonical_tag, Normalize, Normalizer, SNACK_TAG};
pub use types::{Document, IndexDocument, Ingredient, Manifest, RecipeDetail, RecipeSummary, Step};

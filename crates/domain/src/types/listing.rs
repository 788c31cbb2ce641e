//! List envelopes
//!
//! Collection endpoints do not agree on a shape: some answer with a bare
//! array, others wrap it as `{ "items": [...] }` or `{ "orders": [...] }`.
//! [`ListEnvelope`] decodes all three explicitly at the domain-call boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Items { items: Vec<T> },
    Orders { orders: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Items { items } | Self::Orders { orders: items } => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bare(items) | Self::Items { items } | Self::Orders { orders: items } => {
                items.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ListEnvelope<T> {
    fn default() -> Self {
        Self::Bare(Vec::new())
    }
}

/// Decode any of the supported list shapes. `null` decodes to an empty list.
///
/// # Errors
/// Returns the serde error when the value matches none of the shapes.
pub fn decode_list<T>(value: Value) -> Result<Vec<T>, serde_json::Error>
where
    T: serde::de::DeserializeOwned,
{
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value::<ListEnvelope<T>>(value).map(ListEnvelope::into_vec)
}

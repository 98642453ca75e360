//! Feature-flag gating declarations.
//!
//! The flag store itself lives outside this crate. Callers hand in a
//! `FlagSnapshot`; extensions only carry the flag names they depend on.

use crate::extension::model::Extension;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Flag names an extension requires or disallows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionFlags {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub disallowed: Vec<String>,
}

impl ExtensionFlags {
    pub fn new<R, D>(required: R, disallowed: D) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            disallowed: disallowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Removes duplicate names, keeping the first occurrence of each.
    pub fn sanitized(mut self) -> Self {
        dedup_in_order(&mut self.required);
        dedup_in_order(&mut self.disallowed);
        self
    }

    /// Returns `true` when every required flag is on and every disallowed
    /// flag is explicitly off.
    ///
    /// A disallowed flag missing from the snapshot keeps the extension gated,
    /// since its state is not known yet.
    pub fn is_in_use(&self, flags: &FlagSnapshot) -> bool {
        self.required.iter().all(|name| flags.get(name) == Some(true))
            && self
                .disallowed
                .iter()
                .all(|name| flags.get(name) == Some(false))
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.disallowed.is_empty()
    }
}

fn dedup_in_order(values: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    values.retain(|value| seen.insert(value.clone()));
}

/// Point-in-time view of the external feature-flag store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSnapshot {
    values: BTreeMap<String, bool>,
}

impl FlagSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, enabled: bool) {
        self.values.insert(name.into(), enabled);
    }

    pub fn with(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.set(name, enabled);
        self
    }

    /// `None` means the flag has not been resolved by the store yet.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for FlagSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, enabled)| (name.into(), enabled))
                .collect(),
        }
    }
}

/// Unique flag names the given extensions are gated on.
///
/// Required names come first, then disallowed names, each in first-seen order.
pub fn gating_flag_names<'a, I>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Extension>,
{
    let extensions: Vec<&Extension> = extensions.into_iter().collect();
    let mut names: Vec<String> = extensions
        .iter()
        .flat_map(|extension| extension.flags().required.iter().cloned())
        .chain(
            extensions
                .iter()
                .flat_map(|extension| extension.flags().disallowed.iter().cloned()),
        )
        .collect();
    dedup_in_order(&mut names);
    names
}

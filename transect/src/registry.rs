use crate::{Profile, TransectError};
use log::info;
use std::collections::HashMap;

/// Profiles of a session, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    profiles: Vec<Profile>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `profile` under its label.
    ///
    /// A label already present is a caller bug and is refused.
    pub fn register(&mut self, profile: Profile) -> Result<&mut Profile, TransectError> {
        if self.index.contains_key(&profile.label) {
            return Err(TransectError::DuplicateLabel(profile.label));
        }
        info!(
            "registered profile {}; samples: {}, length_2d: {:.2}, length_3d: {:.2}",
            profile.label,
            profile.samples.len(),
            profile.length_2d,
            profile.length_3d
        );
        let idx = self.profiles.len();
        self.index.insert(profile.label.clone(), idx);
        self.profiles.push(profile);
        Ok(&mut self.profiles[idx])
    }

    pub fn get(&self, label: &str) -> Option<&Profile> {
        self.index.get(label).map(|&idx| &self.profiles[idx])
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Profile> {
        self.index.get(label).map(|&idx| &mut self.profiles[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.label.as_str())
    }

    /// Profiles not rendered yet, in discovery order.
    pub fn pending(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter().filter(|p| !p.is_rendered())
    }

    /// Serializes every profile, in discovery order, as a JSON array.
    pub fn to_json(&self) -> Result<String, TransectError> {
        Ok(serde_json::to_string_pretty(&self.profiles)?)
    }
}

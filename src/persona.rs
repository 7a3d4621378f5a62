//! Persona context and the persona catalog
//!
//! A [`Persona`] describes the AI agent a session chats with. Its public
//! fields (name, handle, bio, badge, avatar) are sent with every request so
//! the endpoint can role-play the persona. Voice settings are kept alongside
//! for renderers that speak replies, but never go on the wire.
//!
//! Personas are read from a YAML catalog:
//!
//! ```yaml
//! personas:
//!   - name: Nova
//!     handle: nova
//!     bio: Astrophysicist who explains the sky
//!     badge: verified
//!     avatar: https://cdn.example.com/nova.png
//!     voice:
//!       voice_id: nova-1
//!       speed: 1.1
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cache::LoadOnce;
use crate::error::{PersonaChatError, Result};

/// Public persona context sent with each chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name
    pub name: String,
    /// Unique handle, sent to the endpoint as written
    pub handle: String,
    /// Short biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Badge label (e.g. "verified")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Text-to-speech settings; local only
    #[serde(default, skip_serializing)]
    pub voice: Option<VoiceConfig>,
}

impl Persona {
    /// Creates a persona with only a name and handle
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            bio: None,
            badge: None,
            avatar: None,
            voice: None,
        }
    }

    /// Handle prefixed with exactly one `@`
    pub fn display_handle(&self) -> String {
        format!("@{}", self.handle.trim().trim_start_matches('@'))
    }

    /// Whether `handle` names this persona, ignoring case and a leading `@`
    pub fn matches_handle(&self, handle: &str) -> bool {
        normalize_handle(&self.handle) == normalize_handle(handle)
    }
}

/// Voice settings for a persona
///
/// Every recognized key is declared; unknown keys in the catalog are
/// rejected instead of being carried along untyped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Provider-specific voice identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    /// Speech provider name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Playback speed multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// Voice stability (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f32>,
    /// Similarity boost (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f32>,
    /// Style exaggeration (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    personas: Vec<Persona>,
}

/// Personas available to chat with
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Builds a catalog from personas already in memory
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    /// Parses a catalog from YAML text
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is invalid or two personas share a handle
    ///
    /// # Examples
    ///
    /// ```
    /// use persona_chat::persona::PersonaCatalog;
    ///
    /// let catalog = PersonaCatalog::from_yaml("personas:\n  - name: Nova\n    handle: nova\n").unwrap();
    /// assert_eq!(catalog.find("@Nova").unwrap().name, "Nova");
    /// ```
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(contents)
            .map_err(PersonaChatError::Yaml)
            .context("Failed to parse persona catalog")?;
        let catalog = Self::new(file.personas);

        for (i, persona) in catalog.personas.iter().enumerate() {
            if normalize_handle(&persona.handle).is_empty() {
                return Err(
                    PersonaChatError::Persona(format!("Persona '{}' has no handle", persona.name))
                        .into(),
                );
            }
            if catalog.personas[..i]
                .iter()
                .any(|p| p.matches_handle(&persona.handle))
            {
                return Err(PersonaChatError::Persona(format!(
                    "Duplicate persona handle: {}",
                    persona.display_handle()
                ))
                .into());
            }
        }

        Ok(catalog)
    }

    /// Reads and parses a catalog file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(PersonaChatError::Io)
            .with_context(|| format!("Failed to read persona catalog {}", path.display()))?;
        let catalog = Self::from_yaml(&contents)?;
        tracing::info!(
            "Loaded {} personas from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Finds a persona by handle, ignoring case and a leading `@`
    pub fn find(&self, handle: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.matches_handle(handle))
    }

    /// Finds a persona or fails with a readable error
    pub fn require(&self, handle: &str) -> Result<&Persona> {
        self.find(handle).ok_or_else(|| {
            PersonaChatError::Persona(format!("Unknown persona: @{}", normalize_handle(handle)))
                .into()
        })
    }

    /// First persona in the catalog
    pub fn first(&self) -> Option<&Persona> {
        self.personas.first()
    }

    /// All personas in catalog order
    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    /// Number of personas
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

/// Catalog file loaded at most once and shared by every consumer
#[derive(Debug)]
pub struct CatalogSource {
    path: PathBuf,
    loaded: LoadOnce<PersonaCatalog>,
}

impl CatalogSource {
    /// Creates a source for the catalog at `path`; nothing is read yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: LoadOnce::new(),
        }
    }

    /// Path of the catalog file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog on first use and returns the shared copy
    pub async fn ensure_loaded(&self) -> Result<Arc<PersonaCatalog>> {
        self.loaded
            .ensure_loaded(|| PersonaCatalog::from_file(&self.path))
            .await
    }
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

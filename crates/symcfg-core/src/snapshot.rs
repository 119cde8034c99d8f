//! Resolved state handed to template rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::artifact::{ArtifactKind, ArtifactTable};
use crate::domain::Domain;
use crate::error::{ConfigError, Result};
use crate::store::SymbolStore;
use crate::symbol::{SymbolId, SymbolKind, Value};

/// Creation record of one symbol with its resolved value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SymbolRecord {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub label: String,
    pub value: Value,
    pub literal: String,
    pub default: Value,
    pub domain: Domain,
    /// Visible including all parents.
    pub visible: bool,
    pub locked: bool,
    pub parent: Option<SymbolId>,
}

/// The active descriptor of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActiveArtifact {
    pub slot: String,
    pub kind: ArtifactKind,
    pub template: String,
    pub output_name: String,
    pub destination: String,
    pub project_path: String,
    pub markup: bool,
    pub overwrite: bool,
}

impl ActiveArtifact {
    /// Where the rendered output goes: a path for files, the target list
    /// symbol for string-list entries, `category:key` for build options.
    pub fn output_path(&self) -> String {
        match self.kind {
            ArtifactKind::StringList => return self.destination.clone(),
            ArtifactKind::Setting => return format!("{}:{}", self.destination, self.output_name),
            _ => {}
        }
        let dir = self.destination.trim_matches('/');
        if dir.is_empty() {
            self.output_name.clone()
        } else {
            format!("{dir}/{}", self.output_name)
        }
    }
}

/// Symbols in creation order plus one active artifact per slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbols: Vec<SymbolRecord>,
    pub artifacts: Vec<ActiveArtifact>,
}

impl Snapshot {
    /// Capture every symbol and slot whose instance satisfies `include`.
    pub(crate) fn capture(
        store: &SymbolStore,
        artifacts: &ArtifactTable,
        include: impl Fn(&str) -> bool,
    ) -> Result<Self> {
        let mut symbols = Vec::new();
        for (symbol_ref, sym) in store.iter() {
            if !include(sym.id().instance()) {
                continue;
            }
            let parent = match sym.parent() {
                Some(p) => Some(store.get(p)?.id().clone()),
                None => None,
            };
            symbols.push(SymbolRecord {
                id: sym.id().clone(),
                kind: sym.kind(),
                label: sym.label().to_string(),
                value: sym.value().clone(),
                literal: sym.value().literal(),
                default: sym.default_value().clone(),
                domain: sym.domain().clone(),
                visible: store.is_effectively_visible(symbol_ref),
                locked: sym.locked(),
                parent,
            });
        }

        let mut active = Vec::new();
        for (_, slot) in artifacts.iter() {
            if !include(slot.owner()) {
                continue;
            }
            let descriptor = slot.active().ok_or_else(|| ConfigError::AmbiguousArtifactSelection {
                slot: slot.id().to_string(),
                matches: 0,
            })?;
            active.push(ActiveArtifact {
                slot: slot.id().to_string(),
                kind: descriptor.kind,
                template: descriptor.template.clone(),
                output_name: descriptor.output_name.clone(),
                destination: descriptor.destination.clone(),
                project_path: descriptor.project_path.clone(),
                markup: descriptor.markup,
                overwrite: descriptor.overwrite,
            });
        }

        Ok(Self {
            symbols,
            artifacts: active,
        })
    }

    pub fn symbol(&self, id: &str) -> Option<&SymbolRecord> {
        self.symbols.iter().find(|s| s.id.as_str() == id)
    }

    pub fn artifact(&self, slot: &str) -> Option<&ActiveArtifact> {
        self.artifacts.iter().find(|a| a.slot == slot)
    }

    /// Artifacts that produce output, skipping disabled slots.
    pub fn outputs(&self) -> impl Iterator<Item = &ActiveArtifact> {
        self.artifacts.iter().filter(|a| a.kind != ArtifactKind::Disabled)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    /// SHA-256 of the compact JSON form, as lowercase hex.
    pub fn digest(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&json);
        let hash: [u8; 32] = hasher.finalize().into();
        Ok(hash.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Plain-text listing: one `id = literal` line per visible symbol, then
    /// one line per producing artifact.
    pub fn format_text(&self, include_hidden: bool) -> String {
        let mut out = String::new();
        for sym in &self.symbols {
            if sym.kind == SymbolKind::Menu || !(sym.visible || include_hidden) {
                continue;
            }
            let flags = match (sym.visible, sym.locked) {
                (false, true) => "  [hidden, locked]",
                (false, false) => "  [hidden]",
                (true, true) => "  [locked]",
                (true, false) => "",
            };
            let _ = writeln!(out, "{} = {}{flags}", sym.id, sym.literal);
        }
        let outputs: Vec<_> = self.outputs().collect();
        if !outputs.is_empty() {
            let _ = writeln!(out);
            for artifact in outputs {
                let _ = writeln!(
                    out,
                    "{:<32} {:<12} {} -> {}",
                    artifact.slot,
                    format!("{:?}", artifact.kind).to_lowercase(),
                    artifact.template,
                    artifact.output_path()
                );
            }
        }
        out
    }
}

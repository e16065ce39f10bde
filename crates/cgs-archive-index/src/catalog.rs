use crate::IndexAsset;

/// Development-time asset catalog used by simulate mode.
///
/// Holds the raw archive assignments a build step would bake into the
/// index file. [`crate::ArchiveIndex::from_catalog`] answers the normal
/// query contract by scanning these entries directly, so development
/// builds never need a built index or downloaded archives.
#[derive(Debug, Default)]
pub struct DevCatalog {
    entries: Vec<(String, IndexAsset)>,
}

impl DevCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `asset` would be packaged into `archive`.
    pub fn add(&mut self, archive: impl Into<String>, asset: IndexAsset) {
        self.entries.push((archive.into(), asset));
    }

    pub(crate) fn assets_in<'a>(
        &'a self,
        archive: &str,
    ) -> impl Iterator<Item = &'a IndexAsset> + 'a {
        let archive = archive.to_string();
        self.entries
            .iter()
            .filter(move |(a, _)| *a == archive)
            .map(|(_, asset)| asset)
    }

    pub(crate) fn archive_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for (archive, _) in &self.entries {
            if !names.contains(&archive.as_str()) {
                names.push(archive.as_str());
            }
        }
        names
    }
}

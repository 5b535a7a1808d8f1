use std::collections::BTreeSet;

/// Lowercase file extensions a field accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedExtensions {
    extensions: BTreeSet<String>,
}

impl AllowedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim();
                ext.strip_prefix('.').unwrap_or(ext).to_lowercase()
            })
            .filter(|ext| !ext.is_empty())
            .collect();

        Self { extensions }
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowedExtensions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Lowercased text after the last `.` of a client filename, or `""`.
pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

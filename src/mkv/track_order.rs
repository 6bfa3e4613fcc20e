//! The `--track-order` value: `fileIndex:trackId,fileIndex:trackId,...`.

use std::collections::BTreeMap;
use std::fmt;

/// Maps `(fileIndex, oldTrackId)` to the track id to use instead.
pub type OrderTranslation = BTreeMap<(usize, String), String>;

/// One `fileIndex:trackId` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEntry {
    pub file: usize,
    pub track: String,
}

/// Parsed track order string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackOrder {
    entries: Vec<OrderEntry>,
}

impl TrackOrder {
    /// Parses a track order string.
    ///
    /// Returns `None` unless every entry has the form `\d+:\d+`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut entries = Vec::new();
        for item in value.split(',') {
            let (file, track) = item.trim().split_once(':')?;
            if !is_number(file) || !is_number(track) {
                return None;
            }
            entries.push(OrderEntry {
                file: file.parse().ok()?,
                track: track.to_string(),
            });
        }
        Some(Self { entries })
    }

    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy with every entry found in `translation` replaced.
    pub fn translate(&self, translation: &OrderTranslation) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|e| OrderEntry {
                file: e.file,
                track: translation
                    .get(&(e.file, e.track.clone()))
                    .cloned()
                    .unwrap_or_else(|| e.track.clone()),
            })
            .collect();
        Self { entries }
    }
}

impl fmt::Display for TrackOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", entry.file, entry.track)?;
        }
        Ok(())
    }
}

fn is_number(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_renders() {
        let order = TrackOrder::parse("0:0,0:1,1:0").unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order.entries()[2], OrderEntry { file: 1, track: "0".into() });
        assert_eq!(order.to_string(), "0:0,0:1,1:0");
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(TrackOrder::parse("0:0,1").is_none());
        assert!(TrackOrder::parse("0:a").is_none());
        assert!(TrackOrder::parse("").is_none());
    }

    #[test]
    fn translation_touches_only_its_file() {
        let order = TrackOrder::parse("0:0,1:0,0:2").unwrap();
        let mut translation = OrderTranslation::new();
        translation.insert((0, "0".to_string()), "1".to_string());

        assert_eq!(order.translate(&translation).to_string(), "0:1,1:0,0:2");
        assert_eq!(order.to_string(), "0:0,1:0,0:2");
    }
}

//! Track adjustment for sibling files whose track layout differs from the
//! base file the command line was written against.

use std::fmt;

use tracing::{debug, info, warn};

use super::command::MkvCommand;
use super::track_options::Translation;
use crate::error::BatchError;
use crate::media::{TrackDescriptor, TrackInspector};

/// Outcome of [`adjust_sources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adjustment {
    /// Every track the command refers to is where the command expects it.
    Matched,
    /// Some track ids were rewritten. Lists the translation now in effect for
    /// each changed source group.
    Adjusted { translations: Vec<(usize, Translation)> },
    /// A referenced track has no equivalent in the sibling file, or a file
    /// could not be read.
    Unresolvable { reason: String },
}

impl Adjustment {
    pub fn is_adjusted(&self) -> bool {
        matches!(self, Adjustment::Adjusted { .. })
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Adjustment::Unresolvable { .. })
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Matched => f.write_str("tracks match"),
            Adjustment::Adjusted { translations } => {
                f.write_str("tracks adjusted")?;
                for (group, translation) in translations {
                    for (old, new) in translation {
                        write!(f, " {}:{}->{}:{}", group, old, group, new)?;
                    }
                }
                Ok(())
            }
            Adjustment::Unresolvable { reason } => write!(f, "unresolvable: {}", reason),
        }
    }
}

/// Checks, for batch index `index`, every track the per-file options refer
/// to, and points the options and the track order at an equivalent track
/// when the sibling file stores it elsewhere.
///
/// A track matches when the sibling has an equal track at the same position,
/// or at the position a previous adjustment moved it to. Otherwise the first
/// similar track not already claimed by another id is used. Translations are
/// kept per index, so running this again on an adjusted index returns
/// [`Adjustment::Matched`].
pub fn adjust_sources(
    command: &mut MkvCommand,
    index: usize,
    inspector: &dyn TrackInspector,
) -> Result<Adjustment, BatchError> {
    command.ensure_ok()?;
    if index >= command.len() {
        return Err(BatchError::IndexOutOfRange {
            index,
            size: command.len(),
        });
    }

    let mut changed = Vec::new();
    let mut unresolved = Vec::new();

    let groups: Vec<_> = command
        .groups()
        .iter()
        .map(|g| {
            let tracks: Vec<String> = g.options().tracks().into_iter().map(str::to_string).collect();
            (g.index(), g.file().to_path_buf(), g.siblings().get(index).cloned(), tracks)
        })
        .collect();

    for (group, base_file, sibling, tracks) in groups {
        let Some(sibling) = sibling else {
            continue;
        };
        if tracks.is_empty() {
            continue;
        }

        let base = match inspector.inspect(&base_file) {
            Ok(base) => base,
            Err(e) => return Ok(unresolvable(e.to_string())),
        };
        if base.is_empty() {
            return Ok(unresolvable(format!("{} has no tracks", base.file_name())));
        }
        let source = match inspector.inspect(&sibling) {
            Ok(source) => source,
            Err(e) => return Ok(unresolvable(e.to_string())),
        };

        let avi = base.is_avi();
        let current = command.translation(index, group).cloned().unwrap_or_default();
        let mut translation = current.clone();
        let mut taken: Vec<usize> = Vec::new();
        let empty = TrackDescriptor::empty();

        for id in &tracks {
            let Ok(position) = id.parse::<usize>() else {
                continue;
            };
            let Some(base_track) = base.track(position) else {
                unresolved.push(format!("track {} not found in {}", id, base.file_name()));
                continue;
            };

            let in_use = current
                .get(id)
                .and_then(|t| t.parse::<usize>().ok())
                .unwrap_or(position);
            let source_track = source.track(in_use).unwrap_or(&empty);
            let still_matches = if in_use == position {
                base_track.matches(source_track, avi)
            } else {
                base_track.is_similar(source_track, avi)
            };
            if still_matches && !taken.contains(&in_use) {
                taken.push(in_use);
                continue;
            }

            match source.find_similar_excluding(base_track, avi, &taken) {
                Some((found, track)) => {
                    debug!(
                        group,
                        from = position,
                        to = found,
                        track = %track,
                        "Similar track found"
                    );
                    taken.push(found);
                    if found == position {
                        translation.remove(id);
                    } else {
                        translation.insert(id.clone(), found.to_string());
                    }
                }
                None => {
                    unresolved.push(format!(
                        "no track like {}:{} ({} {}) in {}",
                        group,
                        id,
                        base_track.track_type,
                        base_track.language,
                        source.file_name()
                    ));
                }
            }
        }

        if translation != current {
            command.set_translation(index, group, translation.clone());
            changed.push((group, translation));
        }
    }

    let outcome = if !unresolved.is_empty() {
        unresolvable(unresolved.join("; "))
    } else if !changed.is_empty() {
        Adjustment::Adjusted { translations: changed }
    } else {
        Adjustment::Matched
    };

    if outcome.is_adjusted() {
        info!(index, adjustment = %outcome, "Command adjusted");
    }
    Ok(outcome)
}

fn unresolvable(reason: String) -> Adjustment {
    warn!(reason = %reason, "Track adjustment failed");
    Adjustment::Unresolvable { reason }
}

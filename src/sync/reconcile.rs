use std::collections::HashSet;
use std::io::Write;

use rand::Rng;
use tracing::warn;

use super::PassReport;
use crate::error::SyncError;
use crate::model::palette::resolve_color;
use crate::model::{Entity, Label};
use crate::providers::RemoteCollection;

/// Create every desired entity whose key is not yet in `target`.
///
/// Existing keys are listed once up front. Keys created during the pass are
/// added to the same set, so a repeated key in `desired` is created at most
/// once. Nothing is updated or deleted. A rejected create is recorded and the
/// pass moves on; errors that affect every item stop it.
pub async fn reconcile<E, C, W>(
    target: &C,
    desired: Vec<E>,
    out: &mut W,
) -> Result<PassReport, SyncError>
where
    E: Entity,
    C: RemoteCollection<E> + ?Sized,
    W: Write,
{
    let mut seen: HashSet<String> = target
        .list()
        .await?
        .iter()
        .map(|e| e.key().to_string())
        .collect();
    let mut report = PassReport::default();

    let desired: Vec<E> = desired
        .into_iter()
        .filter(|item| {
            let blank = item.key().trim().is_empty();
            if blank {
                warn!(kind = E::KIND, "skipping row without a name");
            }
            !blank
        })
        .collect();

    writeln!(out, "creating {} {}s", desired.len(), E::KIND)?;
    for item in desired {
        let key = item.key().to_string();
        if seen.contains(&key) {
            writeln!(out, "{} \"{}\" already exists", E::KIND, key)?;
            report.skipped.push(key);
            continue;
        }

        writeln!(out, "creating {} \"{}\"", E::KIND, key)?;
        match target.create(&item).await {
            Ok(_) => {
                seen.insert(key.clone());
                report.applied.push(key);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                writeln!(out, "failed to create {} \"{}\": {}", E::KIND, key, err)?;
                report.failures.push((key, err));
            }
        }
    }
    Ok(report)
}

/// Give every label without a color one from the palette.
pub fn prepare_labels<R: Rng + ?Sized>(labels: Vec<Label>, rng: &mut R) -> Vec<Label> {
    labels
        .into_iter()
        .map(|mut label| {
            label.color = resolve_color(&label.color, rng);
            label
        })
        .collect()
}

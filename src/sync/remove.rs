use std::io::Write;

use tracing::warn;

use super::PassReport;
use crate::error::SyncError;
use crate::model::Entity;
use crate::providers::RemoteCollection;

/// Remove every entity in `target`. There is no filter.
///
/// Prints `<verb> N <kind>s` before the first call. Items that vanished in
/// the meantime are skipped with a warning; other per-item failures are
/// recorded and the pass continues.
pub async fn remove_all<E, C, W>(target: &C, verb: &str, out: &mut W) -> Result<PassReport, SyncError>
where
    E: Entity,
    C: RemoteCollection<E> + ?Sized,
    W: Write,
{
    let items = target.list().await?;
    let mut report = PassReport::default();

    writeln!(out, "{} {} {}s", verb, items.len(), E::KIND)?;
    for item in items {
        let key = item.key().to_string();
        writeln!(out, "{} {} \"{}\"", verb, E::KIND, key)?;
        match target.delete(&item).await {
            Ok(()) => report.applied.push(key),
            Err(SyncError::NotFound(_)) => {
                warn!(kind = E::KIND, key = %key, "already gone");
                report.skipped.push(key);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                writeln!(out, "failed to {} {} \"{}\": {}", verb_base(verb), E::KIND, key, err)?;
                report.failures.push((key, err));
            }
        }
    }
    Ok(report)
}

// "removing" -> "remove", "closing" -> "close"
fn verb_base(verb: &str) -> String {
    match verb.strip_suffix("ing") {
        Some(stem) => format!("{stem}e"),
        None => verb.to_string(),
    }
}

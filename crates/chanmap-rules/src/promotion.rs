use chanmap_types::{Architecture, Assignments, Channel, Risk, RevisionId};

use crate::{ChannelView, DisabledReason, Rejection};

/// A channel offered as a promotion destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionTarget {
    pub channel: Channel,
    pub disabled: Option<DisabledReason>,
}

impl PromotionTarget {
    pub fn is_disabled(&self) -> bool {
        self.disabled.is_some()
    }

    /// Human-readable reason, for disabled targets.
    pub fn reason(&self) -> Option<String> {
        self.disabled.map(|r| r.to_string())
    }
}

/// Candidate destination channels for promoting `source`.
///
/// Promotion only moves toward more trust: every risk of the same track
/// strictly more trusted than the source. `available` may go to every risk.
/// A branch may also go to its own parent risk, which is then subject to
/// the same disable checks as any other target.
fn candidate_targets(source: &Channel) -> Vec<Channel> {
    Risk::RELEASABLE
        .into_iter()
        .filter(|risk| {
            if source.is_available() {
                true
            } else if source.is_branch() {
                risk.rank() <= source.risk().rank()
            } else {
                risk.is_more_trusted_than(source.risk())
            }
        })
        .map(|risk| source.with_risk(risk))
        .collect()
}

fn first_restricted(view: &ChannelView<'_>, source: &Channel) -> Option<RevisionId> {
    view.revisions_in(source)
        .into_iter()
        .find(|r| r.is_restricted())
        .map(|r| r.revision)
}

fn same_assignments(source: &Assignments, target: &Assignments) -> bool {
    source
        .iter()
        .all(|(arch, rev)| target.get(arch) == Some(rev))
}

fn disabled_reason(
    view: &ChannelView<'_>,
    source: &Channel,
    source_assignments: &Assignments,
    target: &Channel,
) -> Option<DisabledReason> {
    if source_assignments.is_empty() {
        return Some(DisabledReason::NothingToPromote);
    }
    if target.risk().requires_stable_grade() {
        if let Some(revision) = first_restricted(view, source) {
            return Some(DisabledReason::RestrictedRevision(revision));
        }
    }
    if target.is_latest_track() && view.latest_must_stay_empty() {
        return Some(DisabledReason::LatestTrackReserved);
    }
    if same_assignments(source_assignments, &view.assignments(target)) {
        return Some(DisabledReason::NoChange);
    }
    None
}

/// Every channel `source` could be promoted to, each marked disabled with
/// a reason when the promotion would be refused. Sorted canonically.
/// Expired branches have no targets.
pub fn legal_promotion_targets(view: &ChannelView<'_>, source: &Channel) -> Vec<PromotionTarget> {
    if view.is_expired(source) {
        return Vec::new();
    }
    let assignments = view.assignments(source);
    let mut targets: Vec<PromotionTarget> = candidate_targets(source)
        .into_iter()
        .map(|channel| PromotionTarget {
            disabled: disabled_reason(view, source, &assignments, &channel),
            channel,
        })
        .collect();
    targets.sort_by(|a, b| a.channel.cmp(&b.channel));
    targets
}

/// Validate promoting `source` to `target` and return the assignments to
/// queue there.
pub fn check_promotion(
    view: &ChannelView<'_>,
    source: &Channel,
    target: &Channel,
) -> Result<Assignments, Rejection> {
    if source == target {
        return Err(Rejection::SameChannel(source.clone()));
    }
    if view.is_expired(source) {
        return Err(Rejection::ExpiredBranch(source.clone()));
    }
    let candidate = legal_promotion_targets(view, source)
        .into_iter()
        .find(|t| &t.channel == target)
        .ok_or_else(|| Rejection::IllegalTarget {
            from: source.clone(),
            to: target.clone(),
        })?;

    match candidate.disabled {
        Some(reason) => Err(reason.into_rejection(source, target)),
        None => Ok(view.assignments(source)),
    }
}

/// Validate dropping `revision` (dragged from `source`) onto `target` for
/// the given architectures.
pub fn check_drop_revision(
    view: &ChannelView<'_>,
    revision: RevisionId,
    source: &Channel,
    target: &Channel,
    architectures: &[Architecture],
) -> Result<(), Rejection> {
    let rev = view
        .server()
        .revision(revision)
        .ok_or(Rejection::UnknownRevision(revision))?;

    if architectures.is_empty() {
        return Err(Rejection::NoArchitectures);
    }
    if let Some(arch) = architectures.iter().find(|a| !rev.builds_for(a)) {
        return Err(Rejection::ArchitectureMismatch {
            revision,
            architecture: arch.clone(),
        });
    }
    if target.is_available() {
        return Err(Rejection::PseudoChannel(target.clone()));
    }
    if source == target {
        return Err(Rejection::SameChannel(target.clone()));
    }
    if let Some(expired) = [source, target].into_iter().find(|c| view.is_expired(c)) {
        return Err(Rejection::ExpiredBranch(expired.clone()));
    }
    if target.is_latest_track() && view.latest_must_stay_empty() {
        return Err(Rejection::LatestTrackReserved(target.clone()));
    }
    if target.risk().requires_stable_grade() && rev.is_restricted() {
        return Err(Rejection::RestrictedRevision {
            revision,
            target: target.clone(),
        });
    }

    let current = view.assignments(target);
    if architectures
        .iter()
        .all(|arch| current.get(arch) == Some(&revision))
    {
        return Err(Rejection::NoChange {
            target: target.clone(),
        });
    }

    Ok(())
}

/// Boolean form of [`check_drop_revision`].
pub fn can_drop_revision(
    view: &ChannelView<'_>,
    revision: RevisionId,
    source: &Channel,
    target: &Channel,
    architectures: &[Architecture],
) -> bool {
    check_drop_revision(view, revision, source, target, architectures).is_ok()
}

//! Operations on a session's in-memory notification list.
//!
//! The list is kept newest first by `created_at`, holds each id at most
//! once, and a read flag, once set, stays set.

use notisync_api::*;

/// Replace the list with freshly fetched data, truncated to `cap`.
///
/// Entries already read locally stay read, even if the fetched copy
/// predates the write that set the flag.
pub(super) fn replace(list: &mut Vec<Notification>, data: &[Notification], cap: usize) {
    let mut out: Vec<Notification> = data.iter().take(cap).cloned().collect();
    for n in out.iter_mut() {
        if !n.is_read && list.iter().any(|o| o.id == n.id && o.is_read) {
            n.is_read = true;
        }
    }
    *list = out;
}

/// Add a newly created notification at its position by `created_at`,
/// then drop the oldest entries beyond `cap`.
///
/// Ties go in front of existing entries, so in-order events are simply
/// prepended. An id that is already present is treated as an update.
pub(super) fn insert(list: &mut Vec<Notification>, record: Notification, cap: usize) {
    if list.iter().any(|n| n.id == record.id) {
        update(list, record);
        return;
    }
    let pos = list
        .iter()
        .position(|n| n.created_at <= record.created_at)
        .unwrap_or(list.len());
    list.insert(pos, record);
    list.truncate(cap);
}

/// Replace the entry with a matching id in place. Returns false if the id
/// is unknown, in which case the list is untouched.
///
/// `id` and `created_at` are immutable and keep their local values.
pub(super) fn update(list: &mut [Notification], record: Notification) -> bool {
    let Some(n) = list.iter_mut().find(|n| n.id == record.id) else {
        return false;
    };
    let is_read = n.is_read || record.is_read;
    let created_at = n.created_at;
    *n = record;
    n.is_read = is_read;
    n.created_at = created_at;
    true
}

/// Set the read flag of one entry. Returns false if nothing changed.
pub(super) fn mark_read(list: &mut [Notification], id: NotificationId) -> bool {
    match list.iter_mut().find(|n| n.id == id) {
        Some(n) if !n.is_read => {
            n.is_read = true;
            true
        }
        _ => false,
    }
}

/// Set the read flag of every entry. Returns false if nothing changed.
pub(super) fn mark_all_read(list: &mut [Notification]) -> bool {
    let mut changed = false;
    for n in list.iter_mut().filter(|n| !n.is_read) {
        n.is_read = true;
        changed = true;
    }
    changed
}

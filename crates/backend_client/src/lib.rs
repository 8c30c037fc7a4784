//! A client for the notification backend REST api.
//!
//! | operation | request |
//! |---|---|
//! | list | `GET {base}/users/{user}/notifications?limit={limit}` |
//! | mark one read | `POST {base}/users/{user}/notifications/{id}/read` |
//! | mark all read | `POST {base}/users/{user}/notifications/read-all` |
//!
//! Lists are returned as a json array of [Notification] records, newest
//! first.

#![deny(missing_docs)]

use notisync_api::{Notification, NotificationId, NsError, NsResult, UserId};
use url::Url;

fn endpoint(mut server_url: Url, segments: &[&str]) -> NsResult<Url> {
    {
        let display_url = server_url.to_string();
        let mut path = server_url.path_segments_mut().map_err(|_| {
            NsError::invalid_argument(format!(
                "backend url cannot be a base: {display_url}"
            ))
        })?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(server_url)
}

fn map_ureq_err(ctx: &str, err: ureq::Error) -> NsError {
    match err {
        ureq::Error::Status(status, res) => {
            let body = res.into_string().unwrap_or_default();
            NsError::other(format!("{ctx}: status {status}: {body}"))
        }
        ureq::Error::Transport(err) => NsError::other_src(ctx, err),
    }
}

/// List the notifications of `user`, newest first, at most `limit`.
///
/// Note the `blocking_` prefix. This is a hint to the caller that if the function is used in
/// an async context, it should be treated as a blocking operation.
pub fn blocking_list(
    server_url: Url,
    user: &UserId,
    limit: usize,
) -> NsResult<Vec<Notification>> {
    let mut url = endpoint(server_url, &["users", &**user, "notifications"])?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string());

    let body = ureq::get(url.as_str())
        .call()
        .map_err(|e| map_ureq_err("Failed to list notifications", e))?
        .into_string()
        .map_err(|e| NsError::other_src("Failed to read list body", e))?;

    let list: Vec<Notification> = serde_json::from_str(&body)
        .map_err(|e| NsError::other_src("Failed to decode list", e))?;

    tracing::trace!(%user, count = list.len(), "listed notifications");

    Ok(list)
}

/// Mark one notification of `user` as read.
///
/// Note the `blocking_` prefix. This is a hint to the caller that if the function is used in
/// an async context, it should be treated as a blocking operation.
pub fn blocking_mark_read(
    server_url: Url,
    user: &UserId,
    id: NotificationId,
) -> NsResult<()> {
    let id = id.to_string();
    let url = endpoint(
        server_url,
        &["users", &**user, "notifications", id.as_str(), "read"],
    )?;

    ureq::post(url.as_str())
        .call()
        .map_err(|e| map_ureq_err("Failed to mark notification read", e))?;

    Ok(())
}

/// Mark every unread notification of `user` as read.
///
/// Note the `blocking_` prefix. This is a hint to the caller that if the function is used in
/// an async context, it should be treated as a blocking operation.
pub fn blocking_mark_all_read(server_url: Url, user: &UserId) -> NsResult<()> {
    let url =
        endpoint(server_url, &["users", &**user, "notifications", "read-all"])?;

    ureq::post(url.as_str()).call().map_err(|e| {
        map_ureq_err("Failed to mark all notifications read", e)
    })?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn endpoint_joins_segments() {
        let base = Url::parse("http://localhost:8080/api/").unwrap();
        let url = endpoint(base, &["users", "42", "notifications"]).unwrap();
        assert_eq!(
            "http://localhost:8080/api/users/42/notifications",
            url.as_str()
        );
    }

    #[test]
    fn endpoint_escapes_user_ids() {
        let base = Url::parse("http://localhost:8080").unwrap();
        let url = endpoint(base, &["users", "a/b c"]).unwrap();
        assert_eq!("http://localhost:8080/users/a%2Fb%20c", url.as_str());
    }

    #[test]
    fn endpoint_rejects_non_base_url() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(endpoint(base, &["users"]).is_err());
    }
}

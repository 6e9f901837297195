//! Post permalinks and markdown link rewriting.

use std::sync::LazyLock;

use fedsync_common::{AppResult, ObjectId};
use fedsync_db::repositories::PostRepository;
use regex::Regex;
use url::Url;

#[allow(clippy::expect_used)]
static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\]\((https?://[^)\s]+)\)").expect("markdown link pattern compiles")
});

/// Node-local permalink of a post: `{base}post/{local_key}`.
pub fn permalink(base: &Url, local_key: i64) -> AppResult<Url> {
    Ok(base.join(&format!("post/{local_key}"))?)
}

/// Local key from one of this node's permalinks.
#[must_use]
pub fn parse_permalink(base: &Url, url: &Url) -> Option<i64> {
    if url.origin() != base.origin() {
        return None;
    }
    let rest = url.path().strip_prefix(base.path())?;
    rest.strip_prefix("post/")?.trim_end_matches('/').parse().ok()
}

/// Rewrite markdown links to posts this node holds into local permalinks.
pub async fn rewrite_post_links(
    body: &str,
    posts: &PostRepository,
    base: &Url,
) -> AppResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for captures in MARKDOWN_LINK_RE.captures_iter(body) {
        let Some(link) = captures.get(1) else {
            continue;
        };
        let Ok(target) = ObjectId::parse(link.as_str()) else {
            continue;
        };
        let Some(post) = posts.find_by_ap_id(&target).await? else {
            continue;
        };
        out.push_str(&body[last..link.start()]);
        out.push_str(permalink(base, post.id)?.as_str());
        last = link.end();
    }
    out.push_str(&body[last..]);
    Ok(out)
}

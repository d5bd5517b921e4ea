// src/fetch/mod.rs

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ScrapeError;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Remove every literal `<!--` and `-->` token, leaving whatever sat between them in place.
///
/// FBref ships most of its secondary tables inside HTML comments; deleting the delimiters
/// turns that markup back into live elements. This is token deletion on the raw text, not
/// removal of comment nodes.
pub fn decomment(html: &str) -> String {
    html.replace(COMMENT_OPEN, "").replace(COMMENT_CLOSE, "")
}

/// GET `url` once and return the body as text. Non-2xx statuses are errors.
#[instrument(level = "debug", skip(client))]
pub async fn get_text(client: &Client, url: &str) -> Result<String, ScrapeError> {
    let parsed = Url::parse(url).map_err(|e| ScrapeError::transport(url, e))?;
    debug!("Fetching text from {}", parsed);

    client
        .get(parsed)
        .send()
        .await
        .map_err(|e| ScrapeError::transport(url, e))?
        .error_for_status()
        .map_err(|e| ScrapeError::transport(url, e))?
        .text()
        .await
        .map_err(|e| ScrapeError::transport(url, e))
}

/// Fetch `url` and de-comment the body.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, ScrapeError> {
    let body = get_text(client, url).await?;
    debug!(url, bytes = body.len(), "fetched page");
    Ok(decomment(&body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn decomment_leaves_plain_html_untouched() {
        let html = "<html><body><table id=\"a\"><tr><td>1</td></tr></table></body></html>";
        assert_eq!(decomment(html), html);
        assert_eq!(decomment(&decomment(html)), html);
    }

    #[test]
    fn decomment_exposes_commented_table() {
        let html = "<div>\n<!--\n   <table id=\"stats_misc\"><tr><td>x &amp; y</td></tr></table>\n-->\n</div>";
        let out = decomment(html);
        assert!(!out.contains("<!--"));
        assert!(!out.contains("-->"));
        assert_eq!(
            out,
            "<div>\n\n   <table id=\"stats_misc\"><tr><td>x &amp; y</td></tr></table>\n\n</div>"
        );
    }

    #[test]
    fn decomment_removes_only_tokens() {
        assert_eq!(decomment("a<!--b-->c<!--d"), "abcd");
        assert_eq!(decomment("--> <!-- -- >"), "  -- >");
    }

    #[tokio::test]
    async fn invalid_url_is_a_transport_error() {
        let client = Client::new();
        let err = fetch_page(&client, "not a url").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}

//! Confluence Cloud connector.
//!
//! Lists global spaces through the v2 REST API and turns every current page
//! of a space into a [`Document`] whose source is the page's web link.
//!
//! # Pagination
//!
//! Both the space listing and the page listing are cursor-paginated: each
//! response may carry `_links.next`, a relative URL whose `cursor` query
//! parameter is fed into the next request. A response without `next` ends
//! the walk.
//!
//! # Page bodies
//!
//! Pages are requested with `body-format=storage`, which is XHTML. Text nodes
//! are trimmed and joined with single spaces. When the listing omits a
//! page's body, it is fetched from the v1 content endpoint instead.

use serde::{Deserialize, Deserializer};
use url::Url;

use info_gpt_core::models::Document;

use crate::config::ConfluenceCredentials;
use crate::scrape::{fetch_json, scrape_client, ScrapeError};

const PAGE_LIMIT: u32 = 100;

/// A Confluence space.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Space {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(rename = "_links", default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize, Default)]
struct Links {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    webui: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<Body>,
    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    storage: Option<Storage>,
}

#[derive(Debug, Deserialize)]
struct Storage {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Content {
    body: Body,
}

/// Confluence ids are strings in v2 and numbers in some v1 payloads.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

impl Body {
    fn into_storage_value(self) -> Option<String> {
        self.storage.map(|s| s.value)
    }
}

/// Authenticated client for one Confluence site.
pub struct ConfluenceClient {
    base: Url,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl ConfluenceClient {
    /// `base_url` is the wiki root, e.g. `https://acme.atlassian.net/wiki/`.
    pub fn new(credentials: &ConfluenceCredentials) -> Result<Self, ScrapeError> {
        let mut base_url = credentials.base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            base: Url::parse(&base_url)?,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            client: scrape_client()?,
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// All global spaces except those whose name is in `exclude`.
    pub async fn list_spaces(&self, exclude: &[String]) -> Result<Vec<Space>, ScrapeError> {
        let url = self.base.join("api/v2/spaces")?;
        let params = [
            ("type", "global".to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];

        let mut spaces = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self.get(url.clone()).query(&params);
            if let Some(c) = &cursor {
                request = request.query(&[("cursor", c)]);
            }
            let listing: Listing<Space> = fetch_json(request).await?;
            spaces.extend(
                listing
                    .results
                    .into_iter()
                    .filter(|space| !exclude.contains(&space.name)),
            );

            cursor = next_cursor(&self.base, listing.links.as_ref())?;
            if cursor.is_none() {
                break;
            }
        }

        Ok(spaces)
    }

    /// Every current page in `space`, converted to plain text.
    pub async fn scrape_space(&self, space: &Space) -> Result<Vec<Document>, ScrapeError> {
        let url = self
            .base
            .join(&format!("api/v2/spaces/{}/pages", space.id))?;
        let params = [
            ("status", "current".to_string()),
            ("limit", PAGE_LIMIT.to_string()),
            ("body-format", "storage".to_string()),
        ];

        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self.get(url.clone()).query(&params);
            if let Some(c) = &cursor {
                request = request.query(&[("cursor", c)]);
            }
            let listing: Listing<Page> = fetch_json(request).await?;

            for page in listing.results {
                documents.push(self.page_to_document(page).await?);
            }

            cursor = next_cursor(&self.base, listing.links.as_ref())?;
            if cursor.is_none() {
                break;
            }
        }

        tracing::info!(
            space = %space.name,
            space_id = %space.id,
            pages = documents.len(),
            "scraped confluence space"
        );
        Ok(documents)
    }

    async fn page_to_document(&self, page: Page) -> Result<Document, ScrapeError> {
        let html = match page.body.and_then(Body::into_storage_value) {
            Some(html) => html,
            None => self.page_body(&page.id).await?,
        };

        let webui = page.links.webui.as_deref().unwrap_or_default();
        let link = self.base.join(webui.trim_start_matches('/'))?;

        let mut document = Document::new(html_to_text(&html), link.to_string());
        if let Some(title) = page.title {
            document = document.with_title(title);
        }
        Ok(document)
    }

    /// Storage-format body of a single page from the v1 content endpoint.
    pub async fn page_body(&self, page_id: &str) -> Result<String, ScrapeError> {
        let url = self.base.join(&format!("rest/api/content/{}", page_id))?;
        let content: Content =
            fetch_json(self.get(url).query(&[("expand", "body.storage")])).await?;
        content
            .body
            .into_storage_value()
            .ok_or_else(|| ScrapeError::Decode(format!("page {} has no storage body", page_id)))
    }
}

/// The `cursor` query parameter of `_links.next`, if there is a next page.
fn next_cursor(base: &Url, links: Option<&Links>) -> Result<Option<String>, ScrapeError> {
    let next = match links.and_then(|l| l.next.as_deref()) {
        Some(next) if !next.is_empty() => next,
        _ => return Ok(None),
    };

    let next_url = base.join(next)?;
    Ok(next_url
        .query_pairs()
        .find(|(key, _)| key == "cursor")
        .map(|(_, value)| value.into_owned()))
}

/// Plain text of an HTML fragment: text nodes trimmed, joined by one space.
pub fn html_to_text(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_strips_markup() {
        let html = "<h1>Onboarding</h1><p>Ask <strong>#it-help</strong>\n for a laptop.</p><ul><li>VPN</li></ul>";
        assert_eq!(
            html_to_text(html),
            "Onboarding Ask #it-help for a laptop. VPN"
        );
    }

    #[test]
    fn test_html_to_text_empty() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<p>   </p>"), "");
    }

    #[test]
    fn test_next_cursor_from_relative_link() {
        let base = Url::parse("https://acme.atlassian.net/wiki/").unwrap();
        let links = Links {
            next: Some("/wiki/api/v2/spaces/42/pages?cursor=abc%3D%3D&limit=100".to_string()),
            webui: None,
        };
        assert_eq!(
            next_cursor(&base, Some(&links)).unwrap().as_deref(),
            Some("abc==")
        );
    }

    #[test]
    fn test_next_cursor_absent() {
        let base = Url::parse("https://acme.atlassian.net/wiki/").unwrap();
        assert_eq!(next_cursor(&base, None).unwrap(), None);
        assert_eq!(next_cursor(&base, Some(&Links::default())).unwrap(), None);
    }

    #[test]
    fn test_space_id_accepts_numbers() {
        let space: Space = serde_json::from_str(r#"{"id": 98304, "name": "Eng"}"#).unwrap();
        assert_eq!(space.id, "98304");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ConfluenceClient::new(&ConfluenceCredentials {
            base_url: "https://acme.atlassian.net/wiki".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.base.join("api/v2/spaces").unwrap().as_str(),
            "https://acme.atlassian.net/wiki/api/v2/spaces"
        );
    }
}

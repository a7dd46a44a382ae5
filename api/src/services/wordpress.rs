//! WordPress REST API client for publishing blog articles

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::WordPressConfig;

#[derive(Clone)]
struct Site {
    base_url: String,
    username: String,
    app_password: String,
}

#[derive(Clone)]
pub struct WordPressClient {
    site: Option<Site>,
    http: Client,
}

impl WordPressClient {
    /// Build a client; without credentials every publish fails with `NotConfigured`
    pub fn new(config: Option<&WordPressConfig>) -> Self {
        let site = config.map(|c| Site {
            base_url: c.site_url.trim_end_matches('/').to_string(),
            username: c.username.clone(),
            app_password: c.app_password.clone(),
        });

        Self {
            site,
            http: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.site.is_some()
    }

    fn site(&self) -> Result<&Site, WordPressError> {
        self.site.as_ref().ok_or(WordPressError::NotConfigured)
    }

    fn basic_auth_header(site: &Site) -> String {
        let credentials = format!("{}:{}", site.username, site.app_password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    /// Create a post; tag names are resolved to ids first, unresolvable tags are skipped
    pub async fn create_post(
        &self,
        title: &str,
        html: &str,
        status: &str,
        tags: &[String],
    ) -> Result<PublishedArticle, WordPressError> {
        let site = self.site()?;
        let url = format!("{}/wp-json/wp/v2/posts", site.base_url);

        let tag_ids = if tags.is_empty() {
            Vec::new()
        } else {
            self.resolve_tag_ids(tags).await?
        };

        let body = CreatePostRequest {
            title,
            content: html,
            status,
            tags: tag_ids,
        };

        let resp = self
            .http
            .post(url)
            .header("Authorization", Self::basic_auth_header(site))
            .json(&body)
            .send()
            .await?;

        let status_code = resp.status();
        if !status_code.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status_code, body = %text, "WordPress publish error");
            return Err(WordPressError::Api {
                status: status_code.as_u16(),
                body: text,
            });
        }

        let created: CreatedPost = resp.json().await?;
        tracing::info!(post_id = created.id, link = %created.link, "WordPress post published");

        Ok(PublishedArticle {
            id: created.id,
            link: created.link,
            title: created.title.rendered,
        })
    }

    /// Map tag names to ids, searching first and creating missing tags
    pub async fn resolve_tag_ids(&self, names: &[String]) -> Result<Vec<u64>, WordPressError> {
        let site = self.site()?;
        let mut ids = Vec::with_capacity(names.len());

        for name in names {
            match self.resolve_tag(site, name).await {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(tag = %name, "Could not resolve tag: {e}"),
            }
        }

        Ok(ids)
    }

    async fn resolve_tag(&self, site: &Site, name: &str) -> Result<u64, WordPressError> {
        let url = format!("{}/wp-json/wp/v2/tags", site.base_url);
        let auth = Self::basic_auth_header(site);

        let resp = self
            .http
            .get(&url)
            .header("Authorization", &auth)
            .query(&[("search", name)])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api { status, body });
        }

        let found: Vec<Tag> = resp.json().await?;
        if let Some(tag) = found.first() {
            return Ok(tag.id);
        }

        let resp = self
            .http
            .post(&url)
            .header("Authorization", &auth)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(WordPressError::Api { status, body });
        }

        let created: Tag = resp.json().await?;
        Ok(created.id)
    }
}

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<u64>,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: u64,
    link: String,
    title: RenderedText,
}

#[derive(Deserialize)]
struct RenderedText {
    rendered: String,
}

#[derive(Deserialize)]
struct Tag {
    id: u64,
}

/// A published article as reported by WordPress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArticle {
    pub id: u64,
    pub link: String,
    pub title: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WordPressError {
    #[error(
        "WordPress credentials not configured (WORDPRESS_URL, WORDPRESS_USERNAME, WORDPRESS_APP_PASSWORD)"
    )]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WordPress API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

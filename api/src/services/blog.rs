//! Blog article authoring and publishing
//!
//! Articles rotate through a fixed set of topic categories, avoiding the ones
//! used most recently, and are published to WordPress as HTML.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::{Arc, LazyLock};

use super::openai::ChatError;
use super::replies::{ReplyGenerator, Sampling};
use super::wordpress::{PublishedArticle, WordPressClient, WordPressError};
use crate::constants::BLOG_HISTORY_WINDOW;
use crate::domain::activity::{self, ActivityKind};
use crate::domain::blog_history::{self, BlogHistoryEntry};
use crate::prompts;

const BLOG_SAMPLING: Sampling = Sampling {
    max_tokens: 2000,
    temperature: 0.75,
};

/// Category recorded for articles written from a caller-supplied prompt
pub const CUSTOM_CATEGORY: &str = "custom";

/// How many recent categories are avoided when picking the next one
const RECENT_CATEGORY_WINDOW: usize = 3;

const TAG_POOL: [&str; 6] = [
    "mystery packs",
    "trading cards",
    "collector",
    "pokemon",
    "one piece",
    "tcg",
];
const FALLBACK_TAGS: [&str; 2] = ["mystery packs", "trading cards"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogCategory {
    SetSpotlight,
    CollectorGuide,
    MysteryPackEducation,
    MarketTrends,
    TierComparison,
}

pub const CATEGORIES: [BlogCategory; 5] = [
    BlogCategory::SetSpotlight,
    BlogCategory::CollectorGuide,
    BlogCategory::MysteryPackEducation,
    BlogCategory::MarketTrends,
    BlogCategory::TierComparison,
];

impl BlogCategory {
    pub fn key(&self) -> &'static str {
        match self {
            BlogCategory::SetSpotlight => "set_spotlight",
            BlogCategory::CollectorGuide => "collector_guide",
            BlogCategory::MysteryPackEducation => "mystery_pack_education",
            BlogCategory::MarketTrends => "market_trends",
            BlogCategory::TierComparison => "tier_comparison",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlogCategory::SetSpotlight => "Set Spotlight",
            BlogCategory::CollectorGuide => "Collector Guide",
            BlogCategory::MysteryPackEducation => "Mystery Pack Education",
            BlogCategory::MarketTrends => "Market & Trends",
            BlogCategory::TierComparison => "Tier Comparison",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            BlogCategory::SetSpotlight => {
                "CATEGORY: SET SPOTLIGHT\n\
                 Pick one specific Pokemon or One Piece TCG set.\n\
                 - Explain the release context, which chase cards matter and why collectors still care.\n\
                 - Reference at least two specific cards or rarity tiers from that set.\n\
                 - Explain how the set is sourced for the Standard, Premium and Deluxe tiers.\n\
                 - Target a keyword like \"[Set Name] cards worth collecting\" in the title."
            }
            BlogCategory::CollectorGuide => {
                "CATEGORY: COLLECTOR GUIDE\n\
                 Teach collectors a practical skill (grading, storage, budgeting, pack selection).\n\
                 - Provide a step-by-step framework or checklist.\n\
                 - Reference real sets and eras when giving examples.\n\
                 - Tie the advice back to how curated mystery packs can help."
            }
            BlogCategory::MysteryPackEducation => {
                "CATEGORY: MYSTERY PACK EDUCATION\n\
                 Explain how curated mystery packs should be evaluated.\n\
                 - Contrast balanced rarity and sleeved hits with junk packs.\n\
                 - Reference actual Pokemon and One Piece sets used in each tier.\n\
                 - Target keywords like \"are mystery packs worth it\"."
            }
            BlogCategory::MarketTrends => {
                "CATEGORY: MARKET & TREND ANALYSIS\n\
                 Cover what is trending in the TCG hobby right now.\n\
                 - Reference recent releases or upcoming sets.\n\
                 - Mention price and demand signals collectors care about.\n\
                 - Explain how pack curation adjusts to the market."
            }
            BlogCategory::TierComparison => {
                "CATEGORY: TIER COMPARISON\n\
                 Compare Standard, Premium and Deluxe packs.\n\
                 - Explain which collectors should pick each tier.\n\
                 - Reference example hits and sets that appear in each tier.\n\
                 - Help the reader choose the right budget."
            }
        }
    }
}

/// First category not used in the recent non-custom history, else a random one
pub fn pick_next_category(history: &[BlogHistoryEntry]) -> BlogCategory {
    let recent: Vec<&str> = history
        .iter()
        .filter_map(|h| h.category.as_deref())
        .filter(|c| *c != CUSTOM_CATEGORY)
        .take(RECENT_CATEGORY_WINDOW)
        .collect();

    CATEGORIES
        .iter()
        .copied()
        .find(|c| !recent.contains(&c.key()))
        .unwrap_or_else(random_category)
}

fn random_category() -> BlogCategory {
    use rand::Rng;
    CATEGORIES[rand::rng().random_range(0..CATEGORIES.len())]
}

/// Prompt note listing recent titles so the model avoids repeating them
pub fn history_note(history: &[BlogHistoryEntry]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = history.iter().map(|h| format!("- {}", h.title)).collect();
    format!(
        "Recent articles already published:\n{}\nDo NOT repeat these angles, keywords, or titles.",
        lines.join("\n")
    )
}

fn category_prompt(category: BlogCategory, note: &str) -> String {
    format!("{}\n\n{}", category.instructions(), note)
        .trim()
        .to_string()
}

fn custom_prompt(request: &str, note: &str) -> String {
    format!(
        "CUSTOM TOPIC REQUEST:\n{request}\n\n{note}\n\nEnsure the article aligns with all brand rules and SEO targets above."
    )
    .trim()
    .to_string()
}

/// Split model output into (title, markdown body); `None` when there is no text
pub fn split_title(raw: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = raw.lines().collect();
    let title_index = lines.iter().position(|l| !l.trim().is_empty())?;

    let title = LEADING_HASHES.replace(lines[title_index], "");
    let title = title
        .trim_start_matches('*')
        .trim_end_matches('*')
        .trim()
        .to_string();
    let body = lines[title_index + 1..].join("\n").trim().to_string();

    Some((title, body))
}

static LEADING_HASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s*").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());
static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^### (.+)$").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.+?)\]\((.+?)\)").unwrap());

const BLOCK_PREFIXES: [&str; 6] = ["<h", "<div", "<a ", "<ul", "<li", "<p"];

/// Convert the small markdown subset the writer produces into HTML
pub fn markdown_to_html(body: &str) -> String {
    let html = H2.replace_all(body, "<h2>$1</h2>");
    let html = H3.replace_all(&html, "<h3>$1</h3>");
    let html = BOLD.replace_all(&html, "<strong>$1</strong>");
    let html = EMPHASIS.replace_all(&html, "<em>$1</em>");
    let html = LINK.replace_all(&html, r#"<a href="$2">$1</a>"#);

    html.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if BLOCK_PREFIXES.iter().any(|p| line.starts_with(p)) {
                line.to_string()
            } else {
                format!("<p>{line}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pool tags mentioned in the article, or the fallback pair when none are
pub fn extract_tags(title: &str, body: &str) -> Vec<String> {
    let text = format!("{title} {body}").to_lowercase();
    let tags: Vec<String> = TAG_POOL
        .iter()
        .filter(|t| text.contains(*t))
        .map(|t| t.to_string())
        .collect();

    if tags.is_empty() {
        FALLBACK_TAGS.iter().map(|t| t.to_string()).collect()
    } else {
        tags
    }
}

/// A generated article ready for preview or publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub category: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Blog generation failed: {0}")]
    Generation(#[from] ChatError),
    #[error("Generated article has no title")]
    Untitled,
    #[error(transparent)]
    WordPress(#[from] WordPressError),
}

pub struct BlogPublisher {
    db: PgPool,
    replies: Arc<ReplyGenerator>,
    wordpress: WordPressClient,
}

impl BlogPublisher {
    pub fn new(db: PgPool, replies: Arc<ReplyGenerator>, wordpress: WordPressClient) -> Self {
        Self {
            db,
            replies,
            wordpress,
        }
    }

    /// Generate an article without publishing it
    pub async fn generate(&self, custom: Option<&str>) -> Result<BlogDraft, BlogError> {
        let history = blog_history::recent_blog_history(&self.db, BLOG_HISTORY_WINDOW).await?;
        draft_article(&self.replies, &history, custom).await
    }

    /// Generate an article, publish it and record it in history
    pub async fn publish_daily(&self, custom: Option<&str>) -> Result<PublishedArticle, BlogError> {
        if !self.wordpress.is_configured() {
            return Err(WordPressError::NotConfigured.into());
        }

        let draft = self.generate(custom).await?;
        let article = self
            .wordpress
            .create_post(&draft.title, &draft.content, "publish", &draft.tags)
            .await?;

        blog_history::insert_blog_history(&self.db, &draft.title, &draft.category).await?;
        activity::record_activity(
            &self.db,
            ActivityKind::Blog,
            &format!("Blog post published: {} ({})", article.title, article.link),
        )
        .await?;

        tracing::info!(link = %article.link, category = %draft.category, "Daily post published");
        Ok(article)
    }
}

/// Write an article given recent history (newest first)
pub async fn draft_article(
    replies: &ReplyGenerator,
    history: &[BlogHistoryEntry],
    custom: Option<&str>,
) -> Result<BlogDraft, BlogError> {
    let note = history_note(history);

    let (category, user_prompt) = match custom.map(str::trim).filter(|p| !p.is_empty()) {
        Some(request) => (CUSTOM_CATEGORY.to_string(), custom_prompt(request, &note)),
        None => {
            let next = pick_next_category(history);
            tracing::info!(category = next.label(), "Generating blog post");
            (next.key().to_string(), category_prompt(next, &note))
        }
    };

    let raw = replies
        .author(prompts::BLOG_SYSTEM_PROMPT, &user_prompt, BLOG_SAMPLING)
        .await?;

    let (title, body) = split_title(&raw).ok_or(BlogError::Untitled)?;
    if title.is_empty() {
        return Err(BlogError::Untitled);
    }

    Ok(BlogDraft {
        content: markdown_to_html(&body),
        tags: extract_tags(&title, &body),
        title,
        category,
    })
}

//! Blog article generation and title cleanup

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::BrandProfile;
use crate::llm::{LlmClient, LlmRequest};
use crate::types::{GeneratedArticle, Outcome};

const TITLE_MARKER: &str = "Title:";
const CONTENT_MARKER: &str = "Content:";

/// Body used when the model could not be reached at all
pub const GENERATION_ERROR_BODY: &str = "An error occurred while generating text.";

const CONTENT_TEMPERATURE: f32 = 0.9;
const CONTENT_MAX_TOKENS: usize = 1024;
const PREVIEW_CHARS: usize = 500;

/// Turns collected search text into a titled article.
pub struct ContentGenerator {
    llm: Arc<LlmClient>,
    brand: BrandProfile,
}

impl ContentGenerator {
    pub fn new(llm: Arc<LlmClient>, brand: BrandProfile) -> Self {
        Self { llm, brand }
    }

    /// Ask the model for one article. Never fails: a missing marker or a
    /// provider error yields the placeholder title as a fallback.
    pub async fn generate(&self, latest_info: &str) -> Outcome<GeneratedArticle> {
        info!("✍️  Generating blog post content and title via {}", self.llm.provider_name());

        let request = LlmRequest::user(build_prompt(&self.brand, latest_info))
            .with_temperature(CONTENT_TEMPERATURE)
            .with_max_tokens(CONTENT_MAX_TOKENS);

        let reply = match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                error!("Error generating blog content: {}", e);
                return Outcome::fallback(
                    GeneratedArticle {
                        title: self.brand.placeholder_title.clone(),
                        body: GENERATION_ERROR_BODY.to_string(),
                    },
                    e.to_string(),
                );
            }
        };

        let outcome = match parse_article(&reply) {
            Some(article) => Outcome::Generated(article),
            None => {
                warn!("Model reply lacks Title:/Content: markers, using placeholder title");
                Outcome::fallback(
                    GeneratedArticle {
                        title: self.brand.placeholder_title.clone(),
                        body: reply,
                    },
                    "reply did not contain Title:/Content: markers",
                )
            }
        };

        let article = outcome.value();
        debug!("Generated title: {}", article.title);
        debug!(
            "Blog content preview: {}...",
            article.body.chars().take(PREVIEW_CHARS).collect::<String>()
        );
        outcome
    }
}

/// Build the copywriting prompt around the search summary.
pub fn build_prompt(brand: &BrandProfile, latest_info: &str) -> String {
    format!(
        r#"You are a professional content writer creating a unique blog post for {name}, {description}.

Using the latest information provided:
{info}

Write an engaging blog post that:
- Mentions "{keyword}" ({name} is the company name) and other relevant keywords for SEO.
- Has a friendly and promotional tone that appeals to prospective customers.
- Concludes with a call-to-action encouraging readers to get in touch for more details.

Additionally, generate a unique and catchy blog post title that:
- Includes "{name}" and is SEO-friendly.
- Reflects the blog post content.
- Avoids repeating previously generated titles; base it on the blog post content and the information above.

Format your output strictly as:
Title: [Unique blog post title]
Content: [Engaging blog post content]"#,
        name = brand.name,
        description = brand.description,
        keyword = brand.keyword,
        info = latest_info,
    )
}

/// Split a model reply into title and body.
///
/// The title is the text after the first `Title:`, cut at the next `Title:`
/// and then at the first `Content:`. The body is the text after the first
/// `Content:`, cut at the next `Content:`. Returns `None` when either marker
/// is missing.
pub fn parse_article(reply: &str) -> Option<GeneratedArticle> {
    let title = marker_segment(reply, TITLE_MARKER)?;
    let title = title.split(CONTENT_MARKER).next().unwrap_or_default();
    let body = marker_segment(reply, CONTENT_MARKER)?;

    Some(GeneratedArticle {
        title: title.trim().to_string(),
        body: body.trim().to_string(),
    })
}

/// Text between the first and second occurrence of `marker`.
fn marker_segment<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.split(marker).nth(1)
}

/// Drop every `*` and `"` and trim the result.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| *c != '*' && *c != '"')
        .collect::<String>()
        .trim()
        .to_string()
}

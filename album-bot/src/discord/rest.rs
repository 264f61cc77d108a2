use crate::http::{expect_success, HttpClient};
use crate::types::{Announcement, BotError, DiscordConfig, PostId, Result};
use async_trait::async_trait;
use interfaces::defs::ChatPlatform;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

const API_BASE: &str = "https://discord.com/api/v10/";

const EMBED_COLOR: u32 = 0x1db954;

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    description: &'a str,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedImage<'a>>,
    footer: EmbedFooter<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedImage<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

impl<'a> From<&'a Announcement> for Embed<'a> {
    fn from(announcement: &'a Announcement) -> Self {
        Self {
            title: &announcement.title,
            url: announcement.url.as_deref(),
            description: &announcement.description,
            color: EMBED_COLOR,
            thumbnail: announcement.cover_url.as_deref().map(|url| EmbedImage { url }),
            footer: EmbedFooter {
                text: &announcement.footer,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    #[serde(default)]
    embeds: Vec<Value>,
}

/// Discord REST client posting into a single channel.
pub struct DiscordClient {
    http: HttpClient,
    config: DiscordConfig,
    base: Url,
}

impl DiscordClient {
    pub fn new(http: HttpClient, config: DiscordConfig) -> Result<Self> {
        Ok(Self {
            http,
            config,
            base: Url::parse(API_BASE)?,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BotError::Config("invalid discord api url".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.config.token)
    }

    fn message_url(&self, post_id: &PostId) -> Result<Url> {
        self.url(&["channels", &self.config.channel_id, "messages", &post_id.0])
    }

    async fn create_message(&self, announcement: &Announcement) -> Result<PostId> {
        let url = self.url(&["channels", &self.config.channel_id, "messages"])?;
        let body = json!({ "embeds": [Embed::from(announcement)] });

        let response = self
            .http
            .send("discord send", |client| {
                client.post(url.clone()).header("Authorization", self.auth()).json(&body)
            })
            .await?;
        let message: Message = expect_success("discord send", response).await?.json().await?;

        info!("Posted {} as message {}", announcement.title, message.id);
        Ok(PostId(message.id))
    }

    async fn put_reaction(&self, post_id: &PostId, emoji: &str) -> Result<()> {
        // The emoji is percent-encoded as a path segment.
        let url = self.url(&[
            "channels",
            &self.config.channel_id,
            "messages",
            &post_id.0,
            "reactions",
            emoji,
            "@me",
        ])?;

        let response = self
            .http
            .send("discord reaction", |client| {
                client
                    .put(url.clone())
                    .header("Authorization", self.auth())
                    .header("Content-Length", "0")
            })
            .await?;
        expect_success("discord reaction", response).await?;
        Ok(())
    }

    async fn patch_footer(&self, post_id: &PostId, footer: &str) -> Result<()> {
        let url = self.message_url(post_id)?;

        let response = self
            .http
            .send("discord fetch", |client| {
                client.get(url.clone()).header("Authorization", self.auth())
            })
            .await?;
        let message: Message = expect_success("discord fetch", response).await?.json().await?;

        let mut embed = message
            .embeds
            .into_iter()
            .next()
            .ok_or_else(|| BotError::PublishFailed(format!("message {} has no embed", post_id)))?;
        embed["footer"] = json!({ "text": footer });

        let body = json!({ "embeds": [embed] });
        let response = self
            .http
            .send("discord edit", |client| {
                client.patch(url.clone()).header("Authorization", self.auth()).json(&body)
            })
            .await?;
        expect_success("discord edit", response).await?;

        debug!("Updated footer of {}: {}", post_id, footer);
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn send(&self, announcement: &Announcement) -> anyhow::Result<PostId> {
        Ok(self.create_message(announcement).await?)
    }

    async fn add_reaction_option(&self, post_id: &PostId, emoji: &str) -> anyhow::Result<()> {
        Ok(self.put_reaction(post_id, emoji).await?)
    }

    async fn edit_footer(&self, post_id: &PostId, footer: &str) -> anyhow::Result<()> {
        Ok(self.patch_footer(post_id, footer).await?)
    }
}

//! Language-model text generation and speech synthesis.
//!
//! Two small traits define what the pipeline needs from a model provider:
//! - [`TextGenerator`]: chat-style completion returning plain text
//! - [`SpeechSynthesizer`]: text in, encoded audio bytes out
//!
//! [`OpenAiClient`] implements both against an OpenAI-compatible HTTP API.
//! The prompt builders and [`generate_summary_ja`] / [`generate_script_ja`]
//! are provider-agnostic, which is what the tests exercise.
//!
//! There is no retry layer. A failed call fails the run and the next
//! scheduled run starts over.

use crate::error::{Error, Result};
use crate::models::PaperEntry;
use crate::utils::truncate_for_log;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// One chat request: a system instruction, a user message and a sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

pub trait TextGenerator {
    /// Complete `prompt` and return the trimmed, non-empty reply.
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;
}

pub trait SpeechSynthesizer {
    /// Synthesize `text` and return MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Client for an OpenAI-compatible API.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    /// Chat model, e.g. `gpt-4o-mini`.
    pub text_model: String,
    /// Speech model, e.g. `gpt-4o-mini-tts`.
    pub tts_model: String,
    pub voice: String,
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("tts_model", &self.tts_model)
            .field("voice", &self.voice)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        text_model: impl Into<String>,
        tts_model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            text_model: text_model.into(),
            tts_model: tts_model.into(),
            voice: voice.into(),
        })
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status {
                service: "OpenAI API",
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        Ok(resp)
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let resp: ChatResponse = self.post_json("chat/completions", request).await?.json().await?;
        non_empty_reply(resp)
    }

    async fn speech(&self, request: &SpeechRequest<'_>) -> Result<Vec<u8>> {
        let bytes = self.post_json("audio/speech", request).await?.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::BadResponse {
                service: "OpenAI API",
                reason: "speech response was empty".to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'static str,
}

impl TextGenerator for OpenAiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.text_model))]
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.text_model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: prompt.temperature,
        };
        let res = self.chat(&request).await;

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &res {
            Ok(text) => info!(elapsed_ms, chars = text.chars().count(), "Chat completion succeeded"),
            Err(e) => error!(elapsed_ms, error = %e, "Chat completion failed"),
        }
        res
    }
}

impl SpeechSynthesizer for OpenAiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.tts_model, voice = %self.voice))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let t0 = Instant::now();
        let request = SpeechRequest {
            model: &self.tts_model,
            voice: &self.voice,
            input: text,
            response_format: "mp3",
        };
        let res = self.speech(&request).await;

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &res {
            Ok(audio) => info!(elapsed_ms, bytes = audio.len(), "Speech synthesis succeeded"),
            Err(e) => error!(elapsed_ms, error = %e, "Speech synthesis failed"),
        }
        res
    }
}

fn non_empty_reply(resp: ChatResponse) -> Result<String> {
    let text = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(Error::BadResponse {
            service: "OpenAI API",
            reason: "chat completion returned no text".to_string(),
        });
    }
    Ok(text)
}

pub fn summary_prompt(entry: &PaperEntry) -> ChatPrompt {
    ChatPrompt {
        system: "あなたは厳密で簡潔な技術ライターです。論文の背景・課題・手法・結果・限界を日本語でMarkdownとして要約してください。".to_string(),
        user: format!(
            "論文情報:\n\
             タイトル: {title}\n\
             著者: {authors}\n\
             arXiv: {link}\n\
             概要(英語): {summary}\n\
             \n\
             出力要件:\n\
             - Markdown見出しと箇条書きを活用\n\
             - 必ず「限界 / 今後の展望」を含める\n\
             - 200-350日本語単語程度\n",
            title = entry.title,
            authors = entry.authors.join(", "),
            link = entry.link,
            summary = entry.summary,
        ),
        temperature: 0.4,
    }
}

pub fn script_prompt(entry: &PaperEntry, summary_ja: &str) -> ChatPrompt {
    ChatPrompt {
        system: "あなたは日本語のPodcast台本作家です。丁寧だが親しみやすい口語で、500–900字の原稿を作成します。".to_string(),
        user: format!(
            "次の論文を1本のPodcast原稿にしてください。\n\
             条件:\n\
             - 冒頭に論文タイトルを自然に紹介\n\
             - 著者名とarXivリンクを言及\n\
             - 背景→貢献→仕組み→結果→限界→締め、の流れ\n\
             - 専門用語は簡単に噛み砕く\n\
             - 一文は短く、リズム良く\n\
             \n\
             タイトル: {title}\n\
             著者: {authors}\n\
             リンク: {link}\n\
             要約(素材):\n\
             {summary_ja}\n",
            title = entry.title,
            authors = entry.authors.join(", "),
            link = entry.link,
        ),
        temperature: 0.7,
    }
}

/// Japanese Markdown summary of a paper.
#[instrument(level = "info", skip_all, fields(id = %entry.id))]
pub async fn generate_summary_ja<G: TextGenerator>(generator: &G, entry: &PaperEntry) -> Result<String> {
    generator.complete(&summary_prompt(entry)).await
}

/// Spoken-style Japanese podcast script built from the summary.
#[instrument(level = "info", skip_all, fields(id = %entry.id))]
pub async fn generate_script_ja<G: TextGenerator>(
    generator: &G,
    entry: &PaperEntry,
    summary_ja: &str,
) -> Result<String> {
    generator.complete(&script_prompt(entry, summary_ja)).await
}

//! Chapter and commentary sources
//!
//! `HttpContentSource` talks to the `noor-api` service (JSON envelopes with a
//! `code` field); `QuranComSource` talks to the public quran.com v4 API and is
//! what the service itself sits in front of.

use crate::content::{ChapterNumber, RawChapter, RawVerse};
use crate::error::NoorError;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use regex_lite::Regex;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

pub const QURAN_COM_BASE_URL: &str = "https://api.quran.com/api/v4";

/// Muyassar commentary on quran.com
pub const TAFSIR_ID: u32 = 16;

/// Upper bound on verses per chapter (the longest chapter has 286).
const VERSES_PER_REQUEST: u32 = 300;

const USER_AGENT: &str = concat!("noor/", env!("CARGO_PKG_VERSION"));

pub const RECITATION_BASE_URL: &str = "https://everyayah.com/data/Alafasy_128kbps";

/// Audio file of one recited verse, e.g. `.../002255.mp3`.
pub fn recitation_url(chapter: ChapterNumber, verse: u32) -> String {
    format!("{}/{:03}{:03}.mp3", RECITATION_BASE_URL, chapter.get(), verse)
}

/// Where chapters come from.
pub trait ChapterSource: Send + Sync {
    fn fetch_chapter(&self, number: ChapterNumber) -> BoxFuture<'_, Result<RawChapter, NoorError>>;
}

/// Where verse commentary comes from. `Ok(None)` means "not available for
/// this verse", which is not an error.
pub trait CommentarySource: Send + Sync {
    fn fetch_commentary(
        &self,
        chapter: ChapterNumber,
        verse: u32,
    ) -> BoxFuture<'_, Result<Option<String>, NoorError>>;
}

// ============ Wire types of the noor-api service ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterEnvelope {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChapterPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterPayload {
    pub number: u16,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ayahs: Option<Vec<PayloadVerse>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadVerse {
    pub number_in_surah: u32,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentaryEnvelope {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CommentaryPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentaryPayload {
    pub surah: u16,
    pub ayah: u32,
    pub tafsir: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl From<ChapterPayload> for RawChapter {
    fn from(payload: ChapterPayload) -> Self {
        RawChapter {
            number: payload.number,
            name: payload.name,
            verses: payload.ayahs.map(|ayahs| {
                ayahs
                    .into_iter()
                    .map(|a| RawVerse {
                        number_in_chapter: a.number_in_surah,
                        text: a.text,
                    })
                    .collect()
            }),
        }
    }
}

impl From<RawChapter> for ChapterPayload {
    fn from(raw: RawChapter) -> Self {
        ChapterPayload {
            number: raw.number,
            name: raw.name,
            ayahs: raw.verses.map(|verses| {
                verses
                    .into_iter()
                    .map(|v| PayloadVerse {
                        number_in_surah: v.number_in_chapter,
                        text: v.text,
                    })
                    .collect()
            }),
        }
    }
}

/// Decode a chapter envelope; anything but `code == 200` with data is invalid.
pub fn parse_chapter_envelope(body: &str) -> Result<RawChapter, NoorError> {
    let envelope: ChapterEnvelope = serde_json::from_str(body)
        .map_err(|e| NoorError::InvalidPayload(format!("chapter envelope: {}", e)))?;
    match envelope {
        ChapterEnvelope { code: 200, data: Some(data), .. } => Ok(data.into()),
        ChapterEnvelope { code, message, .. } => Err(NoorError::InvalidPayload(format!(
            "chapter envelope code {}: {}",
            code,
            message.unwrap_or_else(|| "missing data".to_string())
        ))),
    }
}

pub fn parse_commentary_envelope(body: &str) -> Result<Option<String>, NoorError> {
    let envelope: CommentaryEnvelope = serde_json::from_str(body)
        .map_err(|e| NoorError::InvalidPayload(format!("commentary envelope: {}", e)))?;
    Ok(envelope
        .data
        .map(|d| d.tafsir)
        .filter(|text| !text.trim().is_empty()))
}

// ============ quran.com v4 wire types ============

#[derive(Debug, Deserialize)]
struct UpstreamChapterResponse {
    chapter: UpstreamChapter,
}

#[derive(Debug, Deserialize)]
struct UpstreamChapter {
    id: u16,
    name_arabic: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamVersesResponse {
    verses: Option<Vec<UpstreamVerse>>,
}

#[derive(Debug, Deserialize)]
struct UpstreamVerse {
    verse_number: u32,
    text_uthmani: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamTafsirResponse {
    tafsir: Option<UpstreamTafsir>,
}

#[derive(Debug, Deserialize)]
struct UpstreamTafsir {
    text: Option<String>,
}

pub fn parse_upstream_chapter(chapter_body: &str, verses_body: &str) -> Result<RawChapter, NoorError> {
    let chapter: UpstreamChapterResponse = serde_json::from_str(chapter_body)
        .map_err(|e| NoorError::InvalidPayload(format!("upstream chapter: {}", e)))?;
    let verses: UpstreamVersesResponse = serde_json::from_str(verses_body)
        .map_err(|e| NoorError::InvalidPayload(format!("upstream verses: {}", e)))?;

    Ok(RawChapter {
        number: chapter.chapter.id,
        name: chapter.chapter.name_arabic,
        verses: verses.verses.map(|verses| {
            verses
                .into_iter()
                .map(|v| RawVerse {
                    number_in_chapter: v.verse_number,
                    text: v.text_uthmani.or(v.text),
                })
                .collect()
        }),
    })
}

pub fn parse_upstream_tafsir(body: &str) -> Result<Option<String>, NoorError> {
    let response: UpstreamTafsirResponse = serde_json::from_str(body)
        .map_err(|e| NoorError::InvalidPayload(format!("upstream tafsir: {}", e)))?;
    Ok(response
        .tafsir
        .and_then(|t| t.text)
        .map(|text| strip_html(&text))
        .filter(|text| !text.is_empty()))
}

/// Remove markup tags from provider HTML, keeping the text.
pub fn strip_html(text: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    match TAGS.get_or_init(|| Regex::new(r"<[^>]*>").ok()) {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

// ============ HTTP plumbing ============

fn build_client(timeout: Duration) -> Result<reqwest::Client, NoorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NoorError::Other(format!("failed to build HTTP client: {}", e)))
}

/// GET a URL and return its status and body.
async fn get_body(client: &reqwest::Client, url: &str) -> Result<(StatusCode, String), NoorError> {
    let response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn http_error(status: StatusCode, body: &str) -> NoorError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message);
    NoorError::http(status.as_u16(), message)
}

/// Body of a 2xx response. Other statuses carry the `message` of a JSON
/// error body when there is one.
async fn get_success_body(client: &reqwest::Client, url: &str) -> Result<String, NoorError> {
    let (status, body) = get_body(client, url).await?;
    if !status.is_success() {
        return Err(http_error(status, &body));
    }
    Ok(body)
}

/// Client for the noor-api service.
#[derive(Clone)]
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NoorError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn chapter(&self, number: ChapterNumber) -> Result<RawChapter, NoorError> {
        let url = format!("{}/quran/{}", self.base_url, number);
        let body = get_success_body(&self.client, &url).await?;
        parse_chapter_envelope(&body)
    }

    async fn commentary(&self, chapter: ChapterNumber, verse: u32) -> Result<Option<String>, NoorError> {
        let url = format!("{}/tafsir?surah={}&ayah={}", self.base_url, chapter, verse);
        let (status, body) = get_body(&self.client, &url).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(http_error(status, &body));
        }
        parse_commentary_envelope(&body)
    }
}

impl ChapterSource for HttpContentSource {
    fn fetch_chapter(&self, number: ChapterNumber) -> BoxFuture<'_, Result<RawChapter, NoorError>> {
        self.chapter(number).boxed()
    }
}

impl CommentarySource for HttpContentSource {
    fn fetch_commentary(
        &self,
        chapter: ChapterNumber,
        verse: u32,
    ) -> BoxFuture<'_, Result<Option<String>, NoorError>> {
        self.commentary(chapter, verse).boxed()
    }
}

/// Client for the public quran.com v4 API.
#[derive(Clone)]
pub struct QuranComSource {
    client: reqwest::Client,
    base_url: String,
}

impl QuranComSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, NoorError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn chapter(&self, number: ChapterNumber) -> Result<RawChapter, NoorError> {
        let chapter_url = format!("{}/chapters/{}?language=ar", self.base_url, number);
        let verses_url = format!(
            "{}/verses/by_chapter/{}?per_page={}&fields=text_uthmani",
            self.base_url, number, VERSES_PER_REQUEST
        );

        let (chapter, verses) = futures_util::future::try_join(
            get_success_body(&self.client, &chapter_url),
            get_success_body(&self.client, &verses_url),
        )
        .await?;

        parse_upstream_chapter(&chapter, &verses)
    }

    async fn commentary(&self, chapter: ChapterNumber, verse: u32) -> Result<Option<String>, NoorError> {
        let url = format!(
            "{}/tafsirs/{}/by_ayah/{}:{}",
            self.base_url, TAFSIR_ID, chapter, verse
        );
        let (status, body) = get_body(&self.client, &url).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(http_error(status, &body));
        }
        parse_upstream_tafsir(&body)
    }
}

impl ChapterSource for QuranComSource {
    fn fetch_chapter(&self, number: ChapterNumber) -> BoxFuture<'_, Result<RawChapter, NoorError>> {
        self.chapter(number).boxed()
    }
}

impl CommentarySource for QuranComSource {
    fn fetch_commentary(
        &self,
        chapter: ChapterNumber,
        verse: u32,
    ) -> BoxFuture<'_, Result<Option<String>, NoorError>> {
        self.commentary(chapter, verse).boxed()
    }
}

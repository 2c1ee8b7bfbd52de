use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::error::NoteError;
use crate::{Segment, VideoInfo};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Caption languages requested, most preferred first
pub const CAPTION_LANGUAGES: [&str; 2] = ["ko", "en"];

/// Why captions could not be retrieved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    #[error("no captions in the requested languages for video {0}")]
    NoTranscript(String),

    #[error("captions are disabled for video {0}")]
    Disabled(String),

    #[error("video {0} is unavailable")]
    VideoUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for CaptionError {
    fn from(e: reqwest::Error) -> Self {
        CaptionError::Other(e.to_string())
    }
}

impl From<CaptionError> for NoteError {
    fn from(e: CaptionError) -> Self {
        match e {
            CaptionError::NoTranscript(_) => NoteError::NoTranscript,
            CaptionError::Disabled(_) => NoteError::TranscriptsDisabled,
            CaptionError::VideoUnavailable(_) => NoteError::VideoUnavailable,
            CaptionError::Other(message) => NoteError::Transcript(message),
        }
    }
}

/// Source of timed captions for a video
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch_captions(&self, video_id: &str, languages: &[&str]) -> Result<Vec<Segment>, CaptionError>;
}

/// Source of video metadata; lookups never fail, they fall back
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn video_info(&self, video_id: &str) -> VideoInfo;
}

/// Talks to youtube.com for captions (InnerTube) and titles (oEmbed)
#[derive(Clone)]
pub struct YouTube {
    client: reqwest::Client,
    timeout: Duration,
}

impl YouTube {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn get_text(&self, url: &str) -> Result<String, CaptionError> {
        let text = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    /// "asr" for auto-generated tracks
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
}

#[async_trait]
impl CaptionSource for YouTube {
    async fn fetch_captions(&self, video_id: &str, languages: &[&str]) -> Result<Vec<Segment>, CaptionError> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        debug!("Fetching watch page: {watch_url}");

        let page_html = self.get_text(&watch_url).await?;
        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": languages.first().copied().unwrap_or("en"),
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let track = select_track(resp, video_id, languages)?;
        debug!("Using caption track: lang={} kind={:?}", track.language_code, track.kind);

        // Step 3: Fetch the caption XML
        let caption_xml = self.get_text(&track.base_url).await?;
        parse_caption_xml(&caption_xml)
    }
}

#[async_trait]
impl MetadataSource for YouTube {
    async fn video_info(&self, video_id: &str) -> VideoInfo {
        let url = format!("https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={video_id}&format=json");
        debug!("Fetching oEmbed metadata: {url}");

        let resp = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!("oEmbed lookup for {video_id} returned {}", resp.status());
                return VideoInfo::fallback(video_id);
            }
            Err(e) => {
                warn!("oEmbed lookup for {video_id} failed: {e}");
                return VideoInfo::fallback(video_id);
            }
        };

        match resp.json::<OEmbedResponse>().await {
            Ok(OEmbedResponse { title: Some(title) }) if !title.trim().is_empty() => VideoInfo {
                video_id: video_id.to_string(),
                title,
            },
            Ok(_) => VideoInfo::fallback(video_id),
            Err(e) => {
                warn!("oEmbed response for {video_id} was not usable: {e}");
                VideoInfo::fallback(video_id)
            }
        }
    }
}

/// Pick a caption track following the language preference, manual tracks before auto-generated
fn select_track(resp: InnerTubePlayerResponse, video_id: &str, languages: &[&str]) -> Result<CaptionTrack, CaptionError> {
    if let Some(status) = resp.playability_status.as_ref() {
        let code = status.status.as_deref().unwrap_or("OK");
        if code != "OK" {
            debug!("Video {video_id} not playable: {code} {:?}", status.reason);
            return Err(CaptionError::VideoUnavailable(video_id.to_string()));
        }
    }

    let Some(captions) = resp.captions else {
        return Err(CaptionError::Disabled(video_id.to_string()));
    };

    let tracks = captions
        .player_captions_tracklist_renderer
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default();

    for lang in languages {
        let candidates: Vec<&CaptionTrack> = tracks.iter().filter(|t| t.language_code == *lang).collect();
        let manual = candidates.iter().find(|t| t.kind.as_deref() != Some("asr"));
        if let Some(track) = manual.or(candidates.first()) {
            return Ok((*track).clone());
        }
    }

    Err(CaptionError::NoTranscript(video_id.to_string()))
}

fn extract_api_key(html: &str) -> Result<String, CaptionError> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#).map_err(|e| CaptionError::Other(e.to_string()))?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#).map_err(|e| CaptionError::Other(e.to_string()))?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    Err(CaptionError::Other(
        "could not extract InnerTube API key from watch page".to_string(),
    ))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>, CaptionError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                current_start = None;
                current_dur = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                    match attr.key.as_ref() {
                        b"start" => current_start = value,
                        b"dur" => current_dur = value,
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(start) = current_start.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration: current_dur.take().unwrap_or(0.0),
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CaptionError::Other(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(segments)
}

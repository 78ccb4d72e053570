// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML-scrape fallback for image posts.
//!
//! When every extractor-driven strategy has failed, the post's canonical
//! page is fetched directly and scanned for embedded image URLs. The markup
//! is undocumented and volatile, so several redundant techniques run in
//! priority order: JSON-LD blocks, og/twitter meta tags, page-state JSON
//! blobs, CDN regex sweeps, lazy-load attributes, and three escalating
//! catch-all regexes.
//!
//! Candidates are tiered (premium / good / crop) and quality-sorted before
//! download; every downloaded body must decode as an image before it is
//! accepted.

use std::path::PathBuf;
use std::sync::LazyLock;

use clipfetch_core::{ClipfetchError, MediaFile};
use regex::Regex;
use tracing::{debug, warn};

use crate::cookies::cookie_header_from_jar;
use crate::strategy::StrategyContext;
use crate::BROWSER_USER_AGENT;

/// Dimensions at or above this are near-original; accept immediately.
const ACCEPT_FULL: u32 = 1080;
/// Still a good rendition; accept immediately.
const ACCEPT_GOOD: u32 = 640;
/// Below this an image is unusable even as a last resort.
const MIN_USABLE: u32 = 200;

/// Static-asset path fragments that disqualify a meta-tag or CDN URL.
const STATIC_ASSET_MARKERS: &[&str] = &[
    "/static/",
    "/rsrc.php",
    "favicon",
    "sprite",
    "logo",
    "/icons/",
];

/// URL fragments indicating a cropped or heavily downsized rendition.
const CROP_MARKERS: &[&str] = &["crop", "stp=c", "s150x150", "s320x320", "p150x150"];

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script[^>]*type="application/ld\+json"[^>]*>(.*?)</script>"#)
        .unwrap_or_else(|e| panic!("invalid json-ld regex: {e}"))
});

static META_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<meta[^>]+(?:property|name)="(?:og:image|twitter:image)"[^>]+content="([^"]+)""#,
    )
    .unwrap_or_else(|e| panic!("invalid meta regex: {e}"))
});

static DISPLAY_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""display_url"\s*:\s*"([^"]+)""#)
        .unwrap_or_else(|e| panic!("invalid display_url regex: {e}"))
});

static RESOURCE_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{"src"\s*:\s*"([^"]+)"\s*,\s*"config_width"\s*:\s*(\d+)\s*,\s*"config_height"\s*:\s*(\d+)\}"#,
    )
    .unwrap_or_else(|e| panic!("invalid resource regex: {e}"))
});

static CANDIDATE_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{"width"\s*:\s*(\d+)\s*,\s*"height"\s*:\s*(\d+)\s*,\s*"url"\s*:\s*"([^"]+)"\}"#)
        .unwrap_or_else(|e| panic!("invalid candidate regex: {e}"))
});

static PLATFORM_CDN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://[^"'\\\s]+(?:cdninstagram\.com|fbcdn\.net)[^"'\\\s]*"#)
        .unwrap_or_else(|e| panic!("invalid cdn regex: {e}"))
});

static LAZY_LOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-(?:src|lazy-src|original)="(https://[^"]+)""#)
        .unwrap_or_else(|e| panic!("invalid lazy-load regex: {e}"))
});

static ANY_IMAGE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://[^"'\\\s]+\.(?:jpg|jpeg|png|webp)(?:\?[^"'\\\s]*)?"#)
        .unwrap_or_else(|e| panic!("invalid image-url regex: {e}"))
});

static PERMISSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https://[^"'\\\s]{16,}|data:image/[a-z]+;base64,[A-Za-z0-9+/=]{64,})"#)
        .unwrap_or_else(|e| panic!("invalid permissive regex: {e}"))
});

static URL_DIMENSIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[sp](\d{2,4})x(\d{2,4})")
        .unwrap_or_else(|e| panic!("invalid dimensions regex: {e}"))
});

/// Quality tier of a scraped candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Tier {
    /// Explicitly tagged full-resolution / uncropped.
    Premium,
    /// No crop indicator.
    Good,
    /// Carries a crop marker; only tried when nothing else worked.
    Crop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub url: String,
    pub tier: Tier,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Candidate {
    fn new(url: String, tier: Tier) -> Self {
        let tier = if tier != Tier::Premium && CROP_MARKERS.iter().any(|m| url.contains(m)) {
            Tier::Crop
        } else {
            tier
        };
        let (width, height) = dimensions_from_url(&url);
        Candidate {
            url,
            tier,
            width,
            height,
        }
    }

    fn area(&self) -> u64 {
        u64::from(self.width.unwrap_or(0)) * u64::from(self.height.unwrap_or(0))
    }

    /// Hostname heuristic for breaking area ties: primary content hosts
    /// beat generic ones.
    fn host_quality(&self) -> u8 {
        if self.url.contains("scontent") {
            2
        } else if self.url.contains("cdninstagram") || self.url.contains("fbcdn") {
            1
        } else {
            0
        }
    }
}

fn dimensions_from_url(url: &str) -> (Option<u32>, Option<u32>) {
    if let Some(caps) = URL_DIMENSIONS_RE.captures(url) {
        let w = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let h = caps.get(2).and_then(|m| m.as_str().parse().ok());
        (w, h)
    } else {
        (None, None)
    }
}

/// JSON-embedded URLs arrive with escaped slashes and ampersands.
fn unescape_json_url(url: &str) -> String {
    url.replace("\\u0026", "&").replace("\\/", "/")
}

fn is_static_asset(url: &str) -> bool {
    let lower = url.to_lowercase();
    STATIC_ASSET_MARKERS.iter().any(|m| lower.contains(m))
}

fn push_unique(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if !candidates.iter().any(|c| c.url == candidate.url) {
        candidates.push(candidate);
    }
}

/// Scans page HTML for image URL candidates using every known technique,
/// in priority order.
pub(crate) fn extract_candidates(html: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    // 1. JSON-LD structured data.
    for caps in JSON_LD_RE.captures_iter(html) {
        if let Some(block) = caps.get(1)
            && let Ok(value) = serde_json::from_str::<serde_json::Value>(block.as_str())
        {
            let images = match value.get("image") {
                Some(serde_json::Value::String(s)) => vec![s.clone()],
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
                _ => vec![],
            };
            for url in images {
                push_unique(&mut candidates, Candidate::new(url, Tier::Premium));
            }
        }
    }

    // 2. og:image / twitter:image meta tags.
    for caps in META_IMAGE_RE.captures_iter(html) {
        if let Some(url) = caps.get(1) {
            let url = unescape_json_url(url.as_str());
            if !is_static_asset(&url) {
                push_unique(&mut candidates, Candidate::new(url, Tier::Good));
            }
        }
    }

    // 3. Page-state JSON: display_url is the uncropped original; the
    // resource/candidate arrays carry explicit dimensions.
    for caps in DISPLAY_URL_RE.captures_iter(html) {
        if let Some(url) = caps.get(1) {
            push_unique(
                &mut candidates,
                Candidate::new(unescape_json_url(url.as_str()), Tier::Premium),
            );
        }
    }
    for caps in RESOURCE_ENTRY_RE.captures_iter(html) {
        if let (Some(url), Some(w), Some(h)) = (caps.get(1), caps.get(2), caps.get(3)) {
            let mut candidate =
                Candidate::new(unescape_json_url(url.as_str()), Tier::Premium);
            candidate.width = w.as_str().parse().ok();
            candidate.height = h.as_str().parse().ok();
            push_unique(&mut candidates, candidate);
        }
    }
    for caps in CANDIDATE_ENTRY_RE.captures_iter(html) {
        if let (Some(w), Some(h), Some(url)) = (caps.get(1), caps.get(2), caps.get(3)) {
            let mut candidate =
                Candidate::new(unescape_json_url(url.as_str()), Tier::Premium);
            candidate.width = w.as_str().parse().ok();
            candidate.height = h.as_str().parse().ok();
            push_unique(&mut candidates, candidate);
        }
    }

    // 4. Generic platform-CDN sweep.
    for m in PLATFORM_CDN_RE.find_iter(html) {
        let url = unescape_json_url(m.as_str());
        if !is_static_asset(&url) {
            push_unique(&mut candidates, Candidate::new(url, Tier::Good));
        }
    }

    // 5. Lazy-load attributes.
    for caps in LAZY_LOAD_RE.captures_iter(html) {
        if let Some(url) = caps.get(1) {
            let url = unescape_json_url(url.as_str());
            if !is_static_asset(&url) {
                push_unique(&mut candidates, Candidate::new(url, Tier::Good));
            }
        }
    }

    if !candidates.is_empty() {
        return candidates;
    }

    // Escalating catch-alls, only when structured extraction found
    // nothing: platform CDN, then any image-extension URL, then the
    // permissive sweep.
    for m in PLATFORM_CDN_RE.find_iter(html) {
        let url = unescape_json_url(m.as_str());
        if !is_static_asset(&url) {
            push_unique(&mut candidates, Candidate::new(url, Tier::Good));
        }
    }
    if candidates.is_empty() {
        for m in ANY_IMAGE_URL_RE.find_iter(html) {
            let url = unescape_json_url(m.as_str());
            if !is_static_asset(&url) {
                push_unique(&mut candidates, Candidate::new(url, Tier::Good));
            }
        }
    }
    if candidates.is_empty() {
        for m in PERMISSIVE_RE.find_iter(html) {
            push_unique(
                &mut candidates,
                Candidate::new(m.as_str().to_string(), Tier::Crop),
            );
        }
    }

    candidates
}

/// Sorts candidates within a tier: larger declared area first, host
/// quality breaking ties.
fn quality_sort(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.area()
            .cmp(&a.area())
            .then(b.host_quality().cmp(&a.host_quality()))
    });
}

/// Fetches the post page and downloads the best scrapeable image into the
/// work directory.
pub async fn scrape_post_images(
    ctx: &StrategyContext<'_>,
) -> Result<Vec<MediaFile>, ClipfetchError> {
    let html = fetch_page(ctx).await?;
    let candidates = extract_candidates(&html);
    debug!(candidates = candidates.len(), "scrape found image candidates");
    if candidates.is_empty() {
        return Err(ClipfetchError::Strategy {
            strategy: "instagram-scrape".into(),
            message: "no image candidates found in page html".into(),
        });
    }

    let mut preferred: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.tier != Tier::Crop)
        .cloned()
        .collect();
    quality_sort(&mut preferred);
    // Stable sort: premium lands ahead of good, quality order kept within
    // each tier.
    preferred.sort_by_key(|c| c.tier);

    if let Some(file) = try_candidates(ctx, &preferred).await? {
        return Ok(vec![file]);
    }

    // Crop-tier URLs only when everything better failed; a cropped image
    // beats total failure.
    let mut cropped: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.tier == Tier::Crop)
        .collect();
    quality_sort(&mut cropped);
    if let Some(file) = try_candidates(ctx, &cropped).await? {
        return Ok(vec![file]);
    }

    Err(ClipfetchError::Strategy {
        strategy: "instagram-scrape".into(),
        message: "no scraped candidate produced a decodable image".into(),
    })
}

async fn fetch_page(ctx: &StrategyContext<'_>) -> Result<String, ClipfetchError> {
    let mut request = ctx
        .http
        .get(ctx.url.as_str())
        .header("Accept", "text/html,application/xhtml+xml")
        .header("Accept-Language", "en-US,en;q=0.9");

    // A reconstituted cookie header from the first usable jar gets past
    // some login walls the anonymous fetch cannot.
    if let Some(jar) = ctx.cookies.usable().first()
        && let Some(host) = ctx.url.url().host_str()
        && let Some(header) = cookie_header_from_jar(jar, host)
    {
        request = request.header("Cookie", header);
    }

    let response = request.send().await.map_err(|e| ClipfetchError::Strategy {
        strategy: "instagram-scrape".into(),
        message: format!("page fetch failed: {e}"),
    })?;
    if !response.status().is_success() {
        return Err(ClipfetchError::Strategy {
            strategy: "instagram-scrape".into(),
            message: format!("page fetch returned {}", response.status()),
        });
    }
    response.text().await.map_err(|e| ClipfetchError::Strategy {
        strategy: "instagram-scrape".into(),
        message: format!("page body read failed: {e}"),
    })
}

/// Tries candidates in order. Accepts a near-original-sized image
/// immediately; keeps a smaller-but-usable one provisionally while better
/// candidates are still untried.
async fn try_candidates(
    ctx: &StrategyContext<'_>,
    candidates: &[Candidate],
) -> Result<Option<MediaFile>, ClipfetchError> {
    let mut provisional: Option<(Vec<u8>, u32, u32)> = None;

    for candidate in candidates {
        let Some(bytes) = download_candidate(ctx, &candidate.url).await else {
            continue;
        };
        let Some((width, height)) = decode_dimensions(&bytes) else {
            warn!(url = %candidate.url, "candidate body is not a decodable image");
            continue;
        };
        if width >= ACCEPT_FULL && height >= ACCEPT_FULL
            || width >= ACCEPT_GOOD && height >= ACCEPT_GOOD
        {
            return Ok(Some(write_image(ctx, &bytes)?));
        }
        if width >= MIN_USABLE && height >= MIN_USABLE {
            let better = provisional
                .as_ref()
                .is_none_or(|(_, w, h)| u64::from(width) * u64::from(height) > u64::from(*w) * u64::from(*h));
            if better {
                provisional = Some((bytes, width, height));
            }
        }
    }

    match provisional {
        Some((bytes, _, _)) => Ok(Some(write_image(ctx, &bytes)?)),
        None => Ok(None),
    }
}

/// Downloads one candidate: plain GET first, then a retry with full
/// browser headers and the cookie jar.
async fn download_candidate(ctx: &StrategyContext<'_>, url: &str) -> Option<Vec<u8>> {
    if let Ok(response) = ctx.http.get(url).send().await
        && response.status().is_success()
        && let Ok(bytes) = response.bytes().await
    {
        return Some(bytes.to_vec());
    }

    let mut request = ctx
        .http
        .get(url)
        .header("User-Agent", BROWSER_USER_AGENT)
        .header("Referer", ctx.url.as_str())
        .header("Accept", "image/avif,image/webp,image/*,*/*;q=0.8");
    if let Some(jar) = ctx.cookies.usable().first()
        && let Some(host) = ctx.url.url().host_str()
        && let Some(header) = cookie_header_from_jar(jar, host)
    {
        request = request.header("Cookie", header);
    }

    let response = request.send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.bytes().await.ok().map(|b| b.to_vec())
}

fn decode_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let img = image::load_from_memory(bytes).ok()?;
    Some((img.width(), img.height()))
}

fn write_image(ctx: &StrategyContext<'_>, bytes: &[u8]) -> Result<MediaFile, ClipfetchError> {
    let ext = match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "png",
        Ok(image::ImageFormat::WebP) => "webp",
        _ => "jpg",
    };
    let path: PathBuf = ctx.work_dir.join(format!("scraped.{ext}"));
    std::fs::write(&path, bytes)?;
    MediaFile::classify(path).ok_or_else(|| {
        ClipfetchError::Internal("scraped image path failed classification".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::CookieSet;
    use std::io::Cursor;
    use std::path::Path;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 40, 200]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn json_ld_image_is_premium() {
        let html = r#"<script type="application/ld+json">
            {"@type":"ImageObject","image":"https://scontent.cdninstagram.com/full.jpg"}
        </script>"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].tier, Tier::Premium);
    }

    #[test]
    fn meta_tags_skip_static_assets() {
        let html = r#"
            <meta property="og:image" content="https://scontent.cdninstagram.com/post.jpg"/>
            <meta property="og:image" content="https://static.example.com/static/logo.png"/>
        "#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].url.contains("post.jpg"));
    }

    #[test]
    fn display_resources_carry_dimensions() {
        let html = r#"{"display_resources":[
            {"src":"https:\/\/scontent.cdninstagram.com\/a.jpg","config_width":640,"config_height":640},
            {"src":"https:\/\/scontent.cdninstagram.com\/b.jpg","config_width":1080,"config_height":1080}
        ]}"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].width, Some(1080));
        assert!(candidates[0].url.starts_with("https://scontent"));
    }

    #[test]
    fn crop_marker_demotes_candidate() {
        let html = r#"<meta property="og:image" content="https://scontent.cdninstagram.com/x.jpg?stp=c150.0.900.900a"/>"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates[0].tier, Tier::Crop);
    }

    #[test]
    fn escalating_sweep_runs_only_when_structured_finds_nothing() {
        let html = r#"<img src="https://images.example.net/photo.jpeg?x=1">"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].tier, Tier::Good);
    }

    #[test]
    fn platform_cdn_urls_outrank_generic_image_urls() {
        // The CDN URL has no image extension, so only the CDN sweep can
        // find it; the generic jpeg must not dilute the result.
        let html = r#"
            <div data-blob="https://scontent.cdninstagram.com/v/t51.2885-15/abc123_n"></div>
            <img src="https://images.example.net/fallback.jpeg">
        "#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].url.contains("cdninstagram"));
    }

    #[test]
    fn permissive_sweep_is_the_last_resort() {
        let html = r#"<div data-blob="https://cdn.example.net/media/opaquetoken1234567890"></div>"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].tier, Tier::Crop);
    }

    #[test]
    fn dimensions_parsed_from_url_pattern() {
        assert_eq!(
            dimensions_from_url("https://cdn.example.com/s1080x1350/a.jpg"),
            (Some(1080), Some(1350))
        );
        assert_eq!(dimensions_from_url("https://cdn.example.com/a.jpg"), (None, None));
    }

    #[test]
    fn quality_sort_prefers_larger_then_better_host() {
        let mut candidates = vec![
            Candidate::new("https://other.example.com/a.jpg".into(), Tier::Good),
            Candidate::new("https://scontent.cdninstagram.com/s1080x1080/b.jpg".into(), Tier::Good),
            Candidate::new("https://scontent.cdninstagram.com/c.jpg".into(), Tier::Good),
        ];
        quality_sort(&mut candidates);
        assert!(candidates[0].url.contains("b.jpg"));
        assert!(candidates[1].url.contains("c.jpg"));
    }

    #[tokio::test]
    async fn scrape_downloads_and_validates_an_image() {
        let server = MockServer::start().await;
        let body = png_bytes(700, 700);
        Mock::given(method("GET"))
            .and(path("/media/full.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        // The mock server is not an allow-listed host, so validate a real
        // URL but point the downloads at the server via the extract and
        // download helpers directly.
        let candidates = extract_candidates(&format!(
            r#"<meta property="og:image" content="{}/media/full.png"/>"#,
            server.uri()
        ));
        let url = clipfetch_core::validate("https://www.instagram.com/p/ABC/").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cookies = CookieSet::default();
        let http = reqwest::Client::new();
        let ctx = StrategyContext {
            url: &url,
            work_dir: dir.path(),
            binary: Path::new("/usr/bin/true"),
            cookies: &cookies,
            timeout: Duration::from_secs(5),
            http: &http,
        };

        let file = try_candidates(&ctx, &candidates).await.unwrap().unwrap();
        assert!(file.path.exists());
        assert_eq!(file.kind, clipfetch_core::MediaKind::Image);
    }

    #[tokio::test]
    async fn undecodable_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/fake.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not an image</html>"))
            .mount(&server)
            .await;

        let candidates = vec![Candidate::new(
            format!("{}/media/fake.jpg", server.uri()),
            Tier::Good,
        )];
        let url = clipfetch_core::validate("https://www.instagram.com/p/ABC/").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cookies = CookieSet::default();
        let http = reqwest::Client::new();
        let ctx = StrategyContext {
            url: &url,
            work_dir: dir.path(),
            binary: Path::new("/usr/bin/true"),
            cookies: &cookies,
            timeout: Duration::from_secs(5),
            http: &http,
        };

        let result = try_candidates(&ctx, &candidates).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn small_image_is_kept_provisionally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/small.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(300, 300)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/broken.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let candidates = vec![
            Candidate::new(format!("{}/media/small.png", server.uri()), Tier::Good),
            Candidate::new(format!("{}/media/broken.png", server.uri()), Tier::Good),
        ];
        let url = clipfetch_core::validate("https://www.instagram.com/p/ABC/").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cookies = CookieSet::default();
        let http = reqwest::Client::new();
        let ctx = StrategyContext {
            url: &url,
            work_dir: dir.path(),
            binary: Path::new("/usr/bin/true"),
            cookies: &cookies,
            timeout: Duration::from_secs(5),
            http: &http,
        };

        // 300x300 is below the immediate-accept sizes but above the floor;
        // with nothing better it must still be delivered.
        let file = try_candidates(&ctx, &candidates).await.unwrap().unwrap();
        assert!(file.path.exists());
    }

    #[tokio::test]
    async fn tiny_images_are_never_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/tiny.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(50, 50)))
            .mount(&server)
            .await;

        let candidates = vec![Candidate::new(
            format!("{}/media/tiny.png", server.uri()),
            Tier::Good,
        )];
        let url = clipfetch_core::validate("https://www.instagram.com/p/ABC/").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cookies = CookieSet::default();
        let http = reqwest::Client::new();
        let ctx = StrategyContext {
            url: &url,
            work_dir: dir.path(),
            binary: Path::new("/usr/bin/true"),
            cookies: &cookies,
            timeout: Duration::from_secs(5),
            http: &http,
        };

        assert!(try_candidates(&ctx, &candidates).await.unwrap().is_none());
    }
}

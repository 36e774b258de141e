use chrono::{DateTime, Utc};
use rss::{Channel, Item};

use crate::error::AppError;
use crate::models::job::Job;
use crate::normalize::{RawJob, normalize};
use crate::sources::FeedStyle;
use crate::sources::extract::{
    extract_location, extract_organization, first_match, normalize_whitespace,
    split_title_colon, split_trailing_location,
};

/// Bounds memory on hostile or oversized feeds.
const MAX_FEED_BYTES: usize = 2 * 1024 * 1024;

/// Fetch and parse one RSS feed into normalized jobs. Fetch and parse
/// failures propagate; the orchestrator isolates them to this source.
pub async fn fetch(
    client: &reqwest::Client,
    name: &str,
    url: &str,
    style: FeedStyle,
    max_jobs: usize,
) -> Result<Vec<Job>, AppError> {
    let mut resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Source(format!("{name} feed request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::Source(format!(
            "{name} feed returned {}",
            resp.status()
        )));
    }

    // Reject oversized feeds before buffering anything, then stream the
    // body so an upstream that lies about (or omits) its length still
    // cannot allocate past the cap.
    if let Some(declared) = resp.content_length()
        && declared > MAX_FEED_BYTES as u64
    {
        return Err(AppError::Source(format!(
            "{name} feed declared {declared} bytes, over the {MAX_FEED_BYTES} byte cap"
        )));
    }

    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| AppError::Source(format!("{name} feed body read failed: {e}")))?
    {
        if !append_capped(&mut body, &chunk, MAX_FEED_BYTES) {
            return Err(AppError::Source(format!(
                "{name} feed exceeded {MAX_FEED_BYTES} bytes"
            )));
        }
    }

    let channel = Channel::read_from(&body[..])
        .map_err(|e| AppError::Source(format!("{name} feed did not parse: {e}")))?;

    Ok(parse_channel(name, style, &channel, max_jobs))
}

/// Accumulate one body chunk, refusing any growth past `cap`.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    if buf.len() + chunk.len() > cap {
        return false;
    }
    buf.extend_from_slice(chunk);
    true
}

/// Map feed items in feed order, truncated to `max_jobs`.
fn parse_channel(name: &str, style: FeedStyle, channel: &Channel, max_jobs: usize) -> Vec<Job> {
    let mut jobs = Vec::new();
    for item in channel.items() {
        if jobs.len() >= max_jobs {
            break;
        }
        match parse_item(name, style, item) {
            Some(job) => jobs.push(job),
            None => tracing::debug!("{name}: dropping feed item without title or link"),
        }
    }
    jobs
}

/// Heuristic extraction for one feed item. Feeds carry no structured
/// location/organization fields, so fields are recovered from labeled
/// text patterns, bylines, categories, and title shape, in that order.
/// A title and a link are both required; they are the only identity
/// signals a feed item has.
fn parse_item(name: &str, style: FeedStyle, item: &Item) -> Option<Job> {
    let mut title = item.title()?.trim().to_string();
    if title.is_empty() {
        return None;
    }
    let link = item.link()?.trim().to_string();
    if link.is_empty() {
        return None;
    }

    // Candidate text blocks in priority order: short-form snippet
    // first, long-form content second.
    let blocks: Vec<String> = [item.description(), item.content()]
        .into_iter()
        .flatten()
        .map(normalize_whitespace)
        .collect();
    let block_refs = blocks.iter().map(String::as_str);

    let mut location = first_match(block_refs.clone(), extract_location);
    let text_organization = first_match(block_refs, extract_organization);

    let byline = item
        .author()
        .map(str::to_string)
        .or_else(|| item.dublin_core_ext()?.creators().first().cloned())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let categories: Vec<String> = item
        .categories()
        .iter()
        .map(|c| c.name().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    // Title-shape overrides, per source family.
    let mut colon_organization = None;
    if let Some((prefix, rest)) = split_title_colon(&title) {
        colon_organization = Some(prefix);
        title = rest;
    }
    if style == FeedStyle::ColonSplitTrailingLocation
        && location.is_none()
        && let Some((head, tail)) = split_trailing_location(&title)
    {
        title = head;
        location = Some(tail);
    }

    let organization = text_organization
        .or(byline)
        .or_else(|| categories.first().cloned())
        .or(colon_organization);

    let date_posted = item
        .pub_date()
        .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|d| d.with_timezone(&Utc));

    let source_id = item
        .guid()
        .map(|g| g.value().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| link.clone());

    Some(normalize(
        name,
        RawJob {
            source_id,
            title: Some(title),
            organization,
            location,
            link: Some(link),
            description: item.description().map(normalize_whitespace),
            date_posted,
            tags: categories,
            salary: None,
            country_slug: None,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{DEFAULT_LOCATION, DEFAULT_ORGANIZATION};
    use rss::{Category, Guid};

    fn category(name: &str) -> Category {
        let mut c = Category::default();
        c.set_name(name.to_string());
        c
    }

    fn item(title: &str, link: &str, description: &str) -> Item {
        let mut item = Item::default();
        item.set_title(title.to_string());
        item.set_link(link.to_string());
        item.set_description(description.to_string());
        item
    }

    #[test]
    fn colon_split_prefers_category_organization() {
        // Pinned scenario: colon split rewrites the title, and the
        // category wins as organization over the colon prefix.
        let mut it = item(
            "Policy Officer: Geneva, CH",
            "https://unjobs.org/vacancies/123",
            "Deadline approaching, apply via the portal.",
        );
        it.set_categories(vec![category("UNHCR")]);

        let job = parse_item("unjobs", FeedStyle::ColonSplit, &it).unwrap();
        assert_eq!(job.organization, "UNHCR");
        assert_eq!(job.title, "Geneva, CH");
        assert_eq!(job.location, DEFAULT_LOCATION);
        assert_eq!(job.tags, vec!["UNHCR".to_string()]);
    }

    #[test]
    fn colon_prefix_is_last_resort_organization() {
        let it = item(
            "UNICEF: Education Specialist",
            "https://unjobs.org/vacancies/124",
            "Field post in the education section.",
        );
        let job = parse_item("unjobs", FeedStyle::ColonSplit, &it).unwrap();
        assert_eq!(job.organization, "UNICEF");
        assert_eq!(job.title, "Education Specialist");
    }

    #[test]
    fn duty_station_text_beats_everything() {
        let mut it = item(
            "WFP: Logistics Officer",
            "https://unjobs.org/vacancies/125",
            "Duty Station: Rome, Italy. Organization: World Food Programme",
        );
        it.set_categories(vec![category("WFP")]);
        let job = parse_item("unjobs", FeedStyle::ColonSplit, &it).unwrap();
        assert_eq!(job.location, "Rome, Italy");
        // Regex text extraction outranks the category.
        assert_eq!(job.organization, "World Food Programme");
    }

    #[test]
    fn trailing_location_style_splits_short_comma_segment() {
        let it = item(
            "Save the Children: Programme Assistant, Nairobi",
            "https://www.impactpool.org/jobs/987",
            "Apply via the portal.",
        );
        let job = parse_item("impactpool", FeedStyle::ColonSplitTrailingLocation, &it).unwrap();
        assert_eq!(job.title, "Programme Assistant");
        assert_eq!(job.location, "Nairobi");
        assert_eq!(job.organization, "Save the Children");
    }

    #[test]
    fn plain_colon_split_style_keeps_comma_segment_in_title() {
        let it = item(
            "Save the Children: Programme Assistant, Nairobi",
            "https://unjobs.org/vacancies/987",
            "Apply via the portal.",
        );
        let job = parse_item("unjobs", FeedStyle::ColonSplit, &it).unwrap();
        assert_eq!(job.title, "Programme Assistant, Nairobi");
        assert_eq!(job.location, DEFAULT_LOCATION);
    }

    #[test]
    fn byline_is_organization_fallback() {
        let mut it = item(
            "Field Coordinator",
            "https://unjobs.org/vacancies/321",
            "No labels in this body.",
        );
        it.set_author("IRC Careers".to_string());
        let job = parse_item("unjobs", FeedStyle::ColonSplit, &it).unwrap();
        assert_eq!(job.organization, "IRC Careers");
    }

    #[test]
    fn items_without_title_or_link_are_dropped() {
        let mut no_link = Item::default();
        no_link.set_title("Orphan".to_string());
        assert!(parse_item("unjobs", FeedStyle::ColonSplit, &no_link).is_none());

        let mut no_title = Item::default();
        no_title.set_link("https://unjobs.org/x".to_string());
        assert!(parse_item("unjobs", FeedStyle::ColonSplit, &no_title).is_none());
    }

    #[test]
    fn guid_preferred_over_link_for_identity() {
        let mut it = item("Advisor", "https://unjobs.org/vacancies/9", "Body.");
        let mut guid = Guid::default();
        guid.set_value("vacancy-9".to_string());
        it.set_guid(guid);
        let job = parse_item("unjobs", FeedStyle::ColonSplit, &it).unwrap();
        assert_eq!(job.id, "unjobs_vacancy_9");
        assert_eq!(job.organization, DEFAULT_ORGANIZATION);
    }

    #[test]
    fn body_accumulation_stops_at_the_cap() {
        let mut buf = Vec::new();
        assert!(append_capped(&mut buf, &[0u8; 600], 1024));
        assert!(append_capped(&mut buf, &[0u8; 400], 1024));
        // The chunk that would cross the cap is refused outright and
        // nothing of it is buffered.
        assert!(!append_capped(&mut buf, &[0u8; 25], 1024));
        assert_eq!(buf.len(), 1000);
    }

    #[test]
    fn channel_truncates_in_feed_order() {
        let mut channel = Channel::default();
        let items: Vec<Item> = (0..4)
            .map(|i| {
                item(
                    &format!("Role {i}"),
                    &format!("https://unjobs.org/vacancies/{i}"),
                    "Body.",
                )
            })
            .collect();
        channel.set_items(items);
        let jobs = parse_channel("unjobs", FeedStyle::ColonSplit, &channel, 2);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Role 0");
        assert_eq!(jobs[1].title, "Role 1");
    }
}
